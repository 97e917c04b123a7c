use hm_domain::{
	profile::{DomainDepth, JobStatus},
	record::{DecisionAction, MatchRecord, MatchStatus},
};
use hm_service::{Actor, DecisionRequest, Error, MatchRecordStore, StatusChange};

use super::{
	Harness, MemoryIndex, MemoryProfiles, candidate_fields, harness, rust_job,
	strong_rust_analysis,
};

const MANAGER: i64 = 7;

async fn delivered_pair(candidates: &[i64]) -> (Harness, Vec<MatchRecord>) {
	let profiles = MemoryProfiles::default();

	for candidate_id in candidates {
		profiles.add_candidate(
			*candidate_id,
			candidate_fields("Poland"),
			"Rust",
			Some(strong_rust_analysis(DomainDepth::High)),
		);
	}
	profiles.add_job(MANAGER, JobStatus::Active, rust_job());

	let h = harness(profiles, MemoryIndex::default());
	let report = h.service.run_manager(MANAGER).await.expect("Run must succeed.");

	assert_eq!(report.entries.len(), candidates.len());

	(h, report.entries)
}

fn request(record: &MatchRecord, action: DecisionAction, actor: Actor) -> DecisionRequest {
	DecisionRequest { record_id: record.record_id, action, actor }
}

#[tokio::test]
async fn manager_is_notified_only_after_the_candidate_applies() {
	let (h, entries) = delivered_pair(&[1]).await;
	let record = &entries[0];

	assert!(!record.decision.notify_manager);

	let applied = h
		.service
		.record_decision(request(record, DecisionAction::Apply, Actor::Candidate(1)))
		.await
		.expect("Apply must succeed.");

	assert_eq!(applied.status, MatchStatus::CandidateApplied);
	assert!(applied.decision.notify_manager);
	assert!(applied.decision.notify_candidate);
	assert_eq!(applied.last_actor_id, Some(1));
}

#[tokio::test]
async fn repeated_apply_is_a_conflict() {
	let (h, entries) = delivered_pair(&[1]).await;
	let apply = request(&entries[0], DecisionAction::Apply, Actor::Candidate(1));

	h.service.record_decision(apply).await.expect("First apply must succeed.");

	let err = h.service.record_decision(apply).await.expect_err("Second apply must fail.");

	assert!(matches!(err, Error::Conflict { .. }));
}

#[tokio::test]
async fn stale_status_loses_the_compare_and_swap() {
	let (h, entries) = delivered_pair(&[1]).await;
	let record = &entries[0];

	h.service
		.record_decision(request(record, DecisionAction::RejectByCandidate, Actor::Candidate(1)))
		.await
		.expect("Reject must succeed.");

	let err = h
		.records
		.update_status(StatusChange {
			record_id: record.record_id,
			allowed_from: vec![MatchStatus::Pending],
			next: MatchStatus::CandidateApplied,
			actor_id: Some(1),
			decision: None,
			now: time::OffsetDateTime::now_utc(),
		})
		.await
		.expect_err("Stale write must fail.");

	assert!(matches!(err, Error::Conflict { .. }));
}

#[tokio::test]
async fn actions_are_bound_to_their_actor() {
	let (h, entries) = delivered_pair(&[1]).await;
	let record = &entries[0];

	for (action, actor) in [
		(DecisionAction::Apply, Actor::Manager(MANAGER)),
		(DecisionAction::Apply, Actor::Candidate(99)),
		(DecisionAction::Expire, Actor::Candidate(1)),
	] {
		let err = h
			.service
			.record_decision(request(record, action, actor))
			.await
			.expect_err("Mismatched actor must fail.");

		assert!(matches!(err, Error::InvalidRequest { .. }));
	}

	let missing = DecisionRequest {
		record_id: uuid::Uuid::new_v4(),
		action: DecisionAction::Expire,
		actor: Actor::System,
	};

	assert!(matches!(h.service.record_decision(missing).await, Err(Error::NotFound { .. })));
}

#[tokio::test]
async fn manager_rejection_blocks_future_notifications() {
	let (h, entries) = delivered_pair(&[1]).await;
	let record = &entries[0];

	h.service
		.record_decision(request(record, DecisionAction::Apply, Actor::Candidate(1)))
		.await
		.expect("Apply must succeed.");
	h.service
		.record_decision(request(record, DecisionAction::RejectByManager, Actor::Manager(MANAGER)))
		.await
		.expect("Reject must succeed.");
	h.records.backdate(48);

	let report = h.service.run_manager(MANAGER).await.expect("Run must succeed.");

	assert!(report.entries.is_empty());
	assert_eq!(report.counters.records_written, 1);
}

#[tokio::test]
async fn inactive_job_keeps_the_manager_quiet_on_apply() {
	let (h, entries) = delivered_pair(&[1]).await;

	h.profiles.add_job(MANAGER, JobStatus::Inactive, rust_job());

	let applied = h
		.service
		.record_decision(request(&entries[0], DecisionAction::Apply, Actor::Candidate(1)))
		.await
		.expect("Apply must succeed.");

	assert_eq!(applied.status, MatchStatus::CandidateApplied);
	assert!(!applied.decision.notify_manager);
}

#[tokio::test]
async fn manager_cooldown_holds_back_a_second_application() {
	let (h, entries) = delivered_pair(&[1, 2]).await;
	let mut applied = Vec::new();

	for record in &entries {
		let actor = Actor::Candidate(record.candidate_id);

		applied.push(
			h.service
				.record_decision(request(record, DecisionAction::Apply, actor))
				.await
				.expect("Apply must succeed."),
		);
	}

	let (first, second) = (&applied[0], &applied[1]);

	assert!(first.decision.notify_manager);
	assert!(!second.decision.notify_manager);
}

#[tokio::test]
async fn system_expires_and_manager_accepts() {
	let (h, entries) = delivered_pair(&[1, 2]).await;
	let expired = h
		.service
		.record_decision(request(&entries[0], DecisionAction::Expire, Actor::System))
		.await
		.expect("Expire must succeed.");

	assert_eq!(expired.status, MatchStatus::Expired);
	assert_eq!(expired.last_actor_id, None);

	let candidate_id = entries[1].candidate_id;

	h.service
		.record_decision(request(&entries[1], DecisionAction::Apply, Actor::Candidate(candidate_id)))
		.await
		.expect("Apply must succeed.");

	let shared = h
		.service
		.record_decision(request(&entries[1], DecisionAction::Accept, Actor::Manager(MANAGER)))
		.await
		.expect("Accept must succeed.");

	assert_eq!(shared.status, MatchStatus::ContactShared);
	assert!(shared.status.is_terminal());
}
