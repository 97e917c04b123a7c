use std::sync::atomic::Ordering;

use hm_domain::{
	decision::Priority,
	profile::{DomainDepth, JobStatus},
	record::MatchStatus,
};

use super::{
	KeywordEmbedding, MemoryIndex, MemoryProfiles, candidate_fields, harness, harness_with,
	keyword_vector, python_analysis, rust_job, strong_rust_analysis, weak_rust_analysis,
};

const MANAGER: i64 = 7;

fn mixed_pool() -> MemoryProfiles {
	let profiles = MemoryProfiles::default();

	profiles.add_candidate(
		1,
		candidate_fields("Poland"),
		"Rust Rust",
		Some(strong_rust_analysis(DomainDepth::High)),
	);
	profiles.add_candidate(2, candidate_fields("Poland"), "Rust", Some(weak_rust_analysis()));
	profiles.add_candidate(3, candidate_fields("Poland"), "Python", Some(python_analysis()));
	profiles.add_job(MANAGER, JobStatus::Active, rust_job());

	profiles
}

#[tokio::test]
async fn delivers_only_notifiable_matches_and_drops_hard_failures() {
	let h = harness(mixed_pool(), MemoryIndex::default());
	let report = h.service.run_manager(MANAGER).await.expect("Run must succeed.");

	assert_eq!(report.counters.shortlisted, 3);
	assert_eq!(report.counters.hard_failed, 1);
	assert_eq!(report.counters.scored, 2);
	assert_eq!(report.counters.notifiable, 1);
	assert_eq!(report.counters.records_written, 2);
	assert_eq!(report.entries.len(), 1);

	let entry = &report.entries[0];

	assert_eq!(entry.candidate_id, 1);
	assert_eq!(entry.score.total_score(), 100.0);
	assert!(entry.decision.notify_candidate);
	assert!(!entry.decision.notify_manager);
	assert_eq!(entry.decision.priority, Priority::High);
	assert_eq!(entry.status, MatchStatus::Pending);

	let stored = h.records.snapshot();

	assert!(stored.iter().all(|record| record.candidate_id != 3));
	assert!(stored.iter().all(|record| record.run_id == report.run_id));
	assert!(stored.iter().all(|record| record.score.passes_hard_filters()));
}

#[tokio::test]
async fn candidate_cooldown_suppresses_a_second_run() {
	let h = harness(mixed_pool(), MemoryIndex::default());
	let first = h.service.run_manager(MANAGER).await.expect("Run must succeed.");
	let second = h.service.run_manager(MANAGER).await.expect("Run must succeed.");

	assert_eq!(first.entries.len(), 1);
	assert!(second.entries.is_empty());
	assert_eq!(second.counters.scored, 2);
	assert_eq!(second.counters.records_written, 2);
	assert_eq!(h.records.snapshot().len(), 4);

	h.records.backdate(13);

	let third = h.service.run_manager(MANAGER).await.expect("Run must succeed.");

	assert_eq!(third.entries.len(), 1);
	assert_eq!(third.entries[0].candidate_id, 1);
}

#[tokio::test]
async fn only_top_k_are_delivered_but_every_pair_is_recorded() {
	let profiles = MemoryProfiles::default();

	for (candidate_id, depth) in [
		(1, DomainDepth::High),
		(2, DomainDepth::Medium),
		(3, DomainDepth::Low),
		(4, DomainDepth::High),
	] {
		profiles.add_candidate(
			candidate_id,
			candidate_fields("Germany"),
			"Rust",
			Some(strong_rust_analysis(depth)),
		);
	}
	profiles.add_job(MANAGER, JobStatus::Active, rust_job());

	let h = harness(profiles, MemoryIndex::default());
	let report = h.service.run_manager(MANAGER).await.expect("Run must succeed.");
	let delivered: Vec<i64> = report.entries.iter().map(|record| record.candidate_id).collect();

	assert_eq!(delivered, vec![1, 4, 2]);
	assert_eq!(report.counters.notifiable, 4);
	assert_eq!(report.counters.records_written, 4);

	let cut = h
		.records
		.snapshot()
		.into_iter()
		.find(|record| record.candidate_id == 3)
		.expect("Cut candidate must still be recorded.");

	assert!(!cut.decision.notify_candidate);
	assert!(cut.decision.reason.contains("top 3"));
}

#[tokio::test]
async fn inactive_job_produces_nothing() {
	let profiles = mixed_pool();

	profiles.add_job(MANAGER, JobStatus::Inactive, rust_job());

	let h = harness(profiles, MemoryIndex::default());
	let report = h.service.run_manager(MANAGER).await.expect("Run must succeed.");

	assert!(report.entries.is_empty());
	assert_eq!(report.counters.shortlisted, 0);
	assert!(h.records.snapshot().is_empty());
	assert_eq!(h.embedding.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unknown_manager_produces_nothing() {
	let h = harness(mixed_pool(), MemoryIndex::default());
	let report = h.service.run_manager(404).await.expect("Run must succeed.");

	assert!(report.entries.is_empty());
	assert!(h.records.snapshot().is_empty());
}

#[tokio::test]
async fn one_broken_candidate_does_not_abort_the_run() {
	let profiles = MemoryProfiles { broken: vec![2], ..MemoryProfiles::default() };

	for candidate_id in [1, 2] {
		profiles.add_candidate(
			candidate_id,
			candidate_fields("Poland"),
			"Rust",
			Some(strong_rust_analysis(DomainDepth::High)),
		);
	}
	profiles.add_job(MANAGER, JobStatus::Active, rust_job());

	let index = MemoryIndex::enabled();

	for candidate_id in [1, 2] {
		index.points.lock().expect("Lock poisoned.").insert(candidate_id, keyword_vector("Rust"));
	}

	let h = harness(profiles, index);
	let report = h.service.run_manager(MANAGER).await.expect("Run must succeed.");

	assert_eq!(report.counters.shortlisted, 2);
	assert_eq!(report.counters.failed, 1);
	assert_eq!(report.entries.len(), 1);
	assert_eq!(report.entries[0].candidate_id, 1);
}

#[tokio::test]
async fn mandatory_mismatch_and_incomplete_fields_are_skipped() {
	let profiles = mixed_pool();
	let mut incomplete = candidate_fields("Poland");

	incomplete.salary_currency = None;

	profiles.add_candidate(
		4,
		candidate_fields("Brazil"),
		"Rust",
		Some(strong_rust_analysis(DomainDepth::High)),
	);
	profiles.add_candidate(5, incomplete, "Rust", Some(strong_rust_analysis(DomainDepth::High)));
	profiles.add_candidate(6, candidate_fields("Poland"), "Rust", None);

	let h = harness(profiles, MemoryIndex::default());
	let report = h.service.run_manager(MANAGER).await.expect("Run must succeed.");

	assert_eq!(report.counters.skipped_filtered, 1);
	assert_eq!(report.counters.skipped_incomplete, 1);
	assert_eq!(report.counters.skipped_missing_source, 0);
	assert_eq!(report.entries.len(), 1);
}

#[tokio::test]
async fn refinement_adjusts_but_never_lifts_a_blocked_notification() {
	let refinement = serde_json::json!({ "notifyCandidate": true, "priority": "low" });
	let h =
		harness_with(mixed_pool(), MemoryIndex::default(), KeywordEmbedding::new(), Some(refinement));
	let first = h.service.run_manager(MANAGER).await.expect("Run must succeed.");

	assert_eq!(first.entries.len(), 1);
	assert_eq!(first.entries[0].decision.priority, Priority::Low);

	let second = h.service.run_manager(MANAGER).await.expect("Run must succeed.");

	assert!(second.entries.is_empty());
	assert!(
		h.records
			.snapshot()
			.iter()
			.filter(|record| record.run_id == second.run_id)
			.all(|record| !record.decision.notify_candidate)
	);
}

#[tokio::test]
async fn invalid_refinement_keeps_the_fallback_decision() {
	let refinement = serde_json::json!({ "cooldownHoursCandidate": -5, "priority": "low" });
	let h =
		harness_with(mixed_pool(), MemoryIndex::default(), KeywordEmbedding::new(), Some(refinement));
	let report = h.service.run_manager(MANAGER).await.expect("Run must succeed.");

	assert_eq!(report.entries.len(), 1);
	assert_eq!(report.entries[0].decision.priority, Priority::High);
	assert_eq!(report.entries[0].decision.cooldown_hours_candidate, 12);
}

#[tokio::test]
async fn each_shortlisted_candidate_is_read_once() {
	let index = MemoryIndex::enabled();

	for (candidate_id, text) in [(1, "Rust Rust"), (2, "Rust"), (3, "Python")] {
		index.points.lock().expect("Lock poisoned.").insert(candidate_id, keyword_vector(text));
	}

	let h = harness(mixed_pool(), index);
	let report = h.service.run_manager(MANAGER).await.expect("Run must succeed.");

	assert_eq!(report.counters.shortlisted, 3);
	assert_eq!(report.counters.scored, 2);
	assert_eq!(h.profiles.candidate_reads.load(Ordering::SeqCst), 3);
}
