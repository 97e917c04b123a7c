use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, MatchService, Result, StatusChange};
use hm_domain::{
	decision::{self, ApplicationContext, MatchingDecision},
	profile::JobStatus,
	record::{ActorRole, DecisionAction, HistorySnapshot, MatchRecord},
};

/// Who is recording the decision.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Actor {
	Candidate(i64),
	Manager(i64),
	System,
}
impl Actor {
	pub fn role(self) -> ActorRole {
		match self {
			Self::Candidate(_) => ActorRole::Candidate,
			Self::Manager(_) => ActorRole::Manager,
			Self::System => ActorRole::System,
		}
	}

	pub fn id(self) -> Option<i64> {
		match self {
			Self::Candidate(id) | Self::Manager(id) => Some(id),
			Self::System => None,
		}
	}
}

#[derive(Clone, Copy, Debug)]
pub struct DecisionRequest {
	pub record_id: Uuid,
	pub action: DecisionAction,
	pub actor: Actor,
}

impl MatchService {
	/// Moves a match record forward. The write is a compare-and-swap on the status read here, so
	/// a concurrent decision on the same record surfaces as [`Error::Conflict`].
	pub async fn record_decision(&self, req: DecisionRequest) -> Result<MatchRecord> {
		if req.actor.role() != req.action.actor_role() {
			return Err(Error::InvalidRequest {
				message: format!(
					"Action {} cannot be taken by {:?}.",
					req.action.as_str(),
					req.actor.role()
				),
			});
		}

		let record = self.backends.records.get(req.record_id).await?.ok_or_else(|| {
			Error::NotFound { message: format!("Match record {} does not exist.", req.record_id) }
		})?;

		match req.actor {
			Actor::Candidate(id) if id != record.candidate_id =>
				return Err(Error::InvalidRequest {
					message: format!("Candidate {id} is not part of this match."),
				}),
			Actor::Manager(id) if id != record.manager_id =>
				return Err(Error::InvalidRequest {
					message: format!("Manager {id} is not part of this match."),
				}),
			_ => {},
		}

		let next = req.action.target();

		if !record.status.can_transition_to(next) {
			return Err(Error::Conflict {
				message: format!(
					"Match record {} is {}; cannot move to {}.",
					record.record_id,
					record.status.as_str(),
					next.as_str()
				),
			});
		}

		let now = OffsetDateTime::now_utc();
		let decision = match req.action {
			DecisionAction::Apply => Some(self.application_decision(&record, now).await?),
			DecisionAction::RejectByCandidate
			| DecisionAction::RejectByManager
			| DecisionAction::Accept
			| DecisionAction::Expire => None,
		};
		let updated = self
			.backends
			.records
			.update_status(StatusChange {
				record_id: record.record_id,
				allowed_from: vec![record.status],
				next,
				actor_id: req.actor.id(),
				decision,
				now,
			})
			.await?;

		tracing::info!(
			record_id = %updated.record_id,
			action = req.action.as_str(),
			status = updated.status.as_str(),
			notify_manager = updated.decision.notify_manager,
			"Match decision recorded."
		);

		Ok(updated)
	}

	/// Manager-side decision for an application. The candidate flag is carried over so the
	/// record keeps counting toward the candidate's cooldown.
	async fn application_decision(
		&self,
		record: &MatchRecord,
		now: OffsetDateTime,
	) -> Result<MatchingDecision> {
		let job_status = self
			.backends
			.profiles
			.get_manager_job_status(record.manager_id)
			.await?
			.unwrap_or(JobStatus::Inactive);
		let history = HistorySnapshot::new(self.backends.records.list_all().await?, now);
		let ctx = ApplicationContext {
			total_score: record.score.total_score(),
			hard_filters_passed: record.score.passes_hard_filters(),
			job_status,
			manager_rejected: history.manager_rejected(record.manager_id, record.candidate_id),
			manager_in_cooldown: history
				.manager_in_cooldown(record.manager_id, self.cfg.notification.manager_cooldown_hours),
		};
		let mut decision = decision::decide_on_application(&ctx, &self.cfg.notification);

		decision.notify_candidate = record.decision.notify_candidate;

		Ok(decision)
	}
}
