use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
	Error, Result,
	profile::{JobStatus, Level},
	score::MatchScore,
};
use hm_config::Notification;

/// Upper bound accepted from a refinement payload: thirty days.
pub const MAX_COOLDOWN_HOURS: i64 = 720;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
	Low,
	Normal,
	High,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageLength {
	Short,
	Standard,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingDecision {
	pub notify_candidate: bool,
	pub notify_manager: bool,
	pub priority: Priority,
	pub message_length: MessageLength,
	pub cooldown_hours_candidate: u32,
	pub cooldown_hours_manager: u32,
	pub reason: String,
}

/// Inputs for one (job, candidate) decision, read from a single history snapshot.
#[derive(Clone, Copy, Debug)]
pub struct DecisionContext<'a> {
	pub score: &'a MatchScore,
	pub risk_flag_count: usize,
	pub interview_confidence: Level,
	pub job_status: JobStatus,
	pub pair_rejected: bool,
	pub candidate_in_cooldown: bool,
}

/// What the deterministic rules allow at most. A refinement can lower a flag, never raise it
/// past the ceiling.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NotificationCeiling {
	pub candidate: bool,
	pub manager: bool,
}
impl NotificationCeiling {
	pub fn for_context(ctx: &DecisionContext<'_>) -> Self {
		Self { candidate: block_reason(ctx).is_none(), manager: false }
	}
}

/// Optional adjustments returned by the decision-refinement step. Absent fields keep the
/// deterministic value.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DecisionRefinement {
	pub notify_candidate: Option<bool>,
	pub notify_manager: Option<bool>,
	pub priority: Option<Priority>,
	pub message_length: Option<MessageLength>,
	pub cooldown_hours_candidate: Option<i64>,
	pub cooldown_hours_manager: Option<i64>,
	pub reason: Option<String>,
}

/// Inputs for the manager-side decision taken when a candidate applies.
#[derive(Clone, Copy, Debug)]
pub struct ApplicationContext {
	pub total_score: f64,
	pub hard_filters_passed: bool,
	pub job_status: JobStatus,
	pub manager_rejected: bool,
	pub manager_in_cooldown: bool,
}

/// Deterministic fallback policy. Manager notification never starts here; it waits for the
/// candidate to apply.
pub fn decide(ctx: &DecisionContext<'_>, cfg: &Notification) -> MatchingDecision {
	let total = ctx.score.total_score();
	let (notify_candidate, reason) = match block_reason(ctx) {
		Some(reason) => (false, reason.to_string()),
		None if total >= f64::from(cfg.candidate_threshold) =>
			(true, format!("Score {total:.0} meets the candidate threshold.")),
		None => (false, format!("Score {total:.0} is below the candidate threshold.")),
	};

	MatchingDecision {
		notify_candidate,
		notify_manager: false,
		priority: priority_for(total, cfg),
		message_length: message_length_for(total, cfg),
		cooldown_hours_candidate: cfg.candidate_cooldown_hours,
		cooldown_hours_manager: cfg.manager_cooldown_hours,
		reason,
	}
}

pub fn decide_on_application(ctx: &ApplicationContext, cfg: &Notification) -> MatchingDecision {
	let blocked = if ctx.job_status != JobStatus::Active {
		Some("Job is inactive.")
	} else if !ctx.hard_filters_passed {
		Some("Hard filters failed.")
	} else if ctx.manager_rejected {
		Some("Manager already rejected this candidate.")
	} else if ctx.manager_in_cooldown {
		Some("Manager is in cooldown.")
	} else {
		None
	};
	let reason = blocked.unwrap_or("Candidate applied.").to_string();

	MatchingDecision {
		notify_candidate: false,
		notify_manager: blocked.is_none(),
		priority: priority_for(ctx.total_score, cfg),
		message_length: message_length_for(ctx.total_score, cfg),
		cooldown_hours_candidate: cfg.candidate_cooldown_hours,
		cooldown_hours_manager: cfg.manager_cooldown_hours,
		reason,
	}
}

/// Validates a raw refinement payload. Any shape problem is a validation error and the caller
/// keeps the deterministic decision.
pub fn parse_refinement(payload: Value) -> Result<DecisionRefinement> {
	if !payload.is_object() {
		return Err(Error::Validation {
			message: "Decision refinement must be a JSON object.".to_string(),
		});
	}

	let refinement: DecisionRefinement = serde_json::from_value(payload)
		.map_err(|err| Error::Validation { message: format!("Invalid decision refinement: {err}") })?;

	for (label, hours) in [
		("cooldownHoursCandidate", refinement.cooldown_hours_candidate),
		("cooldownHoursManager", refinement.cooldown_hours_manager),
	] {
		if let Some(hours) = hours
			&& !(0..=MAX_COOLDOWN_HOURS).contains(&hours)
		{
			return Err(Error::Validation {
				message: format!("{label} must be within 0-{MAX_COOLDOWN_HOURS}; got {hours}."),
			});
		}
	}

	Ok(refinement)
}

pub fn apply_refinement(
	base: &MatchingDecision,
	refinement: &DecisionRefinement,
	ceiling: NotificationCeiling,
) -> Result<MatchingDecision> {
	let notify_candidate =
		refinement.notify_candidate.unwrap_or(base.notify_candidate) && ceiling.candidate;
	let notify_manager =
		refinement.notify_manager.unwrap_or(base.notify_manager) && ceiling.manager;
	let reason = refinement
		.reason
		.as_deref()
		.map(str::trim)
		.filter(|reason| !reason.is_empty())
		.map(str::to_string)
		.unwrap_or_else(|| base.reason.clone());

	Ok(MatchingDecision {
		notify_candidate,
		notify_manager,
		priority: refinement.priority.unwrap_or(base.priority),
		message_length: refinement.message_length.unwrap_or(base.message_length),
		cooldown_hours_candidate: cooldown_hours(
			refinement.cooldown_hours_candidate,
			base.cooldown_hours_candidate,
		)?,
		cooldown_hours_manager: cooldown_hours(
			refinement.cooldown_hours_manager,
			base.cooldown_hours_manager,
		)?,
		reason,
	})
}

fn cooldown_hours(raw: Option<i64>, fallback: u32) -> Result<u32> {
	let Some(raw) = raw else {
		return Ok(fallback);
	};

	u32::try_from(raw).map_err(|_| Error::InvariantViolation {
		message: format!("Cooldown hours must be a non-negative integer; got {raw}."),
	})
}

fn block_reason(ctx: &DecisionContext<'_>) -> Option<&'static str> {
	if ctx.job_status != JobStatus::Active {
		return Some("Job is inactive.");
	}
	if !ctx.score.passes_hard_filters() {
		return Some("Hard filters failed.");
	}
	if ctx.pair_rejected {
		return Some("This pair was already rejected.");
	}
	if ctx.candidate_in_cooldown {
		return Some("Candidate is in cooldown.");
	}

	None
}

fn priority_for(total: f64, cfg: &Notification) -> Priority {
	if total >= f64::from(cfg.high_priority_score) { Priority::High } else { Priority::Normal }
}

fn message_length_for(total: f64, cfg: &Notification) -> MessageLength {
	if total >= f64::from(cfg.standard_message_score) {
		MessageLength::Standard
	} else {
		MessageLength::Short
	}
}
