use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{decision::MatchingDecision, score::MatchScore};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
	Pending,
	CandidateApplied,
	CandidateRejected,
	ManagerRejected,
	ContactShared,
	Expired,
}
impl MatchStatus {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Pending => "pending",
			Self::CandidateApplied => "candidate_applied",
			Self::CandidateRejected => "candidate_rejected",
			Self::ManagerRejected => "manager_rejected",
			Self::ContactShared => "contact_shared",
			Self::Expired => "expired",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim() {
			"pending" => Some(Self::Pending),
			"candidate_applied" => Some(Self::CandidateApplied),
			"candidate_rejected" => Some(Self::CandidateRejected),
			"manager_rejected" => Some(Self::ManagerRejected),
			"contact_shared" => Some(Self::ContactShared),
			"expired" => Some(Self::Expired),
			_ => None,
		}
	}

	pub fn is_terminal(self) -> bool {
		matches!(
			self,
			Self::CandidateRejected | Self::ManagerRejected | Self::ContactShared | Self::Expired
		)
	}

	pub fn is_rejection(self) -> bool {
		matches!(self, Self::CandidateRejected | Self::ManagerRejected)
	}

	/// Status only moves forward: pending, then applied, then a terminal state.
	pub fn can_transition_to(self, next: Self) -> bool {
		match self {
			Self::Pending => matches!(
				next,
				Self::CandidateApplied | Self::CandidateRejected | Self::Expired
			),
			Self::CandidateApplied => matches!(
				next,
				Self::CandidateRejected | Self::ManagerRejected | Self::ContactShared | Self::Expired
			),
			Self::CandidateRejected | Self::ManagerRejected | Self::ContactShared | Self::Expired =>
				false,
		}
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ActorRole {
	Candidate,
	Manager,
	System,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
	Apply,
	RejectByCandidate,
	RejectByManager,
	Accept,
	Expire,
}
impl DecisionAction {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Apply => "apply",
			Self::RejectByCandidate => "reject_by_candidate",
			Self::RejectByManager => "reject_by_manager",
			Self::Accept => "accept",
			Self::Expire => "expire",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
			"apply" => Some(Self::Apply),
			"reject_by_candidate" => Some(Self::RejectByCandidate),
			"reject_by_manager" => Some(Self::RejectByManager),
			"accept" => Some(Self::Accept),
			"expire" => Some(Self::Expire),
			_ => None,
		}
	}

	pub fn target(self) -> MatchStatus {
		match self {
			Self::Apply => MatchStatus::CandidateApplied,
			Self::RejectByCandidate => MatchStatus::CandidateRejected,
			Self::RejectByManager => MatchStatus::ManagerRejected,
			Self::Accept => MatchStatus::ContactShared,
			Self::Expire => MatchStatus::Expired,
		}
	}

	pub fn actor_role(self) -> ActorRole {
		match self {
			Self::Apply | Self::RejectByCandidate => ActorRole::Candidate,
			Self::RejectByManager | Self::Accept => ActorRole::Manager,
			Self::Expire => ActorRole::System,
		}
	}

	/// Statuses this action may start from, derived from the transition table.
	pub fn allowed_from(self) -> Vec<MatchStatus> {
		let target = self.target();

		[MatchStatus::Pending, MatchStatus::CandidateApplied]
			.into_iter()
			.filter(|status| status.can_transition_to(target))
			.collect()
	}
}

/// One scored candidate of a manager run, ready to persist.
#[derive(Clone, Debug, PartialEq)]
pub struct CandidateMatch {
	pub candidate_id: i64,
	pub candidate_profile_id: Option<i64>,
	pub score: MatchScore,
	pub decision: MatchingDecision,
	pub candidate_summary: String,
	pub explanation: Option<String>,
}

/// Everything shared by the records of one manager run.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchBatch {
	pub run_id: Uuid,
	pub manager_id: i64,
	pub job_id: Option<i64>,
	pub job_summary: String,
	pub matches: Vec<CandidateMatch>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
	pub record_id: Uuid,
	pub run_id: Uuid,
	pub manager_id: i64,
	pub candidate_id: i64,
	pub job_id: Option<i64>,
	pub candidate_profile_id: Option<i64>,
	pub score: MatchScore,
	pub decision: MatchingDecision,
	pub job_summary: String,
	pub candidate_summary: String,
	pub explanation: Option<String>,
	pub status: MatchStatus,
	pub last_actor_id: Option<i64>,
	#[serde(with = "rfc3339")]
	pub created_at: OffsetDateTime,
	#[serde(with = "rfc3339")]
	pub updated_at: OffsetDateTime,
}

/// Match history as of one instant. Loaded once per orchestrator run so every cooldown and
/// rejection check in that run sees the same facts.
#[derive(Clone, Debug)]
pub struct HistorySnapshot {
	records: Vec<MatchRecord>,
	taken_at: OffsetDateTime,
}
impl HistorySnapshot {
	pub fn new(records: Vec<MatchRecord>, taken_at: OffsetDateTime) -> Self {
		Self { records, taken_at }
	}

	pub fn empty(taken_at: OffsetDateTime) -> Self {
		Self::new(Vec::new(), taken_at)
	}

	pub fn taken_at(&self) -> OffsetDateTime {
		self.taken_at
	}

	pub fn records(&self) -> &[MatchRecord] {
		&self.records
	}

	pub fn pair_rejected(&self, manager_id: i64, candidate_id: i64) -> bool {
		self.records.iter().any(|record| {
			record.manager_id == manager_id
				&& record.candidate_id == candidate_id
				&& record.status.is_rejection()
		})
	}

	pub fn manager_rejected(&self, manager_id: i64, candidate_id: i64) -> bool {
		self.records.iter().any(|record| {
			record.manager_id == manager_id
				&& record.candidate_id == candidate_id
				&& record.status == MatchStatus::ManagerRejected
		})
	}

	/// True when the candidate was told about any match inside the window.
	pub fn candidate_in_cooldown(&self, candidate_id: i64, hours: u32) -> bool {
		let since = self.taken_at - Duration::hours(i64::from(hours));

		self.records.iter().any(|record| {
			record.candidate_id == candidate_id
				&& record.decision.notify_candidate
				&& record.created_at > since
		})
	}

	/// True when the manager was told about an application inside the window.
	pub fn manager_in_cooldown(&self, manager_id: i64, hours: u32) -> bool {
		let since = self.taken_at - Duration::hours(i64::from(hours));

		self.records.iter().any(|record| {
			record.manager_id == manager_id
				&& record.decision.notify_manager
				&& record.status != MatchStatus::Pending
				&& record.updated_at > since
		})
	}

	/// Distinct candidate ids, most recently updated first.
	pub fn known_candidate_ids(&self) -> Vec<i64> {
		let mut ordered: Vec<&MatchRecord> = self.records.iter().collect();
		let mut seen = BTreeSet::new();

		ordered.sort_by(|left, right| right.updated_at.cmp(&left.updated_at));

		ordered
			.into_iter()
			.filter(|record| seen.insert(record.candidate_id))
			.map(|record| record.candidate_id)
			.collect()
	}
}

mod rfc3339 {
	use serde::{Deserialize, Deserializer, Serializer};
	use time::{OffsetDateTime, format_description::well_known::Rfc3339};

	pub fn serialize<S>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&value.format(&Rfc3339).map_err(serde::ser::Error::custom)?)
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
	where
		D: Deserializer<'de>,
	{
		OffsetDateTime::parse(&String::deserialize(deserializer)?, &Rfc3339)
			.map_err(serde::de::Error::custom)
	}
}
