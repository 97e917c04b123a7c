use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct CandidateProfileRow {
	pub candidate_id: i64,
	pub profile_id: Option<i64>,
	pub mandatory_fields: Value,
	pub searchable_text: String,
	pub resume_analysis: Option<Value>,
	pub technical_summary: Option<String>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ManagerJobRow {
	pub manager_id: i64,
	pub job_id: Option<i64>,
	pub job_profile: Option<Value>,
	pub mandatory_fields: Value,
	pub technical_summary: Option<String>,
	pub status: String,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct CandidateSimilarity {
	pub candidate_id: i64,
	pub similarity: f32,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct MatchRecordRow {
	pub record_id: Uuid,
	pub run_id: Uuid,
	pub manager_id: i64,
	pub candidate_id: i64,
	pub job_id: Option<i64>,
	pub candidate_profile_id: Option<i64>,
	pub total_score: f64,
	pub score: Value,
	pub decision: Value,
	pub job_summary: String,
	pub candidate_summary: String,
	pub explanation: Option<String>,
	pub status: String,
	pub last_actor_id: Option<i64>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

/// Status change guarded by the caller's view of the current status.
#[derive(Clone, Debug)]
pub struct StatusUpdate<'a> {
	pub record_id: Uuid,
	pub allowed_from: &'a [String],
	pub next: &'a str,
	pub actor_id: Option<i64>,
	pub decision: Option<&'a Value>,
	pub now: OffsetDateTime,
}
