//! Postgres-backed profile and match record stores.

use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::{
	BoxFuture, CandidateProfile, Error, JobSnapshot, MatchRecordStore, ProfileStore, Result,
	StatusChange,
};
use hm_domain::{
	mandatory::{CandidateMandatoryFields, JobMandatoryFields},
	profile::{CandidateMatchSource, JobProfile, JobStatus, ResumeAnalysis},
	record::{MatchBatch, MatchRecord, MatchStatus},
};
use hm_storage::{
	db::Db,
	models::{CandidateProfileRow, ManagerJobRow, MatchRecordRow, StatusUpdate},
	queries,
};

pub struct PgProfileStore {
	db: Db,
}
impl PgProfileStore {
	pub fn new(db: Db) -> Self {
		Self { db }
	}

	async fn manager_job(&self, manager_id: i64) -> Result<Option<ManagerJobRow>> {
		Ok(queries::get_manager_job(&self.db, manager_id).await?)
	}
}

impl ProfileStore for PgProfileStore {
	fn list_candidate_ids(&self, limit: u32) -> BoxFuture<'_, Result<Vec<i64>>> {
		Box::pin(async move { Ok(queries::list_candidate_ids(&self.db, i64::from(limit)).await?) })
	}

	fn get_candidate_match_source(
		&self,
		candidate_id: i64,
	) -> BoxFuture<'_, Result<Option<CandidateMatchSource>>> {
		Box::pin(async move {
			let Some(row) = queries::get_candidate_profile(&self.db, candidate_id).await? else {
				return Ok(None);
			};

			match_source_from_row(row)
		})
	}

	fn get_candidate(&self, candidate_id: i64) -> BoxFuture<'_, Result<Option<CandidateProfile>>> {
		Box::pin(async move {
			let Some(mut row) = queries::get_candidate_profile(&self.db, candidate_id).await?
			else {
				return Ok(None);
			};
			let raw_fields = std::mem::take(&mut row.mandatory_fields);
			let fields: CandidateMandatoryFields =
				decode_json(raw_fields, "candidate mandatory fields")?;
			let profile_id = row.profile_id;
			let source = match_source_from_row(row)?;

			Ok(Some(CandidateProfile { profile_id, fields, source }))
		})
	}

	fn search_by_embedding<'a>(
		&'a self,
		vector: &'a [f32],
		embedding_version: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<i64>>> {
		Box::pin(async move {
			let hits = queries::search_candidates_by_embedding(
				&self.db,
				vector,
				embedding_version,
				i64::from(limit),
			)
			.await?;

			Ok(hits.into_iter().map(|hit| hit.candidate_id).collect())
		})
	}

	fn store_candidate_embedding<'a>(
		&'a self,
		candidate_id: i64,
		embedding_version: &'a str,
		vector: &'a [f32],
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			queries::upsert_candidate_embedding(&self.db, candidate_id, embedding_version, vector)
				.await?;

			Ok(())
		})
	}

	fn get_job_profile(&self, manager_id: i64) -> BoxFuture<'_, Result<Option<JobSnapshot>>> {
		Box::pin(async move {
			let Some(row) = self.manager_job(manager_id).await? else {
				return Ok(None);
			};
			let Some(raw) = row.job_profile else {
				return Ok(None);
			};
			let profile: JobProfile = decode_json(raw, "job profile")?;

			Ok(Some(JobSnapshot {
				job_id: row.job_id,
				profile,
				technical_summary: row.technical_summary,
			}))
		})
	}

	fn get_job_mandatory_fields(
		&self,
		manager_id: i64,
	) -> BoxFuture<'_, Result<Option<JobMandatoryFields>>> {
		Box::pin(async move {
			match self.manager_job(manager_id).await? {
				Some(row) => Ok(Some(decode_json(row.mandatory_fields, "job mandatory fields")?)),
				None => Ok(None),
			}
		})
	}

	fn get_manager_job_status(&self, manager_id: i64) -> BoxFuture<'_, Result<Option<JobStatus>>> {
		Box::pin(async move {
			let Some(row) = self.manager_job(manager_id).await? else {
				return Ok(None);
			};

			JobStatus::parse(&row.status).map(Some).ok_or_else(|| Error::Data {
				message: format!("Manager {manager_id} has unknown job status {}.", row.status),
			})
		})
	}

	fn list_active_manager_ids(&self) -> BoxFuture<'_, Result<Vec<i64>>> {
		Box::pin(async move { Ok(queries::list_active_manager_ids(&self.db).await?) })
	}
}

pub struct PgMatchRecordStore {
	db: Db,
}
impl PgMatchRecordStore {
	pub fn new(db: Db) -> Self {
		Self { db }
	}
}

impl MatchRecordStore for PgMatchRecordStore {
	fn create_for_job<'a>(
		&'a self,
		batch: &'a MatchBatch,
	) -> BoxFuture<'a, Result<Vec<MatchRecord>>> {
		Box::pin(async move {
			let rows = batch_rows(batch, time::OffsetDateTime::now_utc())?;
			let stored = queries::insert_match_records(&self.db, &rows).await?;

			stored.into_iter().map(record_from_row).collect()
		})
	}

	fn list_all(&self) -> BoxFuture<'_, Result<Vec<MatchRecord>>> {
		Box::pin(async move {
			queries::list_match_records(&self.db).await?.into_iter().map(record_from_row).collect()
		})
	}

	fn get(&self, record_id: Uuid) -> BoxFuture<'_, Result<Option<MatchRecord>>> {
		Box::pin(async move {
			queries::get_match_record(&self.db, record_id).await?.map(record_from_row).transpose()
		})
	}

	fn update_status(&self, change: StatusChange) -> BoxFuture<'_, Result<MatchRecord>> {
		Box::pin(async move {
			let allowed_from: Vec<String> =
				change.allowed_from.iter().map(|status| status.as_str().to_string()).collect();
			let decision = change.decision.as_ref().map(encode_json).transpose()?;
			let row = queries::update_match_status(
				&self.db,
				StatusUpdate {
					record_id: change.record_id,
					allowed_from: &allowed_from,
					next: change.next.as_str(),
					actor_id: change.actor_id,
					decision: decision.as_ref(),
					now: change.now,
				},
			)
			.await?;

			record_from_row(row)
		})
	}
}

/// A profile without a stored analysis has nothing to score yet.
fn match_source_from_row(row: CandidateProfileRow) -> Result<Option<CandidateMatchSource>> {
	let Some(raw) = row.resume_analysis else {
		return Ok(None);
	};
	let resume_analysis: ResumeAnalysis = decode_json(raw, "resume analysis")?;

	Ok(Some(CandidateMatchSource {
		searchable_text: row.searchable_text,
		resume_analysis,
		technical_summary: row.technical_summary,
	}))
}

fn batch_rows(batch: &MatchBatch, now: time::OffsetDateTime) -> Result<Vec<MatchRecordRow>> {
	batch
		.matches
		.iter()
		.map(|entry| {
			Ok(MatchRecordRow {
				record_id: Uuid::new_v4(),
				run_id: batch.run_id,
				manager_id: batch.manager_id,
				candidate_id: entry.candidate_id,
				job_id: batch.job_id,
				candidate_profile_id: entry.candidate_profile_id,
				total_score: entry.score.total_score(),
				score: encode_json(&entry.score)?,
				decision: encode_json(&entry.decision)?,
				job_summary: batch.job_summary.clone(),
				candidate_summary: entry.candidate_summary.clone(),
				explanation: entry.explanation.clone(),
				status: MatchStatus::Pending.as_str().to_string(),
				last_actor_id: None,
				created_at: now,
				updated_at: now,
			})
		})
		.collect()
}

fn record_from_row(row: MatchRecordRow) -> Result<MatchRecord> {
	let status = MatchStatus::parse(&row.status).ok_or_else(|| Error::Data {
		message: format!("Match record {} has unknown status {}.", row.record_id, row.status),
	})?;

	Ok(MatchRecord {
		record_id: row.record_id,
		run_id: row.run_id,
		manager_id: row.manager_id,
		candidate_id: row.candidate_id,
		job_id: row.job_id,
		candidate_profile_id: row.candidate_profile_id,
		score: decode_json(row.score, "match score")?,
		decision: decode_json(row.decision, "matching decision")?,
		job_summary: row.job_summary,
		candidate_summary: row.candidate_summary,
		explanation: row.explanation,
		status,
		last_actor_id: row.last_actor_id,
		created_at: row.created_at,
		updated_at: row.updated_at,
	})
}

fn decode_json<T>(value: Value, label: &str) -> Result<T>
where
	T: DeserializeOwned,
{
	serde_json::from_value(value)
		.map_err(|err| Error::Data { message: format!("Stored {label} is malformed: {err}") })
}

fn encode_json<T>(value: &T) -> Result<Value>
where
	T: serde::Serialize,
{
	serde_json::to_value(value).map_err(|err| Error::Data { message: err.to_string() })
}
