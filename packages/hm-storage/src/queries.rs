use uuid::Uuid;

use crate::{
	Error, Result,
	db::Db,
	models::{
		CandidateProfileRow, CandidateSimilarity, ManagerJobRow, MatchRecordRow, StatusUpdate,
	},
};

const MATCH_RECORD_COLUMNS: &str = "\
record_id,
	run_id,
	manager_id,
	candidate_id,
	job_id,
	candidate_profile_id,
	total_score,
	score,
	decision,
	job_summary,
	candidate_summary,
	explanation,
	status,
	last_actor_id,
	created_at,
	updated_at";

pub async fn upsert_candidate_profile(db: &Db, row: &CandidateProfileRow) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO candidate_profiles (
	candidate_id,
	profile_id,
	mandatory_fields,
	searchable_text,
	resume_analysis,
	technical_summary,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
ON CONFLICT (candidate_id) DO UPDATE
SET
	profile_id = EXCLUDED.profile_id,
	mandatory_fields = EXCLUDED.mandatory_fields,
	searchable_text = EXCLUDED.searchable_text,
	resume_analysis = EXCLUDED.resume_analysis,
	technical_summary = EXCLUDED.technical_summary,
	updated_at = EXCLUDED.updated_at",
	)
	.bind(row.candidate_id)
	.bind(row.profile_id)
	.bind(&row.mandatory_fields)
	.bind(row.searchable_text.as_str())
	.bind(row.resume_analysis.as_ref())
	.bind(row.technical_summary.as_deref())
	.bind(row.created_at)
	.bind(row.updated_at)
	.execute(&db.pool)
	.await?;

	Ok(())
}

/// Most recently updated candidates first.
pub async fn list_candidate_ids(db: &Db, limit: i64) -> Result<Vec<i64>> {
	let ids = sqlx::query_scalar(
		"\
SELECT candidate_id
FROM candidate_profiles
ORDER BY updated_at DESC, candidate_id ASC
LIMIT $1",
	)
	.bind(limit)
	.fetch_all(&db.pool)
	.await?;

	Ok(ids)
}

pub async fn get_candidate_profile(
	db: &Db,
	candidate_id: i64,
) -> Result<Option<CandidateProfileRow>> {
	let row = sqlx::query_as::<_, CandidateProfileRow>(
		"\
SELECT
	candidate_id,
	profile_id,
	mandatory_fields,
	searchable_text,
	resume_analysis,
	technical_summary,
	created_at,
	updated_at
FROM candidate_profiles
WHERE candidate_id = $1",
	)
	.bind(candidate_id)
	.fetch_optional(&db.pool)
	.await?;

	Ok(row)
}

pub async fn upsert_candidate_embedding(
	db: &Db,
	candidate_id: i64,
	embedding_version: &str,
	vec: &[f32],
) -> Result<()> {
	let dim = i32::try_from(vec.len())
		.map_err(|_| Error::InvalidArgument("Embedding is too large.".to_string()))?;

	sqlx::query(
		"\
INSERT INTO candidate_embeddings (candidate_id, embedding_version, embedding_dim, vec)
VALUES ($1, $2, $3, $4::text::vector)
ON CONFLICT (candidate_id) DO UPDATE
SET
	embedding_version = EXCLUDED.embedding_version,
	embedding_dim = EXCLUDED.embedding_dim,
	vec = EXCLUDED.vec,
	created_at = now()",
	)
	.bind(candidate_id)
	.bind(embedding_version)
	.bind(dim)
	.bind(crate::vector_to_pg(vec))
	.execute(&db.pool)
	.await?;

	Ok(())
}

/// Cosine nearest neighbours among embeddings of the current version.
pub async fn search_candidates_by_embedding(
	db: &Db,
	vec: &[f32],
	embedding_version: &str,
	top_k: i64,
) -> Result<Vec<CandidateSimilarity>> {
	let rows = sqlx::query_as::<_, CandidateSimilarity>(
		"\
SELECT
	candidate_id,
	(1 - (vec <=> $1::text::vector))::real AS similarity
FROM candidate_embeddings
WHERE embedding_version = $2
ORDER BY vec <=> $1::text::vector ASC, candidate_id ASC
LIMIT $3",
	)
	.bind(crate::vector_to_pg(vec))
	.bind(embedding_version)
	.bind(top_k)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

pub async fn upsert_manager_job(db: &Db, row: &ManagerJobRow) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO manager_jobs (
	manager_id,
	job_id,
	job_profile,
	mandatory_fields,
	technical_summary,
	status,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
ON CONFLICT (manager_id) DO UPDATE
SET
	job_id = EXCLUDED.job_id,
	job_profile = EXCLUDED.job_profile,
	mandatory_fields = EXCLUDED.mandatory_fields,
	technical_summary = EXCLUDED.technical_summary,
	status = EXCLUDED.status,
	updated_at = EXCLUDED.updated_at",
	)
	.bind(row.manager_id)
	.bind(row.job_id)
	.bind(row.job_profile.as_ref())
	.bind(&row.mandatory_fields)
	.bind(row.technical_summary.as_deref())
	.bind(row.status.as_str())
	.bind(row.created_at)
	.bind(row.updated_at)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn get_manager_job(db: &Db, manager_id: i64) -> Result<Option<ManagerJobRow>> {
	let row = sqlx::query_as::<_, ManagerJobRow>(
		"\
SELECT
	manager_id,
	job_id,
	job_profile,
	mandatory_fields,
	technical_summary,
	status,
	created_at,
	updated_at
FROM manager_jobs
WHERE manager_id = $1",
	)
	.bind(manager_id)
	.fetch_optional(&db.pool)
	.await?;

	Ok(row)
}

pub async fn list_active_manager_ids(db: &Db) -> Result<Vec<i64>> {
	let ids = sqlx::query_scalar(
		"\
SELECT manager_id
FROM manager_jobs
WHERE status = 'active'
ORDER BY manager_id ASC",
	)
	.fetch_all(&db.pool)
	.await?;

	Ok(ids)
}

/// Inserts a run's records in one transaction. A row that already exists for the same
/// `(run_id, manager_id, candidate_id)` is kept as is and returned instead of duplicated.
pub async fn insert_match_records(db: &Db, rows: &[MatchRecordRow]) -> Result<Vec<MatchRecordRow>> {
	let mut tx = db.pool.begin().await?;
	let mut stored = Vec::with_capacity(rows.len());
	let insert_sql = format!(
		"\
INSERT INTO match_records (
	{MATCH_RECORD_COLUMNS}
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
ON CONFLICT (run_id, manager_id, candidate_id) DO NOTHING
RETURNING
	{MATCH_RECORD_COLUMNS}"
	);
	let existing_sql = format!(
		"\
SELECT
	{MATCH_RECORD_COLUMNS}
FROM match_records
WHERE run_id = $1 AND manager_id = $2 AND candidate_id = $3"
	);

	for row in rows {
		let inserted = sqlx::query_as::<_, MatchRecordRow>(&insert_sql)
			.bind(row.record_id)
			.bind(row.run_id)
			.bind(row.manager_id)
			.bind(row.candidate_id)
			.bind(row.job_id)
			.bind(row.candidate_profile_id)
			.bind(row.total_score)
			.bind(&row.score)
			.bind(&row.decision)
			.bind(row.job_summary.as_str())
			.bind(row.candidate_summary.as_str())
			.bind(row.explanation.as_deref())
			.bind(row.status.as_str())
			.bind(row.last_actor_id)
			.bind(row.created_at)
			.bind(row.updated_at)
			.fetch_optional(&mut *tx)
			.await?;
		let record = match inserted {
			Some(record) => record,
			None =>
				sqlx::query_as::<_, MatchRecordRow>(&existing_sql)
					.bind(row.run_id)
					.bind(row.manager_id)
					.bind(row.candidate_id)
					.fetch_one(&mut *tx)
					.await?,
		};

		stored.push(record);
	}

	tx.commit().await?;

	Ok(stored)
}

pub async fn list_match_records(db: &Db) -> Result<Vec<MatchRecordRow>> {
	let sql = format!(
		"\
SELECT
	{MATCH_RECORD_COLUMNS}
FROM match_records
ORDER BY created_at ASC, record_id ASC"
	);
	let rows = sqlx::query_as::<_, MatchRecordRow>(&sql).fetch_all(&db.pool).await?;

	Ok(rows)
}

pub async fn get_match_record(db: &Db, record_id: Uuid) -> Result<Option<MatchRecordRow>> {
	let sql = format!(
		"\
SELECT
	{MATCH_RECORD_COLUMNS}
FROM match_records
WHERE record_id = $1"
	);
	let row =
		sqlx::query_as::<_, MatchRecordRow>(&sql).bind(record_id).fetch_optional(&db.pool).await?;

	Ok(row)
}

/// Compare-and-swap on `status`: the row only moves when it is still in one of
/// `allowed_from`. A concurrent writer that got there first turns this call into a conflict.
pub async fn update_match_status(db: &Db, update: StatusUpdate<'_>) -> Result<MatchRecordRow> {
	let sql = format!(
		"\
UPDATE match_records
SET
	status = $1,
	last_actor_id = $2,
	decision = COALESCE($3, decision),
	updated_at = $4
WHERE record_id = $5 AND status = ANY($6)
RETURNING
	{MATCH_RECORD_COLUMNS}"
	);
	let updated = sqlx::query_as::<_, MatchRecordRow>(&sql)
		.bind(update.next)
		.bind(update.actor_id)
		.bind(update.decision)
		.bind(update.now)
		.bind(update.record_id)
		.bind(update.allowed_from)
		.fetch_optional(&db.pool)
		.await?;

	if let Some(row) = updated {
		return Ok(row);
	}

	match current_status(db, update.record_id).await? {
		Some(status) => Err(Error::Conflict(format!(
			"Match record {} is {status}; cannot move to {}.",
			update.record_id, update.next
		))),
		None => Err(Error::NotFound(format!("Match record {} does not exist.", update.record_id))),
	}
}

async fn current_status(db: &Db, record_id: Uuid) -> Result<Option<String>> {
	let status = sqlx::query_scalar("SELECT status FROM match_records WHERE record_id = $1")
		.bind(record_id)
		.fetch_optional(&db.pool)
		.await?;

	Ok(status)
}
