pub mod decisions;
pub mod indexing;
pub mod matching;
pub mod pg;
pub mod shortlist;

mod error;

pub use decisions::{Actor, DecisionRequest};
pub use error::{Error, Result};
pub use indexing::SyncReport;
pub use matching::{RunCounters, RunReport};
pub use shortlist::{ShortlistQuery, ShortlistStrategy};

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use hm_config::{Config, DecisionProviderConfig, EmbeddingProviderConfig};
use hm_domain::{
	decision::MatchingDecision,
	mandatory::{CandidateMandatoryFields, JobMandatoryFields},
	profile::{CandidateMatchSource, JobProfile, JobStatus},
	record::{MatchBatch, MatchRecord, MatchStatus},
};
use hm_providers::{embedding, refiner};
use hm_storage::{db::Db, qdrant::QdrantStore};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;
}

/// Optional model step that may tune a deterministic decision. Its output is untrusted.
pub trait DecisionRefiner
where
	Self: Send + Sync,
{
	fn refine<'a>(
		&'a self,
		cfg: &'a DecisionProviderConfig,
		input: &'a Value,
	) -> BoxFuture<'a, Result<Value>>;
}

/// Nearest-neighbour index over candidate vectors. A disabled index answers every call with
/// nothing.
pub trait SimilarityIndex
where
	Self: Send + Sync,
{
	fn is_enabled(&self) -> bool;

	fn ensure_collection(&self, vector_size: u64) -> BoxFuture<'_, Result<()>>;

	fn upsert(
		&self,
		candidate_id: i64,
		vector: Vec<f32>,
		payload: Value,
	) -> BoxFuture<'_, Result<()>>;

	fn delete(&self, candidate_id: i64) -> BoxFuture<'_, Result<()>>;

	fn search(&self, vector: Vec<f32>, limit: u64) -> BoxFuture<'_, Result<Vec<i64>>>;
}

/// Structured profiles written by the intake pipelines.
pub trait ProfileStore
where
	Self: Send + Sync,
{
	/// Most recently updated first.
	fn list_candidate_ids(&self, limit: u32) -> BoxFuture<'_, Result<Vec<i64>>>;

	fn get_candidate_match_source(
		&self,
		candidate_id: i64,
	) -> BoxFuture<'_, Result<Option<CandidateMatchSource>>>;

	/// Mandatory fields and match source from a single read of the candidate row.
	fn get_candidate(&self, candidate_id: i64) -> BoxFuture<'_, Result<Option<CandidateProfile>>>;

	fn search_by_embedding<'a>(
		&'a self,
		vector: &'a [f32],
		embedding_version: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<i64>>>;

	fn store_candidate_embedding<'a>(
		&'a self,
		candidate_id: i64,
		embedding_version: &'a str,
		vector: &'a [f32],
	) -> BoxFuture<'a, Result<()>>;

	fn get_job_profile(&self, manager_id: i64) -> BoxFuture<'_, Result<Option<JobSnapshot>>>;

	fn get_job_mandatory_fields(
		&self,
		manager_id: i64,
	) -> BoxFuture<'_, Result<Option<JobMandatoryFields>>>;

	fn get_manager_job_status(&self, manager_id: i64) -> BoxFuture<'_, Result<Option<JobStatus>>>;

	fn list_active_manager_ids(&self) -> BoxFuture<'_, Result<Vec<i64>>>;
}

/// Append and status-update log of matches. The only source of cooldown and rejection facts.
pub trait MatchRecordStore
where
	Self: Send + Sync,
{
	/// Writes one record per match of the batch. Re-submitting a batch returns the records
	/// already stored for it.
	fn create_for_job<'a>(&'a self, batch: &'a MatchBatch)
	-> BoxFuture<'a, Result<Vec<MatchRecord>>>;

	fn list_all(&self) -> BoxFuture<'_, Result<Vec<MatchRecord>>>;

	fn get(&self, record_id: Uuid) -> BoxFuture<'_, Result<Option<MatchRecord>>>;

	/// Compare-and-swap: fails with [`Error::Conflict`] unless the stored status is one of
	/// `change.allowed_from`.
	fn update_status(&self, change: StatusChange) -> BoxFuture<'_, Result<MatchRecord>>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct CandidateProfile {
	pub profile_id: Option<i64>,
	pub fields: CandidateMandatoryFields,
	/// `None` until the resume analysis has been written.
	pub source: Option<CandidateMatchSource>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct JobSnapshot {
	pub job_id: Option<i64>,
	pub profile: JobProfile,
	pub technical_summary: Option<String>,
}

#[derive(Clone, Debug)]
pub struct StatusChange {
	pub record_id: Uuid,
	pub allowed_from: Vec<MatchStatus>,
	pub next: MatchStatus,
	pub actor_id: Option<i64>,
	pub decision: Option<MatchingDecision>,
	pub now: OffsetDateTime,
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub refiner: Arc<dyn DecisionRefiner>,
}
impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>, refiner: Arc<dyn DecisionRefiner>) -> Self {
		Self { embedding, refiner }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), refiner: provider }
	}
}

#[derive(Clone)]
pub struct Backends {
	pub profiles: Arc<dyn ProfileStore>,
	pub records: Arc<dyn MatchRecordStore>,
	pub index: Arc<dyn SimilarityIndex>,
}

pub struct MatchService {
	pub cfg: Config,
	pub backends: Backends,
	pub providers: Providers,
}
impl MatchService {
	pub fn new(cfg: Config, db: Db, qdrant: QdrantStore) -> Self {
		let backends = Backends {
			profiles: Arc::new(pg::PgProfileStore::new(db.clone())),
			records: Arc::new(pg::PgMatchRecordStore::new(db)),
			index: Arc::new(qdrant),
		};

		Self::with_parts(cfg, backends, Providers::default())
	}

	pub fn with_parts(cfg: Config, backends: Backends, providers: Providers) -> Self {
		Self { cfg, backends, providers }
	}

	/// Runs `fut` under the per-call timeout; an elapsed timer becomes [`Error::Timeout`].
	pub(crate) async fn timed<T>(
		&self,
		operation: &str,
		fut: impl Future<Output = Result<T>>,
	) -> Result<T> {
		let timeout_ms = self.cfg.shortlist.call_timeout_ms;

		match tokio::time::timeout(Duration::from_millis(timeout_ms), fut).await {
			Ok(result) => result,
			Err(_) => Err(Error::Timeout { operation: operation.to_string(), timeout_ms }),
		}
	}

	pub(crate) async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
		let texts = [text.to_string()];
		let mut vectors = self
			.timed("embed", self.providers.embedding.embed(&self.cfg.providers.embedding, &texts))
			.await?;

		match vectors.pop() {
			Some(vector) if !vector.is_empty() => Ok(vector),
			_ => Err(Error::Provider { message: "Embedding provider returned no vector.".to_string() }),
		}
	}
}

struct DefaultProviders;
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Ok(embedding::embed(cfg, texts).await?) })
	}
}
impl DecisionRefiner for DefaultProviders {
	fn refine<'a>(
		&'a self,
		cfg: &'a DecisionProviderConfig,
		input: &'a Value,
	) -> BoxFuture<'a, Result<Value>> {
		Box::pin(async move { Ok(refiner::refine(cfg, input).await?) })
	}
}

impl SimilarityIndex for QdrantStore {
	fn is_enabled(&self) -> bool {
		QdrantStore::is_enabled(self)
	}

	fn ensure_collection(&self, vector_size: u64) -> BoxFuture<'_, Result<()>> {
		Box::pin(async move { Ok(QdrantStore::ensure_collection(self, vector_size).await?) })
	}

	fn upsert(
		&self,
		candidate_id: i64,
		vector: Vec<f32>,
		payload: Value,
	) -> BoxFuture<'_, Result<()>> {
		Box::pin(async move { Ok(QdrantStore::upsert(self, candidate_id, vector, payload).await?) })
	}

	fn delete(&self, candidate_id: i64) -> BoxFuture<'_, Result<()>> {
		Box::pin(async move { Ok(QdrantStore::delete(self, candidate_id).await?) })
	}

	fn search(&self, vector: Vec<f32>, limit: u64) -> BoxFuture<'_, Result<Vec<i64>>> {
		Box::pin(async move { Ok(QdrantStore::search(self, vector, limit).await?) })
	}
}

/// Tags stored vectors so a model or dimension change never mixes with old rows.
pub fn embedding_version(cfg: &Config) -> String {
	format!(
		"{}:{}:{}",
		cfg.providers.embedding.provider_id,
		cfg.providers.embedding.model,
		cfg.storage.qdrant.vector_dim
	)
}
