use std::collections::HashSet;

use futures::{StreamExt, stream};

use crate::{BoxFuture, MatchService, Result};
use hm_domain::{
	profile::{CandidateMatchSource, JobProfile},
	record::HistorySnapshot,
	text,
};

/// Everything a tier needs to produce candidate ids for one job.
pub struct ShortlistQuery<'a> {
	pub job: &'a JobProfile,
	/// The embedded job text. `None` when embedding failed; vector tiers then yield nothing.
	pub vector: Option<&'a [f32]>,
	pub limit: usize,
}

/// One retrieval tier. Tiers run in order and the first non-empty answer wins.
pub trait ShortlistStrategy
where
	Self: Send + Sync,
{
	fn name(&self) -> &'static str;

	fn shortlist<'a>(&'a self, query: &'a ShortlistQuery<'a>) -> BoxFuture<'a, Result<Vec<i64>>>;
}

struct IndexTier<'s> {
	service: &'s MatchService,
}
impl ShortlistStrategy for IndexTier<'_> {
	fn name(&self) -> &'static str {
		"index"
	}

	fn shortlist<'a>(&'a self, query: &'a ShortlistQuery<'a>) -> BoxFuture<'a, Result<Vec<i64>>> {
		Box::pin(async move {
			let service = self.service;
			let Some(vector) = query.vector else {
				return Ok(Vec::new());
			};

			if !service.backends.index.is_enabled() {
				return Ok(Vec::new());
			}

			let ids = service.search_index(vector, query.limit).await?;

			if !ids.is_empty() {
				return Ok(ids);
			}

			let report = service.sync_index(service.cfg.shortlist.sync_limit).await?;

			tracing::info!(
				indexed = report.indexed,
				failed = report.failed,
				"Index search was empty; synced candidates and retrying."
			);

			service.search_index(vector, query.limit).await
		})
	}
}

struct RelationalTier<'s> {
	service: &'s MatchService,
}
impl ShortlistStrategy for RelationalTier<'_> {
	fn name(&self) -> &'static str {
		"relational"
	}

	fn shortlist<'a>(&'a self, query: &'a ShortlistQuery<'a>) -> BoxFuture<'a, Result<Vec<i64>>> {
		Box::pin(async move {
			let service = self.service;
			let Some(vector) = query.vector else {
				return Ok(Vec::new());
			};
			let version = crate::embedding_version(&service.cfg);
			let limit = u32::try_from(query.limit).unwrap_or(u32::MAX);

			service
				.timed(
					"relational_search",
					service.backends.profiles.search_by_embedding(vector, &version, limit),
				)
				.await
		})
	}
}

/// Embeds a bounded set of stored candidates on the fly and ranks them by cosine similarity.
struct BruteForceTier<'s> {
	service: &'s MatchService,
}
impl ShortlistStrategy for BruteForceTier<'_> {
	fn name(&self) -> &'static str {
		"brute_force"
	}

	fn shortlist<'a>(&'a self, query: &'a ShortlistQuery<'a>) -> BoxFuture<'a, Result<Vec<i64>>> {
		Box::pin(async move {
			let service = self.service;
			let Some(vector) = query.vector else {
				return Ok(Vec::new());
			};
			let ids = service
				.timed(
					"list_candidates",
					service
						.backends
						.profiles
						.list_candidate_ids(service.cfg.shortlist.brute_force_limit),
				)
				.await?;
			let mut scored: Vec<(i64, f32)> = stream::iter(ids)
				.map(|candidate_id| async move {
					match service.candidate_similarity(candidate_id, vector).await {
						Ok(similarity) => similarity.map(|similarity| (candidate_id, similarity)),
						Err(err) => {
							tracing::debug!(
								candidate_id,
								error = %err,
								"Skipping candidate in brute-force ranking."
							);

							None
						},
					}
				})
				.buffer_unordered(service.concurrency())
				.filter_map(|entry| async move { entry })
				.collect()
				.await;

			scored.sort_by(|left, right| right.1.total_cmp(&left.1).then(left.0.cmp(&right.0)));

			Ok(scored.into_iter().map(|(candidate_id, _)| candidate_id).collect())
		})
	}
}

/// Known ids without any similarity: stored profiles first, then ids seen in match history.
struct StaticListTier<'s> {
	service: &'s MatchService,
}
impl ShortlistStrategy for StaticListTier<'_> {
	fn name(&self) -> &'static str {
		"static_list"
	}

	fn shortlist<'a>(&'a self, _query: &'a ShortlistQuery<'a>) -> BoxFuture<'a, Result<Vec<i64>>> {
		Box::pin(async move {
			let service = self.service;
			let limit = service.cfg.shortlist.static_limit;
			let mut ids = match service
				.timed("list_candidates", service.backends.profiles.list_candidate_ids(limit))
				.await
			{
				Ok(ids) => ids,
				Err(err) => {
					tracing::warn!(error = %err, "Failed to list stored candidate ids.");

					Vec::new()
				},
			};

			match service.timed("list_history", service.backends.records.list_all()).await {
				Ok(records) => {
					let history = HistorySnapshot::new(records, time::OffsetDateTime::now_utc());

					ids.extend(history.known_candidate_ids());
				},
				Err(err) => {
					tracing::warn!(error = %err, "Failed to load match history for the static list.");
				},
			}

			Ok(ids)
		})
	}
}

impl MatchService {
	/// Ordered candidate ids for `job`, at most `limit`, without duplicates. Every tier failure
	/// is logged and falls through; when all tiers come back empty the answer is empty.
	pub async fn resolve_shortlist(
		&self,
		job: &JobProfile,
		technical_summary: Option<&str>,
		limit: usize,
	) -> Vec<i64> {
		if limit == 0 {
			return Vec::new();
		}

		let text = job_query_text(job, technical_summary, self.cfg.shortlist.query_max_chars);
		let vector = match self.embed_text(&text).await {
			Ok(vector) => Some(vector),
			Err(err) => {
				tracing::warn!(error = %err, "Job embedding failed; skipping vector tiers.");

				None
			},
		};
		let query = ShortlistQuery { job, vector: vector.as_deref(), limit };

		for tier in self.shortlist_tiers() {
			match tier.shortlist(&query).await {
				Ok(ids) => {
					let ids = dedupe_and_cap(ids, limit);

					if !ids.is_empty() {
						tracing::info!(tier = tier.name(), count = ids.len(), "Shortlist resolved.");

						return ids;
					}

					tracing::debug!(tier = tier.name(), "Shortlist tier returned no candidates.");
				},
				Err(err) => {
					tracing::warn!(tier = tier.name(), error = %err, "Shortlist tier failed.");
				},
			}
		}

		Vec::new()
	}

	fn shortlist_tiers(&self) -> Vec<Box<dyn ShortlistStrategy + '_>> {
		vec![
			Box::new(IndexTier { service: self }),
			Box::new(RelationalTier { service: self }),
			Box::new(BruteForceTier { service: self }),
			Box::new(StaticListTier { service: self }),
		]
	}

	async fn search_index(&self, vector: &[f32], limit: usize) -> Result<Vec<i64>> {
		self.timed("index_search", self.backends.index.search(vector.to_vec(), limit as u64)).await
	}

	async fn candidate_similarity(
		&self,
		candidate_id: i64,
		job_vector: &[f32],
	) -> Result<Option<f32>> {
		let Some(source) = self
			.timed(
				"load_candidate",
				self.backends.profiles.get_candidate_match_source(candidate_id),
			)
			.await?
		else {
			return Ok(None);
		};
		let text = candidate_embedding_text(&source, self.cfg.shortlist.query_max_chars);
		let candidate_vector = self.embed_text(&text).await?;

		Ok(cosine_similarity(job_vector, &candidate_vector))
	}

	pub(crate) fn concurrency(&self) -> usize {
		self.cfg.matching.concurrency.max(1) as usize
	}
}

/// Headline, product context, core technologies and work scope, plus the summary when present.
pub fn job_query_text(
	job: &JobProfile,
	technical_summary: Option<&str>,
	max_chars: usize,
) -> String {
	let core: Vec<&str> = job.tech.core.iter().map(|tech| tech.name.as_str()).collect();
	let mut parts: Vec<String> = Vec::new();

	for part in [job.title.as_str(), job.product_context.as_str()] {
		if !part.trim().is_empty() {
			parts.push(part.trim().to_string());
		}
	}
	if !core.is_empty() {
		parts.push(format!("Core technologies: {}", core.join(", ")));
	}
	if !job.work_scope.trim().is_empty() {
		parts.push(job.work_scope.trim().to_string());
	}
	if let Some(summary) = technical_summary.map(str::trim).filter(|summary| !summary.is_empty()) {
		parts.push(summary.to_string());
	}

	text::truncate_chars(&parts.join("\n"), max_chars)
}

pub fn candidate_embedding_text(source: &CandidateMatchSource, max_chars: usize) -> String {
	let text = match source.technical_summary.as_deref().map(str::trim) {
		Some(summary) if !summary.is_empty() => format!("{}\n{summary}", source.searchable_text.trim()),
		_ => source.searchable_text.trim().to_string(),
	};

	text::truncate_chars(&text, max_chars)
}

/// Raw cosine in [-1, 1]. `None` for mismatched lengths or a zero vector.
pub fn cosine_similarity(left: &[f32], right: &[f32]) -> Option<f32> {
	if left.len() != right.len() || left.is_empty() {
		return None;
	}

	let mut dot = 0.0_f32;
	let mut left_norm = 0.0_f32;
	let mut right_norm = 0.0_f32;

	for (l, r) in left.iter().zip(right) {
		dot += l * r;
		left_norm += l * l;
		right_norm += r * r;
	}

	if left_norm == 0.0 || right_norm == 0.0 {
		return None;
	}

	Some(dot / (left_norm.sqrt() * right_norm.sqrt()))
}

/// Keeps the first occurrence of each id, in order, and at most `limit` ids.
pub fn dedupe_and_cap(ids: Vec<i64>, limit: usize) -> Vec<i64> {
	let mut seen = HashSet::with_capacity(ids.len());

	ids.into_iter().filter(|id| seen.insert(*id)).take(limit).collect()
}
