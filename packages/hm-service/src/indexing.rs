use futures::{StreamExt, stream};
use serde::Serialize;

use crate::{MatchService, Result, shortlist};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
	pub scanned: usize,
	pub indexed: usize,
	/// Candidates with no stored analysis yet.
	pub skipped: usize,
	pub failed: usize,
}

enum SyncOutcome {
	Indexed,
	Skipped,
	Failed,
}

impl MatchService {
	/// Re-embeds up to `limit` of the most recently updated candidates and writes the vectors to
	/// the relational store and, when enabled, the similarity index. A candidate that fails is
	/// counted and skipped.
	pub async fn sync_index(&self, limit: u32) -> Result<SyncReport> {
		let index = &self.backends.index;

		if index.is_enabled() {
			self.timed(
				"ensure_collection",
				index.ensure_collection(u64::from(self.cfg.storage.qdrant.vector_dim)),
			)
			.await?;
		}

		let ids = self.timed("list_candidates", self.backends.profiles.list_candidate_ids(limit)).await?;
		let version = crate::embedding_version(&self.cfg);
		let version = version.as_str();
		let outcomes: Vec<SyncOutcome> = stream::iter(ids)
			.map(|candidate_id| async move {
				match self.sync_candidate(candidate_id, version).await {
					Ok(true) => SyncOutcome::Indexed,
					Ok(false) => SyncOutcome::Skipped,
					Err(err) => {
						tracing::warn!(candidate_id, error = %err, "Failed to index candidate.");

						SyncOutcome::Failed
					},
				}
			})
			.buffer_unordered(self.concurrency())
			.collect()
			.await;
		let mut report = SyncReport { scanned: outcomes.len(), ..SyncReport::default() };

		for outcome in outcomes {
			match outcome {
				SyncOutcome::Indexed => report.indexed += 1,
				SyncOutcome::Skipped => report.skipped += 1,
				SyncOutcome::Failed => report.failed += 1,
			}
		}

		tracing::info!(
			scanned = report.scanned,
			indexed = report.indexed,
			skipped = report.skipped,
			failed = report.failed,
			"Candidate index sync finished."
		);

		Ok(report)
	}

	pub async fn remove_candidate_from_index(&self, candidate_id: i64) -> Result<()> {
		self.timed("index_delete", self.backends.index.delete(candidate_id)).await?;

		tracing::info!(candidate_id, "Removed candidate from the similarity index.");

		Ok(())
	}

	async fn sync_candidate(&self, candidate_id: i64, version: &str) -> Result<bool> {
		let Some(source) = self
			.timed("load_candidate", self.backends.profiles.get_candidate_match_source(candidate_id))
			.await?
		else {
			return Ok(false);
		};
		let text = shortlist::candidate_embedding_text(&source, self.cfg.shortlist.query_max_chars);
		let vector = self.embed_text(&text).await?;

		self.timed(
			"store_embedding",
			self.backends.profiles.store_candidate_embedding(candidate_id, version, &vector),
		)
		.await?;

		if self.backends.index.is_enabled() {
			let payload = serde_json::json!({ "candidate_id": candidate_id, "embedding_version": version });

			self.timed("index_upsert", self.backends.index.upsert(candidate_id, vector, payload))
				.await?;
		}

		Ok(true)
	}
}
