use std::{sync::Mutex, time::Duration};

use qdrant_client::{
	Qdrant,
	client::Payload,
	qdrant::{
		CreateCollectionBuilder, DeletePointsBuilder, Distance, PointId, PointStruct,
		PointsIdsList, Query, QueryPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
		point_id::PointIdOptions, vectors_config,
	},
};
use serde_json::Value;

use crate::Result;

/// Which vector size the collection was last verified at. Owned by one `QdrantStore`, so two
/// stores never share readiness.
#[derive(Debug, Default)]
struct CollectionReadiness {
	verified_dim: Mutex<Option<u64>>,
}
impl CollectionReadiness {
	fn is_ready(&self, dim: u64) -> bool {
		*self.verified_dim.lock().unwrap_or_else(|err| err.into_inner()) == Some(dim)
	}

	fn mark(&self, dim: Option<u64>) {
		*self.verified_dim.lock().unwrap_or_else(|err| err.into_inner()) = dim;
	}
}

/// Candidate vector index. With no configured URL the store is disabled and every call is a
/// no-op returning nothing.
pub struct QdrantStore {
	client: Option<Qdrant>,
	pub collection: String,
	pub vector_dim: u32,
	readiness: CollectionReadiness,
}
impl QdrantStore {
	pub fn new(cfg: &hm_config::Qdrant) -> Result<Self> {
		let client = match cfg.url.as_deref() {
			Some(url) =>
				Some(Qdrant::from_url(url).timeout(Duration::from_millis(cfg.timeout_ms)).build()?),
			None => None,
		};

		Ok(Self {
			client,
			collection: cfg.collection.clone(),
			vector_dim: cfg.vector_dim,
			readiness: CollectionReadiness::default(),
		})
	}

	pub fn disabled(collection: impl Into<String>, vector_dim: u32) -> Self {
		Self {
			client: None,
			collection: collection.into(),
			vector_dim,
			readiness: CollectionReadiness::default(),
		}
	}

	pub fn is_enabled(&self) -> bool {
		self.client.is_some()
	}

	/// Creates the collection when missing and recreates it when its vector size differs from
	/// `vector_size`. Cached per instance after the first successful check.
	pub async fn ensure_collection(&self, vector_size: u64) -> Result<()> {
		let Some(client) = &self.client else {
			return Ok(());
		};

		if self.readiness.is_ready(vector_size) {
			return Ok(());
		}

		if client.collection_exists(self.collection.clone()).await? {
			let current = client
				.collection_info(self.collection.clone())
				.await?
				.result
				.and_then(|info| info.config)
				.and_then(|config| config.params)
				.and_then(|params| params.vectors_config)
				.and_then(|vectors| vectors.config)
				.and_then(|config| match config {
					vectors_config::Config::Params(params) => Some(params.size),
					vectors_config::Config::ParamsMap(_) => None,
				});

			if current == Some(vector_size) {
				self.readiness.mark(Some(vector_size));

				return Ok(());
			}

			tracing::warn!(
				collection = %self.collection,
				current = ?current,
				expected = vector_size,
				"Recreating Qdrant collection with mismatched vector size."
			);

			client.delete_collection(self.collection.clone()).await?;
		}

		client
			.create_collection(
				CreateCollectionBuilder::new(&self.collection)
					.vectors_config(VectorParamsBuilder::new(vector_size, Distance::Cosine)),
			)
			.await?;

		self.readiness.mark(Some(vector_size));

		Ok(())
	}

	pub async fn upsert(&self, candidate_id: i64, vector: Vec<f32>, payload: Value) -> Result<()> {
		let Some(client) = &self.client else {
			return Ok(());
		};

		self.ensure_collection(vector.len() as u64).await?;

		let point = PointStruct::new(point_id(candidate_id)?, vector, to_payload(payload));

		client
			.upsert_points(UpsertPointsBuilder::new(&self.collection, vec![point]).wait(true))
			.await?;

		Ok(())
	}

	pub async fn delete(&self, candidate_id: i64) -> Result<()> {
		let Some(client) = &self.client else {
			return Ok(());
		};

		if !client.collection_exists(self.collection.clone()).await? {
			return Ok(());
		}

		client
			.delete_points(
				DeletePointsBuilder::new(&self.collection)
					.points(PointsIdsList { ids: vec![point_id(candidate_id)?] })
					.wait(true),
			)
			.await?;

		Ok(())
	}

	/// Nearest candidate ids, best first. A missing collection yields no hits.
	pub async fn search(&self, vector: Vec<f32>, limit: u64) -> Result<Vec<i64>> {
		let Some(client) = &self.client else {
			return Ok(Vec::new());
		};

		if !client.collection_exists(self.collection.clone()).await? {
			self.readiness.mark(None);

			return Ok(Vec::new());
		}

		let response = client
			.query(
				QueryPointsBuilder::new(&self.collection)
					.query(Query::new_nearest(vector))
					.limit(limit),
			)
			.await?;

		Ok(response
			.result
			.into_iter()
			.filter_map(|point| point.id.and_then(|id| id.point_id_options))
			.filter_map(|id| match id {
				PointIdOptions::Num(num) => i64::try_from(num).ok(),
				PointIdOptions::Uuid(_) => None,
			})
			.collect())
	}
}

fn point_id(candidate_id: i64) -> Result<PointId> {
	u64::try_from(candidate_id).map(PointId::from).map_err(|_| {
		crate::Error::InvalidArgument(format!("Candidate id {candidate_id} must be non-negative."))
	})
}

fn to_payload(value: Value) -> Payload {
	let mut payload = Payload::new();

	if let Value::Object(map) = value {
		for (key, value) in map {
			payload.insert(key, value);
		}
	}

	payload
}
