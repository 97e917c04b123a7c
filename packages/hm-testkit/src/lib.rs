//! Disposable Postgres databases and Qdrant collections for tests that need real backends.
//!
//! Gated tests read `HM_PG_DSN` (and optionally `HM_QDRANT_URL`) and skip when unset.

mod error;

pub use error::{Error, Result};

use std::{env, str::FromStr, sync::Mutex, thread, time::Duration};

use qdrant_client::Qdrant;
use sqlx::{
	ConnectOptions, Connection, Executor,
	postgres::{PgConnectOptions, PgConnection},
};
use tokio::{runtime::Builder, time};
use uuid::Uuid;

use hm_config::{
	Config, DecisionProviderConfig, EmbeddingProviderConfig, Matching, Notification, Postgres,
	Providers, Qdrant as QdrantConfig, Service, Shortlist, Storage,
};

const ADMIN_DATABASES: [&str; 2] = ["postgres", "template1"];
const QDRANT_CLEANUP_TIMEOUT: Duration = Duration::from_secs(10);

pub struct TestDatabase {
	name: String,
	dsn: String,
	admin_options: PgConnectOptions,
	cleaned: bool,
	collections: Mutex<Vec<String>>,
}
impl TestDatabase {
	pub async fn new(base_dsn: &str) -> Result<Self> {
		let base_options = PgConnectOptions::from_str(base_dsn)
			.map_err(|err| Error::Message(format!("Failed to parse HM_PG_DSN: {err}.")))?;
		let (admin_options, mut admin_conn) = connect_admin(&base_options).await?;
		let name = format!("hm_test_{}", Uuid::new_v4().simple());

		admin_conn
			.execute(format!(r#"CREATE DATABASE "{name}""#).as_str())
			.await
			.map_err(|err| Error::Message(format!("Failed to create test database: {err}.")))?;

		let dsn = base_options.clone().database(&name).to_url_lossy().to_string();

		Ok(Self { name, dsn, admin_options, cleaned: false, collections: Mutex::new(Vec::new()) })
	}

	pub fn dsn(&self) -> &str {
		&self.dsn
	}

	/// A collection name unique to this database, dropped again on cleanup.
	pub fn collection_name(&self, prefix: &str) -> String {
		let collection = format!("{prefix}_{}", self.name);
		let mut tracked = self.collections.lock().unwrap_or_else(|err| err.into_inner());

		if !tracked.contains(&collection) {
			tracked.push(collection.clone());
		}

		collection
	}

	/// Config pointing at this database, with small shortlist limits and the index enabled
	/// only when `HM_QDRANT_URL` is set.
	pub fn config(&self, vector_dim: u32) -> Config {
		Config {
			service: Service { log_level: "info".to_string() },
			storage: Storage {
				postgres: Postgres { dsn: self.dsn.clone(), pool_max_conns: 4 },
				qdrant: QdrantConfig {
					url: env_qdrant_url(),
					collection: self.collection_name("candidates"),
					vector_dim,
					timeout_ms: 5_000,
				},
			},
			providers: Providers {
				embedding: EmbeddingProviderConfig {
					provider_id: "test".to_string(),
					api_base: "http://127.0.0.1:9".to_string(),
					api_key: "test-key".to_string(),
					path: "/embeddings".to_string(),
					model: "test-embedding".to_string(),
					dimensions: vector_dim,
					timeout_ms: 1_000,
					max_input_chars: 8_000,
					default_headers: serde_json::Map::new(),
				},
				decision: DecisionProviderConfig::default(),
			},
			shortlist: Shortlist { size: 10, sync_limit: 20, brute_force_limit: 20, ..Default::default() },
			matching: Matching { concurrency: 4, ..Default::default() },
			notification: Notification::default(),
		}
	}

	pub async fn cleanup(mut self) -> Result<()> {
		self.cleanup_inner().await
	}

	async fn cleanup_inner(&mut self) -> Result<()> {
		if self.cleaned {
			return Ok(());
		}

		let collections = self.tracked_collections();
		let qdrant_result = cleanup_qdrant_collections(&collections).await;

		cleanup_database(&self.name, &self.admin_options).await?;
		qdrant_result?;

		self.cleaned = true;

		Ok(())
	}

	fn tracked_collections(&self) -> Vec<String> {
		self.collections.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}
}
impl Drop for TestDatabase {
	fn drop(&mut self) {
		if self.cleaned {
			return;
		}

		let name = self.name.clone();
		let admin_options = self.admin_options.clone();
		let collections = self.tracked_collections();
		// Drop cannot await; cleanup runs on a throwaway runtime in its own thread.
		let cleanup_thread = thread::spawn(move || {
			let runtime = match Builder::new_current_thread().enable_all().build() {
				Ok(runtime) => runtime,
				Err(err) => {
					eprintln!("Test database cleanup failed: {err}.");

					return;
				},
			};

			if let Err(err) = runtime.block_on(cleanup_qdrant_collections(&collections)) {
				eprintln!("Test Qdrant cleanup failed: {err}.");
			}
			if let Err(err) = runtime.block_on(cleanup_database(&name, &admin_options)) {
				eprintln!("Test database cleanup failed: {err}.");
			}
		});
		let _ = cleanup_thread.join();
	}
}

pub fn env_dsn() -> Option<String> {
	env::var("HM_PG_DSN").ok().filter(|dsn| !dsn.trim().is_empty())
}

pub fn env_qdrant_url() -> Option<String> {
	env::var("HM_QDRANT_URL").ok().filter(|url| !url.trim().is_empty())
}

async fn connect_admin(
	base_options: &PgConnectOptions,
) -> Result<(PgConnectOptions, PgConnection)> {
	let mut last_err = None;

	for database in ADMIN_DATABASES {
		let options = base_options.clone().database(database);

		match PgConnection::connect_with(&options).await {
			Ok(conn) => return Ok((options, conn)),
			Err(err) => last_err = Some(err),
		}
	}

	Err(Error::Message(format!("Failed to connect to an admin database: {last_err:?}.")))
}

async fn cleanup_database(name: &str, admin_options: &PgConnectOptions) -> Result<()> {
	let mut conn = PgConnection::connect_with(admin_options).await.map_err(|err| {
		Error::Message(format!("Failed to connect to admin database for cleanup: {err}."))
	})?;
	let _ = sqlx::query(
		"\
SELECT pg_terminate_backend(pid)
FROM pg_stat_activity
WHERE datname = $1 AND pid <> pg_backend_pid()",
	)
	.bind(name)
	.fetch_all(&mut conn)
	.await;

	sqlx::query(format!(r#"DROP DATABASE IF EXISTS "{name}""#).as_str())
		.execute(&mut conn)
		.await
		.map_err(|err| Error::Message(format!("Failed to drop test database: {err}.")))?;

	Ok(())
}

async fn cleanup_qdrant_collections(collections: &[String]) -> Result<()> {
	if collections.is_empty() {
		return Ok(());
	}

	let Some(qdrant_url) = env_qdrant_url() else {
		return Ok(());
	};
	let client = Qdrant::from_url(&qdrant_url).build()?;

	for collection in collections {
		match time::timeout(QDRANT_CLEANUP_TIMEOUT, client.delete_collection(collection.clone()))
			.await
		{
			Ok(Ok(_)) => {},
			Ok(Err(err)) => eprintln!("Failed to delete Qdrant collection {collection:?}: {err}."),
			Err(_) => eprintln!("Timed out deleting Qdrant collection {collection:?}."),
		}
	}

	Ok(())
}
