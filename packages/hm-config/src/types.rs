use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub shortlist: Shortlist,
	#[serde(default)]
	pub matching: Matching,
	#[serde(default)]
	pub notification: Notification,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub qdrant: Qdrant,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Qdrant {
	/// Optional. An absent or blank URL disables the similarity index.
	pub url: Option<String>,
	pub collection: String,
	pub vector_dim: u32,
	#[serde(default = "default_qdrant_timeout_ms")]
	pub timeout_ms: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	#[serde(default)]
	pub decision: DecisionProviderConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default = "default_max_input_chars")]
	pub max_input_chars: usize,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

/// Chat-completions endpoint used to refine notification decisions. Disabled by default; the
/// deterministic policy is used whenever this is off or the call fails.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DecisionProviderConfig {
	pub enabled: bool,
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
}
impl Default for DecisionProviderConfig {
	fn default() -> Self {
		Self {
			enabled: false,
			provider_id: String::new(),
			api_base: String::new(),
			api_key: String::new(),
			path: "/chat/completions".to_string(),
			model: String::new(),
			temperature: 0.0,
			timeout_ms: 10_000,
			default_headers: Map::new(),
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Shortlist {
	pub size: u32,
	pub query_max_chars: usize,
	/// Candidates re-embedded into the index when the index search comes back empty.
	pub sync_limit: u32,
	/// Candidates embedded on the fly by the in-memory cosine tier.
	pub brute_force_limit: u32,
	pub static_limit: u32,
	pub call_timeout_ms: u64,
}
impl Default for Shortlist {
	fn default() -> Self {
		Self {
			size: 50,
			query_max_chars: 4_000,
			sync_limit: 200,
			brute_force_limit: 100,
			static_limit: 200,
			call_timeout_ms: 15_000,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Matching {
	pub max_candidates: u32,
	pub top_k: u32,
	pub concurrency: u32,
}
impl Default for Matching {
	fn default() -> Self {
		Self { max_candidates: 200, top_k: 3, concurrency: 8 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Notification {
	pub candidate_threshold: u32,
	pub high_priority_score: u32,
	pub standard_message_score: u32,
	pub candidate_cooldown_hours: u32,
	pub manager_cooldown_hours: u32,
}
impl Default for Notification {
	fn default() -> Self {
		Self {
			candidate_threshold: 70,
			high_priority_score: 85,
			standard_message_score: 80,
			candidate_cooldown_hours: 12,
			manager_cooldown_hours: 6,
		}
	}
}

fn default_qdrant_timeout_ms() -> u64 {
	5_000
}

fn default_max_input_chars() -> usize {
	8_000
}
