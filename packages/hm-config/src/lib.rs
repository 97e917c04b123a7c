mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, DecisionProviderConfig, EmbeddingProviderConfig, Matching, Notification, Postgres,
	Providers, Qdrant, Service, Shortlist, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.storage.qdrant.collection.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant.collection must be non-empty.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}
	if cfg.providers.embedding.max_input_chars == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.max_input_chars must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.api_key.trim().is_empty() {
		return Err(Error::Validation {
			message: "Provider embedding api_key must be non-empty.".to_string(),
		});
	}
	if cfg.providers.decision.enabled {
		if cfg.providers.decision.api_key.trim().is_empty() {
			return Err(Error::Validation {
				message: "Provider decision api_key must be non-empty when enabled.".to_string(),
			});
		}
		if cfg.providers.decision.model.trim().is_empty() {
			return Err(Error::Validation {
				message: "providers.decision.model must be non-empty when enabled.".to_string(),
			});
		}
	}

	validate_shortlist(cfg)?;
	validate_matching(cfg)?;
	validate_notification(cfg)?;

	Ok(())
}

fn validate_shortlist(cfg: &Config) -> Result<()> {
	let shortlist = &cfg.shortlist;

	for (label, value) in [
		("shortlist.size", shortlist.size),
		("shortlist.sync_limit", shortlist.sync_limit),
		("shortlist.brute_force_limit", shortlist.brute_force_limit),
		("shortlist.static_limit", shortlist.static_limit),
	] {
		if value == 0 {
			return Err(Error::Validation {
				message: format!("{label} must be greater than zero."),
			});
		}
	}

	if shortlist.query_max_chars == 0 {
		return Err(Error::Validation {
			message: "shortlist.query_max_chars must be greater than zero.".to_string(),
		});
	}
	if shortlist.call_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "shortlist.call_timeout_ms must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn validate_matching(cfg: &Config) -> Result<()> {
	if cfg.matching.max_candidates == 0 {
		return Err(Error::Validation {
			message: "matching.max_candidates must be greater than zero.".to_string(),
		});
	}
	if cfg.matching.top_k == 0 {
		return Err(Error::Validation {
			message: "matching.top_k must be greater than zero.".to_string(),
		});
	}
	if !(1..=64).contains(&cfg.matching.concurrency) {
		return Err(Error::Validation {
			message: "matching.concurrency must be in the range 1-64.".to_string(),
		});
	}

	Ok(())
}

fn validate_notification(cfg: &Config) -> Result<()> {
	let notification = &cfg.notification;

	for (label, value) in [
		("notification.candidate_threshold", notification.candidate_threshold),
		("notification.high_priority_score", notification.high_priority_score),
		("notification.standard_message_score", notification.standard_message_score),
	] {
		if value > 100 {
			return Err(Error::Validation {
				message: format!("{label} must be in the range 0-100."),
			});
		}
	}

	if notification.high_priority_score < notification.candidate_threshold {
		return Err(Error::Validation {
			message: "notification.high_priority_score must be at least notification.candidate_threshold."
				.to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.storage.qdrant.url.as_deref().map(|url| url.trim().is_empty()).unwrap_or(false) {
		cfg.storage.qdrant.url = None;
	}

	cfg.providers.embedding.api_base =
		cfg.providers.embedding.api_base.trim_end_matches('/').to_string();
	cfg.providers.decision.api_base =
		cfg.providers.decision.api_base.trim_end_matches('/').to_string();
}
