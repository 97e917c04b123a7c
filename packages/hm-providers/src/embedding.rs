use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};
use hm_config::EmbeddingProviderConfig;

/// Calls an OpenAI-compatible embeddings endpoint. Inputs are truncated to the configured
/// character budget; an empty or wrongly sized vector is an error.
pub async fn embed(cfg: &EmbeddingProviderConfig, texts: &[String]) -> Result<Vec<Vec<f32>>> {
	if texts.is_empty() {
		return Ok(Vec::new());
	}

	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let inputs: Vec<String> = texts.iter().map(|text| truncate_input(cfg, text)).collect();
	let body = serde_json::json!({
		"model": cfg.model,
		"input": inputs,
		"dimensions": cfg.dimensions,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;
	let vectors = parse_embedding_response(json)?;

	check_vectors(&vectors, texts.len(), cfg.dimensions as usize)?;

	Ok(vectors)
}

/// Cuts `text` to the provider's accepted length in characters.
pub fn truncate_input(cfg: &EmbeddingProviderConfig, text: &str) -> String {
	match text.char_indices().nth(cfg.max_input_chars) {
		Some((byte_idx, _)) => text[..byte_idx].to_string(),
		None => text.to_string(),
	}
}

fn parse_embedding_response(json: Value) -> Result<Vec<Vec<f32>>> {
	let data = json.get("data").and_then(|v| v.as_array()).ok_or_else(|| {
		Error::InvalidResponse { message: "Embedding response is missing data array.".to_string() }
	})?;
	let mut indexed: Vec<(usize, Vec<f32>)> = Vec::with_capacity(data.len());

	for (fallback_index, item) in data.iter().enumerate() {
		let index = item
			.get("index")
			.and_then(|v| v.as_u64())
			.map(|v| v as usize)
			.unwrap_or(fallback_index);
		let embedding = item.get("embedding").and_then(|v| v.as_array()).ok_or_else(|| {
			Error::InvalidResponse {
				message: "Embedding item is missing embedding array.".to_string(),
			}
		})?;
		let vector = embedding
			.iter()
			.map(|value| {
				value.as_f64().map(|number| number as f32).ok_or_else(|| Error::InvalidResponse {
					message: "Embedding value must be numeric.".to_string(),
				})
			})
			.collect::<Result<Vec<f32>>>()?;

		indexed.push((index, vector));
	}

	indexed.sort_by_key(|(index, _)| *index);

	Ok(indexed.into_iter().map(|(_, vector)| vector).collect())
}

fn check_vectors(vectors: &[Vec<f32>], expected_count: usize, dimensions: usize) -> Result<()> {
	if vectors.len() != expected_count {
		return Err(Error::InvalidResponse {
			message: format!("Expected {expected_count} embeddings; got {}.", vectors.len()),
		});
	}

	for vector in vectors {
		if vector.is_empty() {
			return Err(Error::InvalidResponse { message: "Embedding vector is empty.".to_string() });
		}
		if vector.len() != dimensions {
			return Err(Error::InvalidResponse {
				message: format!(
					"Embedding dimension mismatch: expected {dimensions}; got {}.",
					vector.len()
				),
			});
		}
	}

	Ok(())
}
