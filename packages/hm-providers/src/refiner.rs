use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};
use hm_config::DecisionProviderConfig;

const MAX_ATTEMPTS: usize = 3;
const SYSTEM_PROMPT: &str = "You review a deterministic notification decision for a job match. \
Reply with one JSON object using only these optional keys: notifyCandidate (bool), \
notifyManager (bool), priority (\"low\"|\"normal\"|\"high\"), messageLength \
(\"short\"|\"standard\"), cooldownHoursCandidate (integer >= 0), cooldownHoursManager \
(integer >= 0), reason (string). Omit keys you would not change. Lower priority or suppress \
notification when interview confidence is low or risk flags are many.";

/// Asks the decision model for adjustments to `input` (score, breakdown, base decision and
/// signals). Returns the raw JSON object; validation belongs to the caller.
pub async fn refine(cfg: &DecisionProviderConfig, input: &Value) -> Result<Value> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let messages = serde_json::json!([
		{ "role": "system", "content": SYSTEM_PROMPT },
		{ "role": "user", "content": serde_json::to_string(input)? },
	]);

	for _ in 0..MAX_ATTEMPTS {
		let body = serde_json::json!({
			"model": cfg.model,
			"temperature": cfg.temperature,
			"response_format": { "type": "json_object" },
			"messages": messages,
		});
		let res = client
			.post(&url)
			.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
			.json(&body)
			.send()
			.await?;
		let json: Value = res.error_for_status()?.json().await?;

		if let Ok(parsed) = parse_refiner_json(json) {
			return Ok(parsed);
		}
	}

	Err(Error::InvalidResponse { message: "Decision refiner response is not valid JSON.".to_string() })
}

fn parse_refiner_json(json: Value) -> Result<Value> {
	if let Some(content) = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
	{
		return serde_json::from_str(strip_code_fence(content)).map_err(|_| Error::InvalidResponse {
			message: "Decision refiner content is not valid JSON.".to_string(),
		});
	}
	if json.is_object() && json.get("choices").is_none() {
		return Ok(json);
	}

	Err(Error::InvalidResponse {
		message: "Decision refiner response is missing JSON content.".to_string(),
	})
}

fn strip_code_fence(content: &str) -> &str {
	let trimmed = content.trim();
	let Some(rest) = trimmed.strip_prefix("```") else {
		return trimmed;
	};
	let rest = rest.strip_prefix("json").unwrap_or(rest);

	rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_choice_content_json() {
		let json = serde_json::json!({
			"choices": [
				{ "message": { "content": "{\"priority\": \"low\"}" } }
			]
		});
		let parsed = parse_refiner_json(json).expect("Parse failed.");

		assert_eq!(parsed["priority"], "low");
	}

	#[test]
	fn accepts_fenced_content() {
		let json = serde_json::json!({
			"choices": [
				{ "message": { "content": "```json\n{\"notifyCandidate\": false}\n```" } }
			]
		});
		let parsed = parse_refiner_json(json).expect("Parse failed.");

		assert_eq!(parsed["notifyCandidate"], false);
	}

	#[test]
	fn rejects_prose_content() {
		let json = serde_json::json!({
			"choices": [
				{ "message": { "content": "Sure, notify them." } }
			]
		});

		assert!(parse_refiner_json(json).is_err());
	}
}
