//! Client for a YAKE keyword-extraction server (`POST /extract`, `GET /health`).

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

const DEDUPLICATION_ALGO: &str = "seqm";

/// A keyword as YAKE scores it. Lower scores are more relevant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredKeyword {
	pub text: String,
	pub score: f64,
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
	keywords: Vec<ScoredKeyword>,
	#[serde(default)]
	count: Option<usize>,
}

/// Keywords for `text`, most relevant first.
pub async fn extract(
	cfg: &hare_config::KeywordProviderConfig,
	text: &str,
) -> Result<Vec<ScoredKeyword>> {
	if text.trim().is_empty() {
		return Ok(Vec::new());
	}

	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let body = serde_json::json!({
		"text": text,
		"language": cfg.language,
		"maxKeywords": cfg.max_keywords,
		"deduplicationThreshold": cfg.deduplication_threshold,
		"deduplicationAlgo": DEDUPLICATION_ALGO,
		"windowSize": cfg.window_size,
		"topN": cfg.top_n,
	});
	let res = client.post(format!("{}/extract", cfg.api_base)).json(&body).send().await?;
	let json: Value = crate::check_status(res).await?.json().await?;

	parse_extract_response(json)
}

/// Whether the server answers its health probe with `status: healthy`.
pub async fn health(cfg: &hare_config::KeywordProviderConfig) -> Result<bool> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let res = client.get(format!("{}/health", cfg.api_base)).send().await?;
	let json: Value = crate::check_status(res).await?.json().await?;

	Ok(json.get("status").and_then(Value::as_str) == Some("healthy"))
}

fn parse_extract_response(json: Value) -> Result<Vec<ScoredKeyword>> {
	if let Some(message) = json.get("error").and_then(Value::as_str) {
		return Err(Error::InvalidResponse {
			message: format!("Keyword server reported an error: {message}"),
		});
	}

	let response: ExtractResponse = serde_json::from_value(json)?;

	if let Some(count) = response.count
		&& count != response.keywords.len()
	{
		return Err(Error::InvalidResponse {
			message: format!(
				"Keyword count mismatch: count is {count} but {} keywords were returned.",
				response.keywords.len()
			),
		});
	}

	let mut keywords = response.keywords;

	keywords.retain(|keyword| !keyword.text.trim().is_empty());
	keywords.sort_by(|a, b| a.score.total_cmp(&b.score));

	Ok(keywords)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn orders_by_ascending_yake_score() {
		let json = serde_json::json!({
			"keywords": [
				{ "text": "castle", "score": 0.31 },
				{ "text": "dragon", "score": 0.02 },
				{ "text": " ", "score": 0.01 }
			],
			"count": 3
		});
		let keywords = parse_extract_response(json).expect("Failed to parse keywords.");
		let texts: Vec<&str> = keywords.iter().map(|keyword| keyword.text.as_str()).collect();

		assert_eq!(texts, vec!["dragon", "castle"]);
	}

	#[test]
	fn surfaces_server_errors() {
		let json = serde_json::json!({ "error": "Missing required field: text" });
		let err = parse_extract_response(json).expect_err("Expected an error.");

		assert!(err.to_string().contains("Missing required field: text"));
	}

	#[test]
	fn rejects_count_mismatch() {
		let json = serde_json::json!({ "keywords": [{ "text": "castle", "score": 0.3 }], "count": 2 });

		assert!(parse_extract_response(json).is_err());
	}
}
