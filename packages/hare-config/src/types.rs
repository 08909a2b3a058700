use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub retrieval: Retrieval,
	#[serde(default)]
	pub lexical: Lexical,
	#[serde(default)]
	pub keywords: Keywords,
	#[serde(default)]
	pub conditions: Conditions,
	#[serde(default)]
	pub links: Links,
	#[serde(default)]
	pub rate_limit: RateLimit,
	#[serde(default)]
	pub retry: Retry,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub qdrant: Qdrant,
}

#[derive(Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection_prefix: String,
	pub vector_dim: u32,
	#[serde(default = "default_qdrant_timeout_ms")]
	pub timeout_ms: u64,
	/// Dropping and recreating a collection whose vector size no longer matches the embedding
	/// model destroys its contents, so it stays off unless set explicitly.
	#[serde(default)]
	pub allow_recreate_on_dimension_mismatch: bool,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub keywords: Option<KeywordProviderConfig>,
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
	#[serde(default = "default_embedding_batch_size")]
	pub batch_size: u32,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

/// YAKE keyword extraction server.
#[derive(Clone, Debug, Deserialize)]
pub struct KeywordProviderConfig {
	pub api_base: String,
	pub timeout_ms: u64,
	#[serde(default = "default_keyword_language")]
	pub language: String,
	#[serde(default = "default_keyword_max")]
	pub max_keywords: u32,
	#[serde(default = "default_deduplication_threshold")]
	pub deduplication_threshold: f32,
	#[serde(default = "default_window_size")]
	pub window_size: u32,
	#[serde(default = "default_keyword_max")]
	pub top_n: u32,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Retrieval {
	pub top_k: u32,
	/// One of off, rrf, or weighted.
	pub hybrid: String,
	pub rrf_k: f32,
	pub vector_weight: f32,
	pub keyword_weight: f32,
	pub query_timeout_ms: u64,
}
impl Default for Retrieval {
	fn default() -> Self {
		Self {
			top_k: 5,
			hybrid: "off".to_string(),
			rrf_k: 60.0,
			vector_weight: 1.0,
			keyword_weight: 1.0,
			query_timeout_ms: 15_000,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Lexical {
	pub k1: f32,
	pub b: f32,
	pub delta: f32,
	pub coverage_weight: f32,
	pub title_boost: u32,
	pub tag_boost: u32,
	pub stem_cache_capacity: u64,
}
impl Default for Lexical {
	fn default() -> Self {
		Self {
			k1: 1.5,
			b: 0.75,
			delta: 0.5,
			coverage_weight: 0.1,
			title_boost: 4,
			tag_boost: 3,
			stem_cache_capacity: 10_000,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Keywords {
	/// One of off, minimal, balanced, or aggressive.
	pub level: String,
	/// One of local or yake. The yake source requires `providers.keywords`.
	pub source: String,
	/// Local extractor, one of frequency or tfidf.
	pub extractor: String,
	pub base_weight: f32,
	pub max_weight: f32,
}
impl Default for Keywords {
	fn default() -> Self {
		Self {
			level: "balanced".to_string(),
			source: "local".to_string(),
			extractor: "frequency".to_string(),
			base_weight: 1.5,
			max_weight: 3.0,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Conditions {
	/// Number of recent messages kept in the evaluation window.
	pub message_window: u32,
	/// Collection-level activation rules keyed by collection id, in the same JSON shape as chunk
	/// condition sets.
	pub collections: HashMap<String, Value>,
}
impl Default for Conditions {
	fn default() -> Self {
		Self { message_window: 25, collections: HashMap::new() }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Links {
	pub soft_boost: f32,
	pub max_score: f32,
	pub max_iterations: u32,
}
impl Default for Links {
	fn default() -> Self {
		Self { soft_boost: 0.15, max_score: 1.0, max_iterations: 3 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RateLimit {
	pub enabled: bool,
	pub max_calls: u32,
	pub window_ms: u64,
}
impl Default for RateLimit {
	fn default() -> Self {
		Self { enabled: true, max_calls: 60, window_ms: 60_000 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Retry {
	pub max_attempts: u32,
	pub base_delay_ms: u64,
	pub max_delay_ms: u64,
}
impl Default for Retry {
	fn default() -> Self {
		Self { max_attempts: 3, base_delay_ms: 500, max_delay_ms: 30_000 }
	}
}

fn default_qdrant_timeout_ms() -> u64 {
	10_000
}

fn default_embedding_batch_size() -> u32 {
	64
}

fn default_keyword_language() -> String {
	"en".to_string()
}

fn default_keyword_max() -> u32 {
	10
}

fn default_deduplication_threshold() -> f32 {
	0.9
}

fn default_window_size() -> u32 {
	1
}
