mod error;
mod types;

pub use error::{Error, MissingCause, Result};
pub use types::{
	Conditions, Config, EmbeddingProviderConfig, KeywordProviderConfig, Keywords, Lexical, Links,
	Providers, Qdrant, RateLimit, Retrieval, Retry, Service, Storage,
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
	if cfg.storage.qdrant.url.is_empty() {
		return Err(Error::Missing {
			field: "storage.qdrant.url".to_string(),
			cause: MissingCause::StoreUrl,
		});
	}
	if cfg.storage.qdrant.collection_prefix.is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant.collection_prefix must be non-empty.".to_string(),
		});
	}
	if cfg.providers.embedding.api_base.is_empty() {
		return Err(Error::Missing {
			field: "providers.embedding.api_base".to_string(),
			cause: MissingCause::ApiBase,
		});
	}
	if cfg.providers.embedding.api_key.is_empty() {
		return Err(Error::Missing {
			field: "providers.embedding.api_key".to_string(),
			cause: MissingCause::ApiKey,
		});
	}
	if cfg.providers.embedding.model.is_empty() {
		return Err(Error::Missing {
			field: "providers.embedding.model".to_string(),
			cause: MissingCause::Model,
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
	if cfg.providers.embedding.batch_size == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.batch_size must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.timeout_ms must be greater than zero.".to_string(),
		});
	}

	if let Some(keywords) = cfg.providers.keywords.as_ref() {
		if keywords.api_base.is_empty() {
			return Err(Error::Missing {
				field: "providers.keywords.api_base".to_string(),
				cause: MissingCause::ApiBase,
			});
		}
		if !(0.0..=1.0).contains(&keywords.deduplication_threshold) {
			return Err(Error::Validation {
				message: "providers.keywords.deduplication_threshold must be in the range 0.0-1.0."
					.to_string(),
			});
		}
		if keywords.max_keywords == 0 || keywords.top_n == 0 {
			return Err(Error::Validation {
				message: "providers.keywords.max_keywords and top_n must be greater than zero."
					.to_string(),
			});
		}
	}

	if cfg.retrieval.top_k == 0 {
		return Err(Error::Validation {
			message: "retrieval.top_k must be greater than zero.".to_string(),
		});
	}
	if !matches!(cfg.retrieval.hybrid.as_str(), "off" | "rrf" | "weighted") {
		return Err(Error::Validation {
			message: "retrieval.hybrid must be one of off, rrf, or weighted.".to_string(),
		});
	}
	if !cfg.retrieval.rrf_k.is_finite() || cfg.retrieval.rrf_k <= 0.0 {
		return Err(Error::Validation {
			message: "retrieval.rrf_k must be a finite number greater than zero.".to_string(),
		});
	}

	for (label, weight) in [
		("retrieval.vector_weight", cfg.retrieval.vector_weight),
		("retrieval.keyword_weight", cfg.retrieval.keyword_weight),
	] {
		if !weight.is_finite() || weight < 0.0 {
			return Err(Error::Validation {
				message: format!("{label} must be a finite number zero or greater."),
			});
		}
	}

	if cfg.retrieval.query_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "retrieval.query_timeout_ms must be greater than zero.".to_string(),
		});
	}
	if !cfg.lexical.k1.is_finite() || cfg.lexical.k1 < 0.0 {
		return Err(Error::Validation {
			message: "lexical.k1 must be a finite number zero or greater.".to_string(),
		});
	}
	if !(0.0..=1.0).contains(&cfg.lexical.b) {
		return Err(Error::Validation {
			message: "lexical.b must be in the range 0.0-1.0.".to_string(),
		});
	}
	if !cfg.lexical.delta.is_finite() || cfg.lexical.delta < 0.0 {
		return Err(Error::Validation {
			message: "lexical.delta must be a finite number zero or greater.".to_string(),
		});
	}
	if !cfg.lexical.coverage_weight.is_finite() || cfg.lexical.coverage_weight < 0.0 {
		return Err(Error::Validation {
			message: "lexical.coverage_weight must be a finite number zero or greater.".to_string(),
		});
	}
	if cfg.lexical.stem_cache_capacity == 0 {
		return Err(Error::Validation {
			message: "lexical.stem_cache_capacity must be greater than zero.".to_string(),
		});
	}
	if !matches!(cfg.keywords.level.as_str(), "off" | "minimal" | "balanced" | "aggressive") {
		return Err(Error::Validation {
			message: "keywords.level must be one of off, minimal, balanced, or aggressive."
				.to_string(),
		});
	}
	if !matches!(cfg.keywords.source.as_str(), "local" | "yake") {
		return Err(Error::Validation {
			message: "keywords.source must be one of local or yake.".to_string(),
		});
	}
	if cfg.keywords.source == "yake" && cfg.providers.keywords.is_none() {
		return Err(Error::Validation {
			message: "providers.keywords must be set when keywords.source is yake.".to_string(),
		});
	}
	if !matches!(cfg.keywords.extractor.as_str(), "frequency" | "tfidf") {
		return Err(Error::Validation {
			message: "keywords.extractor must be one of frequency or tfidf.".to_string(),
		});
	}
	if !(1.0..=3.0).contains(&cfg.keywords.base_weight) {
		return Err(Error::Validation {
			message: "keywords.base_weight must be in the range 1.0-3.0.".to_string(),
		});
	}
	if !(cfg.keywords.base_weight..=3.0).contains(&cfg.keywords.max_weight) {
		return Err(Error::Validation {
			message: "keywords.max_weight must be between keywords.base_weight and 3.0."
				.to_string(),
		});
	}
	if cfg.conditions.message_window == 0 {
		return Err(Error::Validation {
			message: "conditions.message_window must be greater than zero.".to_string(),
		});
	}

	for (collection, set) in &cfg.conditions.collections {
		if !set.is_object() {
			return Err(Error::Validation {
				message: format!("conditions.collections.{collection} must be a table."),
			});
		}
	}

	if !cfg.links.soft_boost.is_finite() || cfg.links.soft_boost < 0.0 {
		return Err(Error::Validation {
			message: "links.soft_boost must be a finite number zero or greater.".to_string(),
		});
	}
	if !cfg.links.max_score.is_finite() || cfg.links.max_score <= 0.0 {
		return Err(Error::Validation {
			message: "links.max_score must be a finite number greater than zero.".to_string(),
		});
	}
	if cfg.rate_limit.enabled {
		if cfg.rate_limit.max_calls == 0 {
			return Err(Error::Validation {
				message: "rate_limit.max_calls must be greater than zero when enabled.".to_string(),
			});
		}
		if cfg.rate_limit.window_ms == 0 {
			return Err(Error::Validation {
				message: "rate_limit.window_ms must be greater than zero when enabled.".to_string(),
			});
		}
	}
	if cfg.retry.max_attempts == 0 {
		return Err(Error::Validation {
			message: "retry.max_attempts must be greater than zero.".to_string(),
		});
	}
	if cfg.retry.base_delay_ms > cfg.retry.max_delay_ms {
		return Err(Error::Validation {
			message: "retry.base_delay_ms must be less than or equal to retry.max_delay_ms."
				.to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	for value in [
		&mut cfg.storage.qdrant.url,
		&mut cfg.storage.qdrant.collection_prefix,
		&mut cfg.providers.embedding.api_base,
		&mut cfg.providers.embedding.api_key,
		&mut cfg.providers.embedding.model,
	] {
		*value = value.trim().to_string();
	}

	while cfg.providers.embedding.api_base.ends_with('/') {
		cfg.providers.embedding.api_base.pop();
	}

	if let Some(keywords) = cfg.providers.keywords.as_mut() {
		keywords.api_base = keywords.api_base.trim().trim_end_matches('/').to_string();
	}

	cfg.retrieval.hybrid = cfg.retrieval.hybrid.trim().to_ascii_lowercase();
	cfg.keywords.level = cfg.keywords.level.trim().to_ascii_lowercase();
	cfg.keywords.source = cfg.keywords.source.trim().to_ascii_lowercase();
	cfg.keywords.extractor = cfg.keywords.extractor.trim().to_ascii_lowercase();
}
