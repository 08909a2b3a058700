use std::{collections::HashSet, time::Duration};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use hare_domain::{
	chunk::{
		Chunk, ChunkHash, ChunkLink, ChunkPatch, Keyword, chunk_hash, dedup_keywords, normalize_text,
	},
	conditions::{ConditionScope, ConditionSet, validate_condition_set},
	keywords::{ExtractionLevel, LorebookEntry},
};
use hare_providers::retry::with_retry;
use hare_storage::models::{CollectionState, StoredPoint};

use crate::{Error, HareService, Result, timed};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkSource {
	#[default]
	Text,
	Chat,
	Lorebook,
}
impl ChunkSource {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Text => "text",
			Self::Chat => "chat",
			Self::Lorebook => "lorebook",
		}
	}
}

/// One chunk to ingest. Keywords given here are stored as-is; otherwise they are extracted
/// according to `keywords.*`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChunkInput {
	pub text: String,
	#[serde(default)]
	pub keywords: Option<Vec<Keyword>>,
	#[serde(default)]
	pub conditions: Option<ConditionSet>,
	#[serde(default)]
	pub links: Vec<ChunkLink>,
	#[serde(default)]
	pub metadata: Map<String, Value>,
	#[serde(default)]
	pub source: ChunkSource,
	/// Explicit trigger keys of a lorebook entry.
	#[serde(default)]
	pub lorebook_keys: Vec<String>,
}
impl ChunkInput {
	pub fn new(text: impl Into<String>) -> Self {
		Self { text: text.into(), ..Self::default() }
	}
}

#[derive(Clone, Debug)]
pub struct InsertReport {
	pub inserted: usize,
	/// Inputs whose normalized text matched an earlier input of the same call.
	pub duplicates: usize,
	/// Inputs with no text left after normalization.
	pub skipped: usize,
	pub state: CollectionState,
	pub hashes: Vec<ChunkHash>,
}

impl HareService {
	/// Embeds and stores `inputs`. Embedding runs one batch at a time through the rate
	/// limiter; a batch is upserted before the next one is embedded.
	pub async fn insert_chunks(
		&self,
		collection: &str,
		inputs: Vec<ChunkInput>,
	) -> Result<InsertReport> {
		let collection = require_collection(collection)?;
		let mut seen = HashSet::new();
		let mut chunks = Vec::with_capacity(inputs.len());
		let mut duplicates = 0;
		let mut skipped = 0;

		for input in inputs {
			if normalize_text(&input.text).is_empty() {
				skipped += 1;

				continue;
			}
			if let Some(set) = input.conditions.as_ref() {
				check_chunk_conditions(set)?;
			}
			if !seen.insert(chunk_hash(&input.text)) {
				duplicates += 1;

				continue;
			}

			chunks.push(self.build_chunk(input).await?);
		}

		let state = self.ensure_collection(collection).await?;
		let batch_size = self.cfg.providers.embedding.batch_size.max(1) as usize;
		let timeout_ms = self.cfg.storage.qdrant.timeout_ms;
		let store = self.store.as_ref();
		let mut inserted = 0;

		for batch in chunks.chunks(batch_size) {
			let texts: Vec<String> = batch.iter().map(|chunk| chunk.text().to_string()).collect();
			let vectors = self.embed_texts(&texts).await?;
			let points: Vec<StoredPoint> = batch
				.iter()
				.cloned()
				.zip(vectors)
				.map(|(chunk, vector)| StoredPoint { chunk, vector })
				.collect();

			with_retry(self.retry, "upsert", move || {
				let fut = store.insert(collection, points.clone());

				timed("Upsert", timeout_ms, fut)
			})
			.await?;

			inserted += batch.len();

			debug!(collection, batch = batch.len(), inserted, "Chunk batch stored.");
		}

		info!(collection, inserted, duplicates, skipped, ?state, "Chunks ingested.");

		Ok(InsertReport {
			inserted,
			duplicates,
			skipped,
			state,
			hashes: chunks.iter().map(Chunk::hash).collect(),
		})
	}

	pub async fn delete_chunks(&self, collection: &str, hashes: &[ChunkHash]) -> Result<()> {
		let collection = require_collection(collection)?;

		if hashes.is_empty() {
			return Ok(());
		}

		let timeout_ms = self.cfg.storage.qdrant.timeout_ms;

		timed("Delete", timeout_ms, self.store.delete_by_hash(collection, hashes)).await?;

		info!(collection, count = hashes.len(), "Chunks deleted.");

		Ok(())
	}

	pub async fn purge_collection(&self, collection: &str) -> Result<()> {
		let collection = require_collection(collection)?;
		let timeout_ms = self.cfg.storage.qdrant.timeout_ms;

		timed("Purge", timeout_ms, self.store.purge(collection)).await?;

		info!(collection, "Collection purged.");

		Ok(())
	}

	/// Updates keywords, conditions, links or metadata of a stored chunk without re-embedding.
	pub async fn patch_chunk(
		&self,
		collection: &str,
		hash: ChunkHash,
		patch: ChunkPatch,
	) -> Result<Chunk> {
		let collection = require_collection(collection)?;

		if patch.is_empty() {
			return Err(Error::InvalidRequest {
				message: "patch must change at least one field.".to_string(),
			});
		}
		if let Some(Some(set)) = patch.conditions.as_ref() {
			check_chunk_conditions(set)?;
		}

		let timeout_ms = self.cfg.storage.qdrant.timeout_ms;
		let patched = timed("Patch", timeout_ms, self.store.patch(collection, hash, patch))
			.await?
			.ok_or_else(|| Error::NotFound {
				message: format!("Chunk {hash} does not exist in collection {collection}."),
			})?;

		info!(collection, chunk_hash = hash, "Chunk patched.");

		Ok(patched)
	}

	async fn ensure_collection(&self, collection: &str) -> Result<CollectionState> {
		let qdrant = &self.cfg.storage.qdrant;
		let fut = self.store.ensure_collection(
			collection,
			qdrant.vector_dim,
			qdrant.allow_recreate_on_dimension_mismatch,
		);

		timed("Ensure collection", qdrant.timeout_ms, fut).await
	}

	async fn build_chunk(&self, input: ChunkInput) -> Result<Chunk> {
		let keywords = match input.keywords.as_ref() {
			Some(keywords) => keywords.clone(),
			None => self.auto_keywords(&input).await?,
		};
		let ChunkInput { text, conditions, links, mut metadata, source, .. } = input;

		metadata
			.entry("source_type".to_string())
			.or_insert_with(|| Value::from(source.as_str()));

		let mut chunk = Chunk::new(text).with_keywords(keywords).with_links(links);

		if let Some(conditions) = conditions {
			chunk = chunk.with_conditions(conditions);
		}

		chunk.metadata = metadata;

		Ok(chunk)
	}

	/// Keywords for an input that brought none. Chat and lorebook inputs use their dedicated
	/// extractors; plain text follows `keywords.extractor`.
	async fn auto_keywords(&self, input: &ChunkInput) -> Result<Vec<Keyword>> {
		let level = ExtractionLevel::parse(&self.cfg.keywords.level).unwrap_or_default();

		if level == ExtractionLevel::Off {
			return Ok(Vec::new());
		}
		if self.cfg.keywords.source == "yake" {
			return self.remote_keywords(input, level).await;
		}

		let keywords = match input.source {
			ChunkSource::Lorebook => self.extractor.extract_lorebook(
				&LorebookEntry { keys: input.lorebook_keys.clone(), content: input.text.clone() },
				level,
			),
			ChunkSource::Chat => self.extractor.extract_chat_message(&input.text, level),
			ChunkSource::Text if self.cfg.keywords.extractor == "tfidf" =>
				self.extractor.extract_tfidf(&input.text, level),
			ChunkSource::Text => self.extractor.extract_text(&input.text, level),
		};

		Ok(keywords)
	}

	/// Ranked keywords from the YAKE server, weighted linearly by rank. Lorebook keys still
	/// come first at the base weight.
	async fn remote_keywords(
		&self,
		input: &ChunkInput,
		level: ExtractionLevel,
	) -> Result<Vec<Keyword>> {
		let Some(cfg) = self.cfg.providers.keywords.as_ref() else {
			return Err(Error::Config(hare_config::Error::Validation {
				message: "providers.keywords must be set when keywords.source is yake.".to_string(),
			}));
		};
		let timeout = Duration::from_millis(cfg.timeout_ms);
		let text = input.text.as_str();
		let provider = self.providers.keywords.as_ref();
		let scored = with_retry(self.retry, "keywords", move || async move {
			match tokio::time::timeout(timeout, provider.extract(cfg, text)).await {
				Ok(result) => result,
				Err(_) => Err(hare_providers::Error::Timeout { timeout_ms: cfg.timeout_ms }),
			}
		})
		.await?;
		let ranked: Vec<String> = scored
			.into_iter()
			.map(|keyword| keyword.text.to_lowercase())
			.take(level.max_keywords())
			.collect();
		let mut keywords = Vec::new();

		if input.source == ChunkSource::Lorebook {
			let explicit = LorebookEntry { keys: input.lorebook_keys.clone(), content: String::new() };

			keywords.extend(self.extractor.extract_lorebook(&explicit, level));
		}

		keywords.extend(self.extractor.weights_by_rank(ranked));

		Ok(dedup_keywords(keywords))
	}
}

fn require_collection(collection: &str) -> Result<&str> {
	let collection = collection.trim();

	if collection.is_empty() {
		return Err(Error::InvalidRequest { message: "collection must be non-empty.".to_string() });
	}

	Ok(collection)
}

fn check_chunk_conditions(set: &ConditionSet) -> Result<()> {
	let report = validate_condition_set(set, ConditionScope::Chunk);

	if report.valid {
		return Ok(());
	}

	Err(Error::InvalidRequest {
		message: format!("Chunk conditions are invalid: {}", report.errors.join(" ")),
	})
}
