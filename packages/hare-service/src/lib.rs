pub mod activation;
pub mod ingest;
pub mod retrieve;
pub mod store;

mod error;

pub use error::{Error, Result};
pub use ingest::{ChunkInput, ChunkSource, InsertReport};
pub use retrieve::{RetrieveRequest, RetrieveResponse, Stage, StageTrace};

use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc, time::Duration};

use tracing::debug;

use activation::CollectionConditions;
use hare_config::{Config, EmbeddingProviderConfig, KeywordProviderConfig};
use hare_domain::{
	chunk::{Chunk, ChunkHash, ChunkPatch},
	conditions::{
		ActivationHistory, ConditionEngine, ExpressionProvider, NoExpressions, RandomSource,
		ThreadRandom,
	},
	keywords::{KeywordExtractor, KeywordWeights},
	lexical::Analyzer,
};
use hare_providers::{
	embedding,
	keywords::{self, ScoredKeyword},
	rate_limit::RateLimiter,
	retry::{RetryPolicy, with_retry},
};
use hare_storage::models::{CollectionState, PayloadFilter, StoredPoint};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, hare_providers::Result<Vec<Vec<f32>>>>;
}

pub trait KeywordProvider
where
	Self: Send + Sync,
{
	fn extract<'a>(
		&'a self,
		cfg: &'a KeywordProviderConfig,
		text: &'a str,
	) -> BoxFuture<'a, hare_providers::Result<Vec<ScoredKeyword>>>;
}

/// Vector store contract the pipeline consumes. Collection ids are logical; the store maps
/// them to physical names.
pub trait VectorStore
where
	Self: Send + Sync,
{
	/// Creates the collection when missing. A dimension mismatch fails unless
	/// `allow_recreate`, which drops and rebuilds it.
	fn ensure_collection<'a>(
		&'a self,
		collection: &'a str,
		dim: u32,
		allow_recreate: bool,
	) -> BoxFuture<'a, Result<CollectionState>>;

	fn insert<'a>(&'a self, collection: &'a str, items: Vec<StoredPoint>)
	-> BoxFuture<'a, Result<()>>;

	/// Nearest chunks, best first, with similarity as the chunk score. `text` is the raw query
	/// for stores that can score it server-side; dense-only stores ignore it.
	fn query<'a>(
		&'a self,
		collection: &'a str,
		vector: &'a [f32],
		text: &'a str,
		limit: usize,
		filter: Option<&'a PayloadFilter>,
	) -> BoxFuture<'a, Result<Vec<Chunk>>>;

	/// Stored chunks for `hashes`. Unknown hashes are skipped.
	fn fetch<'a>(
		&'a self,
		collection: &'a str,
		hashes: &'a [ChunkHash],
	) -> BoxFuture<'a, Result<Vec<Chunk>>>;

	fn delete_by_hash<'a>(
		&'a self,
		collection: &'a str,
		hashes: &'a [ChunkHash],
	) -> BoxFuture<'a, Result<()>>;

	fn purge<'a>(&'a self, collection: &'a str) -> BoxFuture<'a, Result<()>>;

	/// Replaces everything but the text and vector of a stored chunk.
	fn replace_payload<'a>(&'a self, collection: &'a str, chunk: &'a Chunk)
	-> BoxFuture<'a, Result<()>>;

	fn query_multi<'a>(
		&'a self,
		collections: &'a [String],
		vector: &'a [f32],
		text: &'a str,
		limit: usize,
		filter: Option<&'a PayloadFilter>,
	) -> BoxFuture<'a, Result<HashMap<String, Vec<Chunk>>>> {
		Box::pin(async move {
			let mut out = HashMap::with_capacity(collections.len());

			for collection in collections {
				let hits = self.query(collection, vector, text, limit, filter).await?;

				out.insert(collection.clone(), hits);
			}

			Ok(out)
		})
	}

	/// Applies `patch` to a stored chunk without re-embedding it. `None` when the chunk does
	/// not exist.
	fn patch<'a>(
		&'a self,
		collection: &'a str,
		hash: ChunkHash,
		patch: ChunkPatch,
	) -> BoxFuture<'a, Result<Option<Chunk>>> {
		Box::pin(async move {
			let Some(mut chunk) = self.fetch(collection, &[hash]).await?.into_iter().next() else {
				return Ok(None);
			};

			chunk.apply_patch(patch);

			self.replace_payload(collection, &chunk).await?;

			Ok(Some(chunk))
		})
	}
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub keywords: Arc<dyn KeywordProvider>,
	pub expressions: Arc<dyn ExpressionProvider>,
	pub random: Arc<dyn RandomSource>,
}
impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		keywords: Arc<dyn KeywordProvider>,
		expressions: Arc<dyn ExpressionProvider>,
		random: Arc<dyn RandomSource>,
	) -> Self {
		Self { embedding, keywords, expressions, random }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self {
			embedding: provider.clone(),
			keywords: provider,
			expressions: Arc::new(NoExpressions),
			random: Arc::new(ThreadRandom),
		}
	}
}

struct DefaultProviders;
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, hare_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}
impl KeywordProvider for DefaultProviders {
	fn extract<'a>(
		&'a self,
		cfg: &'a KeywordProviderConfig,
		text: &'a str,
	) -> BoxFuture<'a, hare_providers::Result<Vec<ScoredKeyword>>> {
		Box::pin(keywords::extract(cfg, text))
	}
}

/// Owns every piece of cross-query state: the stem cache, activation history and rate
/// limiter live here rather than in globals.
pub struct HareService {
	pub cfg: Config,
	pub store: Arc<dyn VectorStore>,
	pub providers: Providers,
	pub analyzer: Arc<Analyzer>,
	pub history: ActivationHistory,
	pub(crate) engine: ConditionEngine,
	pub(crate) collection_conditions: CollectionConditions,
	pub(crate) extractor: KeywordExtractor,
	pub(crate) rate_limiter: Option<RateLimiter>,
	pub(crate) retry: RetryPolicy,
}
impl HareService {
	pub fn new(cfg: Config, store: Arc<dyn VectorStore>) -> Result<Self> {
		Self::with_providers(cfg, store, Providers::default())
	}

	/// Validates `cfg` before anything touches the network.
	pub fn with_providers(
		cfg: Config,
		store: Arc<dyn VectorStore>,
		providers: Providers,
	) -> Result<Self> {
		hare_config::validate(&cfg)?;

		let collection_conditions = CollectionConditions::from_config(&cfg.conditions)?;
		let engine = ConditionEngine::new(providers.expressions.clone(), providers.random.clone());

		Ok(Self {
			analyzer: Arc::new(Analyzer::new(cfg.lexical.stem_cache_capacity)),
			history: ActivationHistory::new(),
			engine,
			collection_conditions,
			extractor: KeywordExtractor::new(KeywordWeights::from(&cfg.keywords)),
			rate_limiter: RateLimiter::from_config(&cfg.rate_limit),
			retry: RetryPolicy::from(&cfg.retry),
			cfg,
			store,
			providers,
		})
	}

	/// Clears activation history, cached stems and recorded rate-limit calls.
	pub fn reset_state(&self) {
		self.history.reset();
		self.analyzer.reset();

		if let Some(limiter) = &self.rate_limiter {
			limiter.reset();
		}
	}

	/// Embeds `texts` through the rate limiter with per-attempt timeout and retry, then checks
	/// the count and shape of what came back.
	pub(crate) async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
		let cfg = &self.cfg.providers.embedding;
		let timeout = Duration::from_millis(cfg.timeout_ms);
		let vectors = with_retry(self.retry, "embed", move || async move {
			if let Some(limiter) = &self.rate_limiter {
				limiter.acquire().await;
			}

			match tokio::time::timeout(timeout, self.providers.embedding.embed(cfg, texts)).await {
				Ok(result) => result,
				Err(_) => Err(hare_providers::Error::Timeout { timeout_ms: cfg.timeout_ms }),
			}
		})
		.await?;

		check_embeddings(&vectors, texts.len(), cfg.dimensions)?;

		debug!(count = vectors.len(), "Embeddings received.");

		Ok(vectors)
	}
}

/// Bounds a store call by `timeout_ms`; dropping the future cancels the call.
pub(crate) async fn timed<T>(
	operation: &str,
	timeout_ms: u64,
	fut: impl Future<Output = Result<T>>,
) -> Result<T> {
	match tokio::time::timeout(Duration::from_millis(timeout_ms), fut).await {
		Ok(result) => result,
		Err(_) => Err(Error::Timeout { operation: operation.to_string(), timeout_ms }),
	}
}

fn check_embeddings(vectors: &[Vec<f32>], expected_count: usize, dim: u32) -> Result<()> {
	if vectors.len() != expected_count {
		return Err(Error::Data {
			message: format!(
				"Embedding count mismatch: expected {expected_count}, received {}.",
				vectors.len()
			),
		});
	}

	for (index, vector) in vectors.iter().enumerate() {
		if vector.is_empty() {
			return Err(Error::Data { message: format!("Embedding {index} is empty.") });
		}
		if vector.len() != dim as usize {
			return Err(Error::Data {
				message: format!(
					"Embedding {index} has {} dimensions, expected {dim}.",
					vector.len()
				),
			});
		}
		if vector.iter().any(|value| !value.is_finite()) {
			return Err(Error::Data {
				message: format!("Embedding {index} contains a non-finite value."),
			});
		}
	}

	Ok(())
}
