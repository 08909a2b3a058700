use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info};

use hare_domain::{
	chunk::{ChunkHash, LinkKind},
	conditions::{ConditionOutcome, ConditionSet, EvaluationContext, RuleKind, SearchContext},
	fusion::{self, FusionList, HybridMode},
	keywords::{apply_keyword_boost, overfetch_amount},
	lexical::{Bm25Params, LexicalDocument, LexicalScorer},
	links::{self, LinkParams, LinkResolution},
	ranked::{RankedChunk, sort_by_score},
};
use hare_providers::retry::with_retry;
use hare_storage::models::PayloadFilter;

use crate::{Error, HareService, Result, timed};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RetrieveRequest {
	pub query: String,
	pub collections: Vec<String>,
	/// Falls back to `retrieval.top_k`.
	#[serde(default)]
	pub top_k: Option<u32>,
	#[serde(default)]
	pub context: SearchContext,
	/// Metadata match pushed down into the vector search.
	#[serde(skip)]
	pub filter: Option<PayloadFilter>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
	QueryIssued,
	VectorSearchDone,
	KeywordBoosted,
	ConditionsFiltered,
	LinksResolved,
	Trimmed,
}
impl Stage {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::QueryIssued => "query_issued",
			Self::VectorSearchDone => "vector_search_done",
			Self::KeywordBoosted => "keyword_boosted",
			Self::ConditionsFiltered => "conditions_filtered",
			Self::LinksResolved => "links_resolved",
			Self::Trimmed => "trimmed",
		}
	}
}

#[derive(Clone, Debug, Serialize)]
pub struct StageTrace {
	pub stage: Stage,
	/// Candidates alive when the stage finished.
	pub candidates: usize,
	pub elapsed_ms: u64,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct RetrieveResponse {
	pub items: Vec<RankedChunk>,
	/// Hard-link targets that no active collection could supply.
	pub missing_hard_links: Vec<ChunkHash>,
	/// Collections whose activation conditions did not pass.
	pub skipped_collections: Vec<String>,
	pub trace: Vec<StageTrace>,
}

struct StageTimer {
	started: Instant,
	trace: Vec<StageTrace>,
}
impl StageTimer {
	fn start() -> Self {
		Self { started: Instant::now(), trace: Vec::new() }
	}

	fn record(&mut self, stage: Stage, candidates: usize) {
		let elapsed_ms = self.started.elapsed().as_millis() as u64;

		debug!(stage = stage.as_str(), candidates, elapsed_ms, "Retrieval stage finished.");

		self.trace.push(StageTrace { stage, candidates, elapsed_ms });
	}
}

impl HareService {
	/// Ranks stored chunks for the current moment of a conversation: overfetch, score, boost,
	/// filter, resolve links, trim.
	pub async fn retrieve(&self, req: RetrieveRequest) -> Result<RetrieveResponse> {
		let query = req.query.trim();

		if query.is_empty() {
			return Err(Error::InvalidRequest { message: "query must be non-empty.".to_string() });
		}

		let collections = dedup_collections(&req.collections);

		if collections.is_empty() {
			return Err(Error::InvalidRequest {
				message: "collections must be non-empty.".to_string(),
			});
		}

		let top_k = req.top_k.unwrap_or(self.cfg.retrieval.top_k) as usize;

		if top_k == 0 {
			return Err(Error::InvalidRequest {
				message: "top_k must be greater than zero.".to_string(),
			});
		}

		let search = req.context.bounded(self.cfg.conditions.message_window as usize);
		let mut timer = StageTimer::start();

		timer.record(Stage::QueryIssued, 0);

		let partition = self.collection_conditions.partition(&self.engine, &collections, &search);

		if partition.active.is_empty() {
			info!(
				skipped = partition.skipped.len(),
				"No collection passed its activation conditions."
			);

			return Ok(RetrieveResponse {
				skipped_collections: partition.skipped,
				trace: timer.trace,
				..RetrieveResponse::default()
			});
		}

		let overfetch = overfetch_amount(top_k);
		let vector = self
			.embed_texts(&[query.to_string()])
			.await?
			.into_iter()
			.next()
			.ok_or_else(|| Error::Data { message: "Query embedding is missing.".to_string() })?;
		let candidates = self
			.vector_candidates(&partition.active, &vector, query, overfetch, req.filter.as_ref())
			.await?;
		let candidates = self.fuse_lexical(query, candidates);

		timer.record(Stage::VectorSearchDone, candidates.len());

		if candidates.is_empty() {
			info!(collections = partition.active.len(), "Vector search returned no candidates.");

			return Ok(RetrieveResponse {
				skipped_collections: partition.skipped,
				trace: timer.trace,
				..RetrieveResponse::default()
			});
		}

		let boosted = apply_keyword_boost(candidates, query);

		timer.record(Stage::KeywordBoosted, boosted.len());

		let (mut batch, frequency_passed) = self.filter_by_conditions(boosted, &search);

		timer.record(Stage::ConditionsFiltered, batch.len());

		let resolution = self.resolve_links(&partition.active, &mut batch).await?;

		timer.record(Stage::LinksResolved, batch.len());

		let items = trim_to_top_k(batch, top_k);

		timer.record(Stage::Trimmed, items.len());

		for item in items.iter().filter(|item| !item.via_hard_link) {
			if frequency_passed.contains(&item.hash()) {
				self.history.record(item.hash(), search.message_count);
			}
		}

		info!(
			query_len = query.len(),
			collections = partition.active.len(),
			returned = items.len(),
			missing_hard_links = resolution.missing_hard_links.len(),
			"Retrieval finished."
		);

		Ok(RetrieveResponse {
			items,
			missing_hard_links: resolution.missing_hard_links,
			skipped_collections: partition.skipped,
			trace: timer.trace,
		})
	}

	/// Queries every active collection, flattens the hits best first, and keeps the best copy
	/// of a chunk stored in more than one collection.
	async fn vector_candidates(
		&self,
		collections: &[String],
		vector: &[f32],
		query: &str,
		limit: usize,
		filter: Option<&PayloadFilter>,
	) -> Result<Vec<RankedChunk>> {
		let timeout_ms = self.cfg.retrieval.query_timeout_ms;
		let store = self.store.as_ref();
		let mut hits = with_retry(self.retry, "vector_query", move || {
			let fut = store.query_multi(collections, vector, query, limit, filter);

			timed("Vector query", timeout_ms, fut)
		})
		.await?;
		let mut candidates = Vec::new();

		for collection in collections {
			for chunk in hits.remove(collection).unwrap_or_default() {
				candidates.push(RankedChunk::new(collection.clone(), chunk));
			}
		}

		sort_by_score(&mut candidates);

		let mut seen = HashSet::new();

		candidates.retain(|item| seen.insert(item.hash()));

		Ok(candidates)
	}

	/// Fuses the vector ranking with BM25+ over the candidate texts when hybrid mode is on.
	fn fuse_lexical(&self, query: &str, candidates: Vec<RankedChunk>) -> Vec<RankedChunk> {
		let cfg = &self.cfg.retrieval;
		let mode = HybridMode::parse(&cfg.hybrid).unwrap_or_default();

		if mode == HybridMode::Off || candidates.is_empty() {
			return candidates;
		}

		let documents: Vec<LexicalDocument> = candidates
			.iter()
			.map(|item| LexicalDocument {
				text: item.chunk.text().to_string(),
				title: None,
				tags: item.chunk.keywords.iter().map(|keyword| keyword.text.clone()).collect(),
			})
			.collect();
		let mut scorer =
			LexicalScorer::new(self.analyzer.clone(), Bm25Params::from(&self.cfg.lexical));

		scorer.index(&documents);

		let vector_list = FusionList::new(
			cfg.vector_weight,
			candidates.iter().enumerate().map(|(index, item)| (index as u64, item.score())).collect(),
		);
		let lexical_list = FusionList::new(
			cfg.keyword_weight,
			scorer
				.search(query, candidates.len())
				.into_iter()
				.map(|(index, score)| (index as u64, score))
				.collect(),
		);
		let lists = [vector_list, lexical_list];
		// Scaled into [0, 1] so scoreThreshold rules and soft-link boosts keep their meaning.
		let fused = match mode {
			HybridMode::Rrf => fusion::scale_to_unit(
				fusion::reciprocal_rank_fusion(&lists, cfg.rrf_k),
				fusion::rrf_ceiling(&lists, cfg.rrf_k),
			),
			HybridMode::Weighted => fusion::scale_to_unit(
				fusion::weighted_fusion(&lists),
				fusion::weighted_ceiling(&lists),
			),
			HybridMode::Off => return candidates,
		};
		let mut slots: Vec<Option<RankedChunk>> = candidates.into_iter().map(Some).collect();
		let mut out = Vec::with_capacity(slots.len());

		for (index, score) in fused {
			let Some(mut item) = slots.get_mut(index as usize).and_then(Option::take) else {
				continue;
			};

			item.chunk.score = score;
			item.original_score = score;

			out.push(item);
		}

		debug!(mode = ?mode, candidates = out.len(), "Hybrid fusion applied.");

		out
	}

	/// Drops candidates whose condition set does not activate. Order is preserved. Also returns
	/// the survivors whose own `frequency` rule passed; only those count as activations.
	fn filter_by_conditions(
		&self,
		batch: Vec<RankedChunk>,
		search: &SearchContext,
	) -> (Vec<RankedChunk>, HashSet<ChunkHash>) {
		let before = batch.len();
		let mut frequency_passed = HashSet::new();
		let kept: Vec<RankedChunk> = batch
			.into_iter()
			.filter(|item| match item.chunk.conditions.as_ref() {
				Some(set) => {
					let ctx = EvaluationContext::for_chunk(search, &item.chunk, &self.history);
					let outcome = self.engine.evaluate_all(set, &ctx);

					if outcome.activated && frequency_rule_passed(set, &outcome) {
						frequency_passed.insert(item.hash());
					}

					outcome.activated
				},
				None => true,
			})
			.collect();

		debug!(before, after = kept.len(), "Condition filtering finished.");

		(kept, frequency_passed)
	}

	/// Fetches missing hard-link targets for up to `links.max_iterations` rounds, then applies
	/// soft-link boosts over the final batch.
	async fn resolve_links(
		&self,
		collections: &[String],
		batch: &mut Vec<RankedChunk>,
	) -> Result<LinkResolution> {
		let params = LinkParams::from(&self.cfg.links);
		let mut attempted = HashSet::new();
		let mut round = 0;
		let resolution = loop {
			let resolution = links::resolve(batch, &links::links_by_hash(batch), params);
			let pending: Vec<ChunkHash> = resolution
				.missing_hard_links
				.iter()
				.copied()
				.filter(|hash| !attempted.contains(hash))
				.collect();

			if pending.is_empty() || round >= self.cfg.links.max_iterations {
				break resolution;
			}

			round += 1;

			attempted.extend(pending.iter().copied());

			let fetched = self.fetch_linked(collections, &pending).await?;

			debug!(
				round,
				requested = pending.len(),
				fetched = fetched.len(),
				"Fetched hard-link targets."
			);

			batch.extend(fetched);
		};

		links::apply_soft_boosts(batch, &resolution, params);

		Ok(resolution)
	}

	/// Looks up `hashes` in each collection in turn until all are found.
	async fn fetch_linked(
		&self,
		collections: &[String],
		hashes: &[ChunkHash],
	) -> Result<Vec<RankedChunk>> {
		let timeout_ms = self.cfg.retrieval.query_timeout_ms;
		let mut remaining = hashes.to_vec();
		let mut out = Vec::new();

		for collection in collections {
			if remaining.is_empty() {
				break;
			}

			let chunks =
				timed("Hard link fetch", timeout_ms, self.store.fetch(collection, &remaining)).await?;

			for chunk in chunks {
				remaining.retain(|hash| *hash != chunk.hash());

				let mut item = RankedChunk::new(collection.clone(), chunk);

				item.via_hard_link = true;

				out.push(item);
			}
		}

		Ok(out)
	}
}

/// First `top_k` query hits, then every hard-link target those hits depend on, followed
/// transitively.
fn trim_to_top_k(batch: Vec<RankedChunk>, top_k: usize) -> Vec<RankedChunk> {
	let mut kept = Vec::with_capacity(top_k);
	let mut tail = Vec::new();

	for item in batch {
		if !item.via_hard_link && kept.len() < top_k {
			kept.push(item);
		} else {
			tail.push(item);
		}
	}

	loop {
		let required: HashSet<ChunkHash> = kept
			.iter()
			.flat_map(|item| item.chunk.links.iter())
			.filter(|link| link.kind == LinkKind::Hard)
			.map(|link| link.target)
			.collect();
		let (pulled, rest): (Vec<RankedChunk>, Vec<RankedChunk>) =
			tail.into_iter().partition(|item| required.contains(&item.hash()));

		tail = rest;

		if pulled.is_empty() {
			break;
		}

		kept.extend(pulled);
	}

	kept
}

fn frequency_rule_passed(set: &ConditionSet, outcome: &ConditionOutcome) -> bool {
	set.rules
		.iter()
		.zip(&outcome.results)
		.any(|(rule, result)| rule.kind() == Some(RuleKind::Frequency) && result.passed)
}

fn dedup_collections(collections: &[String]) -> Vec<String> {
	let mut seen = HashSet::new();

	collections
		.iter()
		.map(|collection| collection.trim())
		.filter(|collection| !collection.is_empty() && seen.insert(*collection))
		.map(str::to_string)
		.collect()
}
