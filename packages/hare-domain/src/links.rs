use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::{
	chunk::{ChunkHash, ChunkLink, LinkKind},
	ranked::{RankedChunk, sort_by_score},
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinkParams {
	/// Added to a target once per incoming soft link.
	pub soft_boost: f32,
	pub max_score: f32,
}
impl Default for LinkParams {
	fn default() -> Self {
		Self { soft_boost: 0.15, max_score: 1.0 }
	}
}
impl From<&hare_config::Links> for LinkParams {
	fn from(cfg: &hare_config::Links) -> Self {
		Self { soft_boost: cfg.soft_boost, max_score: cfg.max_score }
	}
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct LinkResolution {
	/// Hard-link targets absent from the batch, first-seen order.
	pub missing_hard_links: Vec<ChunkHash>,
	/// Summed soft-link boost per target hash.
	pub soft_boosts: HashMap<ChunkHash, f32>,
}
impl LinkResolution {
	pub fn is_complete(&self) -> bool {
		self.missing_hard_links.is_empty()
	}
}

/// Links of every chunk in the batch, keyed by source hash.
pub fn links_by_hash(batch: &[RankedChunk]) -> HashMap<ChunkHash, Vec<ChunkLink>> {
	batch
		.iter()
		.filter(|item| !item.chunk.links.is_empty())
		.map(|item| (item.hash(), item.chunk.links.clone()))
		.collect()
}

/// Collects missing hard-link targets and soft-link boosts over one batch. Only links whose
/// source is in the batch count; chains beyond one hop need another call after fetching.
pub fn resolve(
	batch: &[RankedChunk],
	links_by_hash: &HashMap<ChunkHash, Vec<ChunkLink>>,
	params: LinkParams,
) -> LinkResolution {
	let present: HashSet<ChunkHash> = batch.iter().map(RankedChunk::hash).collect();
	let mut seen_missing = HashSet::new();
	let mut resolution = LinkResolution::default();

	for item in batch {
		let source = item.hash();
		let Some(links) = links_by_hash.get(&source) else { continue };

		for link in links {
			if link.target == source {
				continue;
			}

			match link.kind {
				LinkKind::Hard => {
					if !present.contains(&link.target) && seen_missing.insert(link.target) {
						resolution.missing_hard_links.push(link.target);
					}
				},
				LinkKind::Soft => {
					*resolution.soft_boosts.entry(link.target).or_default() += params.soft_boost;
				},
			}
		}
	}

	resolution
}

/// Adds soft-link boosts, capped at `max_score` without ever lowering a score, and re-sorts.
pub fn apply_soft_boosts(batch: &mut [RankedChunk], resolution: &LinkResolution, params: LinkParams) {
	if resolution.soft_boosts.is_empty() {
		return;
	}

	for item in batch.iter_mut() {
		let Some(&boost) = resolution.soft_boosts.get(&item.hash()) else { continue };
		let before = item.chunk.score;
		let after = before.max((before + boost).min(params.max_score));

		item.chunk.score = after;
		item.link_boost = after - before;

		debug!(chunk_hash = item.hash(), boost, before, after, "Soft link boost applied.");
	}

	sort_by_score(batch);
}
