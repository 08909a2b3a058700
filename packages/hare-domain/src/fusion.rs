//! Hybrid fusion of a vector ranking with a lexical ranking.

use std::collections::{HashMap, HashSet};

use crate::{chunk::ChunkHash, cmp_f32_desc};

pub const DEFAULT_RRF_K: f32 = 60.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HybridMode {
	#[default]
	Off,
	Rrf,
	Weighted,
}
impl HybridMode {
	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"off" => Some(Self::Off),
			"rrf" => Some(Self::Rrf),
			"weighted" => Some(Self::Weighted),
			_ => None,
		}
	}
}

/// One ranked list, best first, with its scores.
#[derive(Clone, Debug, Default)]
pub struct FusionList {
	pub weight: f32,
	pub items: Vec<(ChunkHash, f32)>,
}
impl FusionList {
	pub fn new(weight: f32, items: Vec<(ChunkHash, f32)>) -> Self {
		Self { weight, items }
	}
}

/// `Σ weight_i / (k + rank_i)` with 1-based ranks. Scores inside each list are ignored; a
/// repeated id only counts at its best rank.
pub fn reciprocal_rank_fusion(lists: &[FusionList], k: f32) -> Vec<(ChunkHash, f32)> {
	let mut fused = Accumulator::default();

	for list in lists {
		let mut seen = HashSet::new();
		let mut rank = 0_usize;

		for (id, _) in &list.items {
			if !seen.insert(*id) {
				continue;
			}

			rank += 1;

			fused.add(*id, list.weight / (k + rank as f32));
		}
	}

	fused.ranked()
}

/// Weighted sum of min–max normalized scores. A list whose scores are all equal
/// normalizes every entry to 1.0.
pub fn weighted_fusion(lists: &[FusionList]) -> Vec<(ChunkHash, f32)> {
	let mut fused = Accumulator::default();

	for list in lists {
		let finite = list.items.iter().map(|(_, score)| *score).filter(|score| score.is_finite());
		let (min, max) = finite.fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), score| {
			(min.min(score), max.max(score))
		});
		let span = max - min;
		let mut seen = HashSet::new();

		for (id, score) in &list.items {
			if !seen.insert(*id) {
				continue;
			}

			let normalized = if !score.is_finite() {
				0.0
			} else if span > f32::EPSILON {
				(score - min) / span
			} else {
				1.0
			};

			fused.add(*id, list.weight * normalized);
		}
	}

	fused.ranked()
}

/// Best score `reciprocal_rank_fusion` can produce: an id ranked first in every list.
pub fn rrf_ceiling(lists: &[FusionList], k: f32) -> f32 {
	lists.iter().map(|list| list.weight.max(0.0)).sum::<f32>() / (k + 1.0)
}

/// Best score `weighted_fusion` can produce: an id at the top of every list.
pub fn weighted_ceiling(lists: &[FusionList]) -> f32 {
	lists.iter().map(|list| list.weight.max(0.0)).sum()
}

/// Divides fused scores by `ceiling` so they land in [0, 1] like vector similarities.
/// Order is unchanged; a non-positive ceiling leaves scores as they are.
pub fn scale_to_unit(mut fused: Vec<(ChunkHash, f32)>, ceiling: f32) -> Vec<(ChunkHash, f32)> {
	if ceiling > 0.0 {
		for (_, score) in &mut fused {
			*score /= ceiling;
		}
	}

	fused
}

/// Sums per id and remembers first-seen order for ties.
#[derive(Default)]
struct Accumulator {
	order: Vec<ChunkHash>,
	scores: HashMap<ChunkHash, f32>,
}
impl Accumulator {
	fn add(&mut self, id: ChunkHash, score: f32) {
		match self.scores.get_mut(&id) {
			Some(total) => *total += score,
			None => {
				self.scores.insert(id, score);
				self.order.push(id);
			},
		}
	}

	fn ranked(self) -> Vec<(ChunkHash, f32)> {
		let Self { order, scores } = self;
		let mut out: Vec<(ChunkHash, f32)> =
			order.into_iter().map(|id| (id, scores.get(&id).copied().unwrap_or(0.0))).collect();

		out.sort_by(|a, b| cmp_f32_desc(a.1, b.1));

		out
	}
}
