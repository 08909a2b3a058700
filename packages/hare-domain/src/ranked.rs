use serde::Serialize;

use crate::{chunk::Chunk, cmp_f32_desc};

/// A retrieved chunk with the score breakdown that produced its rank.
#[derive(Clone, Debug, Serialize)]
pub struct RankedChunk {
	pub collection_id: String,
	pub chunk: Chunk,
	/// Score before keyword boosting.
	pub original_score: f32,
	/// Multiplier applied by keyword boosting, 1.0 when nothing matched.
	pub keyword_boost: f32,
	pub matched_keywords: Vec<String>,
	/// Score added by incoming soft links.
	pub link_boost: f32,
	/// Fetched to satisfy a hard link rather than found by the query.
	pub via_hard_link: bool,
}
impl RankedChunk {
	pub fn new(collection_id: impl Into<String>, chunk: Chunk) -> Self {
		Self {
			collection_id: collection_id.into(),
			original_score: chunk.score,
			chunk,
			keyword_boost: 1.0,
			matched_keywords: Vec::new(),
			link_boost: 0.0,
			via_hard_link: false,
		}
	}

	pub fn score(&self) -> f32 {
		self.chunk.score
	}

	pub fn hash(&self) -> u64 {
		self.chunk.hash()
	}
}

/// Stable sort, best score first.
pub fn sort_by_score(items: &mut [RankedChunk]) {
	items.sort_by(|a, b| cmp_f32_desc(a.score(), b.score()));
}
