use crate::{
	chunk::Keyword,
	ranked::{RankedChunk, sort_by_score},
};

const MIN_OVERFETCH: usize = 10;
const MAX_OVERFETCH: usize = 100;

/// Candidates to request before boosting and filtering so the final top-K is not cut short.
pub fn overfetch_amount(top_k: usize) -> usize {
	top_k.saturating_mul(2).clamp(MIN_OVERFETCH, MAX_OVERFETCH)
}

/// Multiplies each score by `1 + Σ(weight − 1)` over the chunk keywords found in `query`, then
/// re-sorts. Ties keep their incoming order.
pub fn apply_keyword_boost(mut results: Vec<RankedChunk>, query: &str) -> Vec<RankedChunk> {
	let query = normalize_phrase(query);

	if query.is_empty() {
		return results;
	}

	for item in &mut results {
		let matched: Vec<&Keyword> = item
			.chunk
			.keywords
			.iter()
			.filter(|keyword| contains_phrase(&query, &normalize_phrase(&keyword.text)))
			.collect();

		item.original_score = item.chunk.score;

		if matched.is_empty() {
			item.keyword_boost = 1.0;
			item.matched_keywords.clear();

			continue;
		}

		let boost = 1.0 + matched.iter().map(|keyword| keyword.weight - 1.0).sum::<f32>();

		item.matched_keywords = matched.iter().map(|keyword| keyword.text.clone()).collect();
		item.keyword_boost = boost;
		item.chunk.score = item.original_score * boost;
	}

	sort_by_score(&mut results);

	results
}

/// Whole-word or whole-phrase containment, case-insensitive.
pub fn keyword_in_query(keyword: &str, query: &str) -> bool {
	contains_phrase(&normalize_phrase(query), &normalize_phrase(keyword))
}

fn normalize_phrase(text: &str) -> String {
	text.split_whitespace().map(str::to_lowercase).collect::<Vec<_>>().join(" ")
}

fn contains_phrase(haystack: &str, needle: &str) -> bool {
	if needle.is_empty() {
		return false;
	}

	haystack.match_indices(needle).any(|(start, matched)| {
		let end = start + matched.len();
		let before = haystack[..start].chars().next_back();
		let after = haystack[end..].chars().next();

		!before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
	})
}
