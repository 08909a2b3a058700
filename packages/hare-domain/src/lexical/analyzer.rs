use moka::sync::Cache;
use rust_stemmers::{Algorithm, Stemmer};

pub const DEFAULT_STEM_CACHE_CAPACITY: u64 = 10_000;

const MIN_TOKEN_CHARS: usize = 2;

const STOP_WORDS: &[&str] = &[
	"a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
	"are", "aren't", "as", "at", "be", "because", "been", "before", "being", "below", "between",
	"both", "but", "by", "can", "cannot", "could", "couldn't", "did", "didn't", "do", "does",
	"doesn't", "doing", "don't", "down", "during", "each", "else", "even", "ever", "every", "few",
	"for", "from", "further", "get", "got", "had", "hadn't", "has", "hasn't", "have", "haven't",
	"having", "he", "he'd", "he'll", "he's", "her", "here", "here's", "hers", "herself", "him",
	"himself", "his", "how", "how's", "however", "i", "i'd", "i'll", "i'm", "i've", "if", "in",
	"into", "is", "isn't", "it", "it's", "its", "itself", "just", "let's", "like", "may", "me",
	"might", "more", "most", "much", "must", "mustn't", "my", "myself", "no", "nor", "not", "now",
	"of", "off", "on", "once", "only", "or", "other", "ought", "our", "ours", "ourselves", "out",
	"over", "own", "same", "say", "says", "shall", "shan't", "she", "she'd", "she'll", "she's",
	"should", "shouldn't", "since", "so", "some", "still", "such", "than", "that", "that's", "the",
	"their", "theirs", "them", "themselves", "then", "there", "there's", "these", "they", "they'd",
	"they'll", "they're", "they've", "this", "those", "though", "through", "thus", "to", "too",
	"under", "until", "up", "upon", "us", "very", "was", "wasn't", "we", "we'd", "we'll", "we're",
	"we've", "were", "weren't", "what", "what's", "when", "when's", "where", "where's", "whether",
	"which", "while", "who", "who's", "whom", "whose", "why", "why's", "will", "with", "within",
	"without", "won't", "would", "wouldn't", "yet", "you", "you'd", "you'll", "you're", "you've",
	"your", "yours", "yourself", "yourselves",
];

pub fn is_stop_word(word: &str) -> bool {
	STOP_WORDS.binary_search(&word).is_ok()
}

/// Lowercases, splits on anything that is not alphanumeric or an apostrophe, and drops stop
/// words and tokens shorter than two characters. No stemming.
pub fn tokenize(text: &str) -> Vec<String> {
	let lowered = text.to_lowercase();
	let mut tokens = Vec::new();

	for raw in lowered.split(|ch: char| !(ch.is_alphanumeric() || ch == '\'')) {
		let word = raw.trim_matches('\'');

		if word.chars().count() < MIN_TOKEN_CHARS || is_stop_word(word) {
			continue;
		}

		// Possessives and contractions stem to their head word.
		let word = word.split('\'').next().unwrap_or(word);

		if word.chars().count() < MIN_TOKEN_CHARS {
			continue;
		}

		tokens.push(word.to_string());
	}

	tokens
}

/// Tokenizer plus Snowball English stemmer with a bounded stem cache. Shared through `Arc` by
/// every scorer built from the same configuration.
pub struct Analyzer {
	stemmer: Stemmer,
	stems: Cache<String, String>,
}
impl Analyzer {
	pub fn new(stem_cache_capacity: u64) -> Self {
		Self {
			stemmer: Stemmer::create(Algorithm::English),
			stems: Cache::builder().max_capacity(stem_cache_capacity).build(),
		}
	}

	/// Tokens, stemmed.
	pub fn analyze(&self, text: &str) -> Vec<String> {
		tokenize(text).into_iter().map(|token| self.stem(&token)).collect()
	}

	pub fn stem(&self, token: &str) -> String {
		if let Some(stem) = self.stems.get(token) {
			return stem;
		}

		let stem = self.stemmer.stem(token).into_owned();

		self.stems.insert(token.to_string(), stem.clone());

		stem
	}

	pub fn cached_stems(&self) -> u64 {
		self.stems.run_pending_tasks();

		self.stems.entry_count()
	}

	pub fn reset(&self) {
		self.stems.invalidate_all();
	}
}
impl Default for Analyzer {
	fn default() -> Self {
		Self::new(DEFAULT_STEM_CACHE_CAPACITY)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn stop_words_are_sorted_for_lookup() {
		assert!(STOP_WORDS.windows(2).all(|pair| pair[0] < pair[1]));
		assert!(STOP_WORDS.len() >= 180);
		assert!(is_stop_word("the"));
		assert!(!is_stop_word("dragon"));
	}

	#[test]
	fn tokenize_strips_punctuation_and_short_tokens() {
		assert_eq!(
			tokenize("The dragon's hoard, a-b-c: GOLD!! x"),
			vec!["dragon".to_string(), "hoard".to_string(), "gold".to_string()]
		);
		assert!(tokenize("").is_empty());
		assert!(tokenize("the and of").is_empty());
	}

	#[test]
	fn analyze_stems_and_caches() {
		let analyzer = Analyzer::new(16);

		assert_eq!(analyzer.analyze("running runs"), vec!["run".to_string(), "run".to_string()]);
		assert_eq!(analyzer.stem("castles"), analyzer.stem("castle"));
		assert!(analyzer.cached_stems() >= 3);

		analyzer.reset();

		assert!(analyzer.stems.get("castles").is_none());
	}
}
