use std::{
	collections::{HashMap, HashSet},
	sync::LazyLock,
};

use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use crate::{
	chunk::{Keyword, MAX_KEYWORD_WEIGHT, dedup_keywords},
	lexical::analyzer::{is_stop_word, tokenize},
};

const FREQUENCY_STEP: f32 = 0.1;
const CAPITALIZATION_BONUS: f32 = 1.3;
const MIN_KEYWORD_CHARS: usize = 3;

static COMPOUND_TERM: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r"\b[A-Za-z0-9]+(?:[/_][A-Za-z0-9]+)+\b").ok());

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExtractionLevel {
	Off,
	Minimal,
	#[default]
	Balanced,
	Aggressive,
}
impl ExtractionLevel {
	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"off" => Some(Self::Off),
			"minimal" => Some(Self::Minimal),
			"balanced" => Some(Self::Balanced),
			"aggressive" => Some(Self::Aggressive),
			_ => None,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Off => "off",
			Self::Minimal => "minimal",
			Self::Balanced => "balanced",
			Self::Aggressive => "aggressive",
		}
	}

	/// Keyword budget of the level, zero when extraction is off.
	pub fn max_keywords(self) -> usize {
		self.limits().map_or(0, |limits| limits.max_keywords)
	}

	fn limits(self) -> Option<LevelLimits> {
		match self {
			Self::Off => None,
			Self::Minimal =>
				Some(LevelLimits { scan_chars: Some(1_000), max_keywords: 3, min_frequency: 2 }),
			Self::Balanced =>
				Some(LevelLimits { scan_chars: Some(3_000), max_keywords: 8, min_frequency: 2 }),
			Self::Aggressive =>
				Some(LevelLimits { scan_chars: None, max_keywords: 15, min_frequency: 1 }),
		}
	}
}

#[derive(Clone, Copy, Debug)]
struct LevelLimits {
	scan_chars: Option<usize>,
	max_keywords: usize,
	min_frequency: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KeywordWeights {
	pub base: f32,
	pub cap: f32,
}
impl Default for KeywordWeights {
	fn default() -> Self {
		Self { base: 1.5, cap: MAX_KEYWORD_WEIGHT }
	}
}
impl From<&hare_config::Keywords> for KeywordWeights {
	fn from(cfg: &hare_config::Keywords) -> Self {
		Self { base: cfg.base_weight, cap: cfg.max_weight.min(MAX_KEYWORD_WEIGHT) }
	}
}

#[derive(Clone, Debug, Default)]
pub struct LorebookEntry {
	/// Explicit trigger keys. Keys written as `/regex/` are matched elsewhere and skipped here.
	pub keys: Vec<String>,
	pub content: String,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct KeywordExtractor {
	weights: KeywordWeights,
}
impl KeywordExtractor {
	pub fn new(weights: KeywordWeights) -> Self {
		Self { weights }
	}

	/// `min(cap, base + (freq − min_freq) · 0.1)`.
	pub fn weight_for(&self, frequency: u32, min_frequency: u32) -> f32 {
		let excess = frequency.saturating_sub(min_frequency) as f32;

		(self.weights.base + excess * FREQUENCY_STEP).min(self.weights.cap)
	}

	/// Frequency keywords plus slash and underscore compounds such as `read/write`.
	pub fn extract_text(&self, text: &str, level: ExtractionLevel) -> Vec<Keyword> {
		let Some(limits) = level.limits() else { return Vec::new() };
		let scanned = scan_window(text, limits.scan_chars);
		let mut out = Vec::new();

		if let Some(compound) = COMPOUND_TERM.as_ref() {
			let mut counts = OrderedCounts::default();

			for found in compound.find_iter(scanned) {
				counts.add(found.as_str().to_lowercase());
			}

			for (term, frequency) in counts.ranked() {
				out.push(Keyword::new(term, self.weight_for(frequency, 1)));
			}
		}

		self.fill_frequency(scanned, limits, out)
	}

	/// Proper nouns first, then frequency keywords to fill the remaining budget.
	pub fn extract_chat_message(&self, text: &str, level: ExtractionLevel) -> Vec<Keyword> {
		let Some(limits) = level.limits() else { return Vec::new() };
		let scanned = scan_window(text, limits.scan_chars);
		let mut names = OrderedCounts::default();

		for name in proper_nouns(scanned) {
			names.add(name);
		}

		let out = names
			.ranked()
			.into_iter()
			.map(|(name, frequency)| Keyword::new(name, self.weight_for(frequency, 1)))
			.collect();

		self.fill_frequency(scanned, limits, out)
	}

	/// Explicit keys at the base weight, then keywords auto-extracted from the body.
	pub fn extract_lorebook(&self, entry: &LorebookEntry, level: ExtractionLevel) -> Vec<Keyword> {
		let Some(limits) = level.limits() else { return Vec::new() };
		let explicit = dedup_keywords(
			entry
				.keys
				.iter()
				.map(|key| key.trim())
				.filter(|key| !key.is_empty() && !is_regex_key(key))
				.map(|key| Keyword::new(key.to_lowercase(), self.weights.base))
				.collect(),
		);
		let budget = explicit.len() + limits.max_keywords;
		let mut out = dedup_keywords(
			explicit.into_iter().chain(self.extract_text(&entry.content, level)).collect(),
		);

		out.truncate(budget);

		out
	}

	/// Terms ranked by tf-idf where the scanned text's own sentences form the corpus, with a
	/// bonus for terms written capitalized mid-sentence. Weights still follow frequency.
	pub fn extract_tfidf(&self, text: &str, level: ExtractionLevel) -> Vec<Keyword> {
		let Some(limits) = level.limits() else { return Vec::new() };
		let scanned = scan_window(text, limits.scan_chars);
		let sentences: Vec<&str> = scanned.unicode_sentences().collect();
		let mut term_freqs = OrderedCounts::default();
		let mut doc_freqs: HashMap<String, u32> = HashMap::new();
		let mut capitalized: HashSet<String> = HashSet::new();

		for sentence in &sentences {
			let mut seen = HashSet::new();

			for (position, word) in words(sentence).enumerate() {
				let lowered = word.to_lowercase();

				if !is_candidate(&lowered) {
					continue;
				}
				if position > 0 && starts_uppercase(word) {
					capitalized.insert(lowered.clone());
				}
				if seen.insert(lowered.clone()) {
					*doc_freqs.entry(lowered.clone()).or_default() += 1;
				}

				term_freqs.add(lowered);
			}
		}

		let sentence_count = sentences.len().max(1) as f32;
		let mut scored: Vec<(String, u32, f32, usize)> = term_freqs
			.ranked()
			.into_iter()
			.enumerate()
			.filter(|(_, (_, frequency))| *frequency >= limits.min_frequency)
			.map(|(order, (term, frequency))| {
				let df = doc_freqs.get(&term).copied().unwrap_or(1).max(1) as f32;
				let bonus = if capitalized.contains(&term) { CAPITALIZATION_BONUS } else { 1.0 };
				let score = frequency as f32 * ((sentence_count / df).ln() + 1.0) * bonus;

				(term, frequency, score, order)
			})
			.collect();

		scored.sort_by(|a, b| crate::cmp_f32_desc(a.2, b.2).then_with(|| a.3.cmp(&b.3)));
		scored.truncate(limits.max_keywords);

		scored
			.into_iter()
			.map(|(term, frequency, _, _)| {
				Keyword::new(term, self.weight_for(frequency, limits.min_frequency))
			})
			.collect()
	}

	/// Weights for an externally ranked list, best first: linear from the cap down to the base.
	pub fn weights_by_rank(&self, ranked: Vec<String>) -> Vec<Keyword> {
		let last = ranked.len().saturating_sub(1);
		let span = self.weights.cap - self.weights.base;
		let keywords = ranked
			.into_iter()
			.enumerate()
			.map(|(rank, text)| {
				let weight = if last == 0 {
					self.weights.cap
				} else {
					self.weights.cap - span * rank as f32 / last as f32
				};

				Keyword::new(text, weight)
			})
			.collect();

		dedup_keywords(keywords)
	}

	fn fill_frequency(&self, scanned: &str, limits: LevelLimits, seed: Vec<Keyword>) -> Vec<Keyword> {
		let mut out = dedup_keywords(seed);

		out.truncate(limits.max_keywords);

		let mut taken: HashSet<String> = out.iter().map(|keyword| keyword.text.to_lowercase()).collect();
		let mut counts = OrderedCounts::default();

		for token in tokenize(scanned) {
			if is_candidate(&token) {
				counts.add(token);
			}
		}

		for (term, frequency) in counts.ranked() {
			if out.len() >= limits.max_keywords {
				break;
			}
			if frequency < limits.min_frequency || !taken.insert(term.clone()) {
				continue;
			}

			out.push(Keyword::new(term, self.weight_for(frequency, limits.min_frequency)));
		}

		out
	}
}

/// Counts that remember first-seen order for tie-breaking.
#[derive(Default)]
struct OrderedCounts {
	order: Vec<String>,
	counts: HashMap<String, u32>,
}
impl OrderedCounts {
	fn add(&mut self, term: String) {
		match self.counts.get_mut(&term) {
			Some(count) => *count += 1,
			None => {
				self.counts.insert(term.clone(), 1);
				self.order.push(term);
			},
		}
	}

	/// Most frequent first, ties in first-seen order.
	fn ranked(self) -> Vec<(String, u32)> {
		let Self { order, counts } = self;
		let mut ranked: Vec<(String, u32)> = order
			.into_iter()
			.map(|term| {
				let count = counts.get(&term).copied().unwrap_or(0);

				(term, count)
			})
			.collect();

		ranked.sort_by(|a, b| b.1.cmp(&a.1));

		ranked
	}
}

/// Capitalized words that do not open a sentence.
fn proper_nouns(text: &str) -> Vec<String> {
	let mut out = Vec::new();
	let mut previous_char: Option<char> = None;
	let mut word_start: Option<usize> = None;
	let mut first_word = true;

	let mut flush = |start: usize, end: usize, preceded_by: Option<char>, first: bool| {
		let word = text[start..end].trim_matches('\'');
		let word = word.split('\'').next().unwrap_or(word);
		let sentence_start = first || matches!(preceded_by, Some('.' | '!' | '?'));

		if !sentence_start
			&& starts_uppercase(word)
			&& word.chars().count() >= MIN_KEYWORD_CHARS
			&& !is_stop_word(&word.to_lowercase())
			&& word.chars().skip(1).any(char::is_lowercase)
		{
			out.push(word.to_string());
		}
	};
	let mut preceding: Option<char> = None;

	for (index, ch) in text.char_indices() {
		let in_word = ch.is_alphanumeric() || ch == '\'';

		match (in_word, word_start) {
			(true, None) => {
				word_start = Some(index);
				preceding = previous_char;
			},
			(false, Some(start)) => {
				flush(start, index, preceding, first_word);
				first_word = false;
				word_start = None;
			},
			_ => {},
		}

		if !ch.is_whitespace() {
			previous_char = Some(ch);
		}
	}

	if let Some(start) = word_start {
		flush(start, text.len(), preceding, first_word);
	}

	out
}

fn words(sentence: &str) -> impl Iterator<Item = &str> {
	sentence
		.split(|ch: char| !(ch.is_alphanumeric() || ch == '\''))
		.map(|word| word.trim_matches('\''))
		.filter(|word| !word.is_empty())
}

fn is_candidate(term: &str) -> bool {
	term.chars().count() >= MIN_KEYWORD_CHARS
		&& !is_stop_word(term)
		&& !term.chars().all(|ch| ch.is_numeric())
}

fn is_regex_key(key: &str) -> bool {
	key.len() > 2 && key.starts_with('/') && key[1..].contains('/')
}

fn starts_uppercase(word: &str) -> bool {
	word.chars().next().is_some_and(char::is_uppercase)
}

fn scan_window(text: &str, scan_chars: Option<usize>) -> &str {
	let Some(limit) = scan_chars else { return text };

	match text.char_indices().nth(limit) {
		Some((end, _)) => &text[..end],
		None => text,
	}
}
