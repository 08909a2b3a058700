use std::{
	collections::{HashMap, HashSet},
	sync::Arc,
};

use crate::{cmp_f32_desc, lexical::analyzer::Analyzer};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bm25Params {
	pub k1: f32,
	pub b: f32,
	/// Floor added to every term's IDF.
	pub delta: f32,
	pub coverage_weight: f32,
	pub title_boost: u32,
	pub tag_boost: u32,
}
impl Default for Bm25Params {
	fn default() -> Self {
		Self { k1: 1.5, b: 0.75, delta: 0.5, coverage_weight: 0.1, title_boost: 4, tag_boost: 3 }
	}
}
impl From<&hare_config::Lexical> for Bm25Params {
	fn from(cfg: &hare_config::Lexical) -> Self {
		Self {
			k1: cfg.k1,
			b: cfg.b,
			delta: cfg.delta,
			coverage_weight: cfg.coverage_weight,
			title_boost: cfg.title_boost,
			tag_boost: cfg.tag_boost,
		}
	}
}

#[derive(Clone, Debug, Default)]
pub struct LexicalDocument {
	pub text: String,
	pub title: Option<String>,
	pub tags: Vec<String>,
}
impl LexicalDocument {
	pub fn new(text: impl Into<String>) -> Self {
		Self { text: text.into(), title: None, tags: Vec::new() }
	}
}

#[derive(Debug)]
struct IndexedDocument {
	term_freqs: HashMap<String, u32>,
	/// Content tokens only; boosted title and tag tokens do not count.
	length: usize,
}

/// BM25+ over an in-memory corpus.
pub struct LexicalScorer {
	analyzer: Arc<Analyzer>,
	params: Bm25Params,
	documents: Vec<IndexedDocument>,
	doc_freqs: HashMap<String, u32>,
	avg_len: f32,
}
impl LexicalScorer {
	pub fn new(analyzer: Arc<Analyzer>, params: Bm25Params) -> Self {
		Self { analyzer, params, documents: Vec::new(), doc_freqs: HashMap::new(), avg_len: 0.0 }
	}

	/// Replaces the corpus and rebuilds its statistics.
	pub fn index(&mut self, documents: &[LexicalDocument]) {
		self.documents.clear();
		self.doc_freqs.clear();

		let mut total_len = 0_usize;

		for document in documents {
			let content = self.analyzer.analyze(&document.text);
			let mut term_freqs: HashMap<String, u32> = HashMap::new();

			for term in &content {
				*term_freqs.entry(term.clone()).or_default() += 1;
			}
			if let Some(title) = document.title.as_deref() {
				for term in self.analyzer.analyze(title) {
					*term_freqs.entry(term).or_default() += self.params.title_boost;
				}
			}

			for tag in &document.tags {
				for term in self.analyzer.analyze(tag) {
					*term_freqs.entry(term).or_default() += self.params.tag_boost;
				}
			}
			for term in term_freqs.keys() {
				*self.doc_freqs.entry(term.clone()).or_default() += 1;
			}

			total_len += content.len();

			self.documents.push(IndexedDocument { term_freqs, length: content.len() });
		}

		self.avg_len =
			if self.documents.is_empty() { 0.0 } else { total_len as f32 / self.documents.len() as f32 };
	}

	pub fn len(&self) -> usize {
		self.documents.len()
	}

	pub fn is_empty(&self) -> bool {
		self.documents.is_empty()
	}

	/// Score of one document. Out-of-range indices and empty queries score zero.
	pub fn score(&self, query: &str, doc_index: usize) -> f32 {
		let terms = self.query_terms(query);

		match self.documents.get(doc_index) {
			Some(document) => self.score_terms(&terms, document),
			None => 0.0,
		}
	}

	/// Documents with a positive score, best first, at most `top_k`.
	pub fn search(&self, query: &str, top_k: usize) -> Vec<(usize, f32)> {
		let terms = self.query_terms(query);

		if terms.is_empty() || top_k == 0 {
			return Vec::new();
		}

		let mut scored: Vec<(usize, f32)> = self
			.documents
			.iter()
			.enumerate()
			.map(|(index, document)| (index, self.score_terms(&terms, document)))
			.filter(|(_, score)| *score > 0.0)
			.collect();

		scored.sort_by(|a, b| cmp_f32_desc(a.1, b.1).then_with(|| a.0.cmp(&b.0)));
		scored.truncate(top_k);

		scored
	}

	pub fn idf(&self, term: &str) -> f32 {
		let n = self.documents.len() as f32;
		let df = self.doc_freqs.get(term).copied().unwrap_or(0) as f32;
		let raw = ((n - df + 0.5) / (df + 0.5)).ln();

		raw.max(0.0) + self.params.delta
	}

	fn query_terms(&self, query: &str) -> Vec<String> {
		let mut seen = HashSet::new();

		self.analyzer.analyze(query).into_iter().filter(|term| seen.insert(term.clone())).collect()
	}

	fn score_terms(&self, terms: &[String], document: &IndexedDocument) -> f32 {
		if terms.is_empty() {
			return 0.0;
		}

		let Bm25Params { k1, b, coverage_weight, .. } = self.params;
		let length_ratio =
			if self.avg_len > 0.0 { document.length as f32 / self.avg_len } else { 1.0 };
		let length_norm = 1.0 - b + b * length_ratio;
		let mut total = 0.0;
		let mut matched = 0_usize;

		for term in terms {
			let Some(&tf) = document.term_freqs.get(term) else { continue };

			if tf == 0 {
				continue;
			}

			let damped = (1.0 + tf as f32).ln();

			total += self.idf(term) * damped * (k1 + 1.0) / (damped + k1 * length_norm);
			matched += 1;
		}

		if matched == 0 {
			return 0.0;
		}

		total * (1.0 + coverage_weight * matched as f32 / terms.len() as f32)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn scorer(texts: &[&str]) -> LexicalScorer {
		let mut scorer = LexicalScorer::new(Arc::new(Analyzer::default()), Bm25Params::default());
		let documents: Vec<LexicalDocument> =
			texts.iter().map(|text| LexicalDocument::new(*text)).collect();

		scorer.index(&documents);

		scorer
	}

	#[test]
	fn cat_corpus_orders_by_length_normalized_match() {
		let scorer = scorer(&["the cat sat", "the cat ran fast", "a dog barked"]);
		let results = scorer.search("cat", 10);
		let order: Vec<usize> = results.iter().map(|(index, _)| *index).collect();

		assert_eq!(order, vec![0, 1]);
		assert!(scorer.score("cat", 0) >= scorer.score("cat", 1));
		assert!(scorer.score("cat", 1) > scorer.score("cat", 2));
		assert_eq!(scorer.score("cat", 2), 0.0);
	}

	#[test]
	fn common_terms_keep_positive_idf() {
		let scorer = scorer(&["cat", "cat", "cat dog"]);

		assert_eq!(scorer.idf("cat"), 0.5);
		assert!(scorer.idf("dog") > 0.5);
		assert!(scorer.score("cat", 0) > 0.0);
	}

	#[test]
	fn covering_every_term_beats_repeating_one() {
		let scorer = scorer(&["cat dog", "cat cat cat", "bird fish", "tree rock"]);

		assert!(scorer.score("cat dog", 0) > scorer.score("cat dog", 1));
	}

	#[test]
	fn duplicate_query_terms_count_once() {
		let scorer = scorer(&["cat dog", "bird"]);

		assert_eq!(scorer.score("cat cat cat", 0), scorer.score("cat", 0));
	}

	#[test]
	fn field_boost_raises_tf_without_length_penalty() {
		let mut boosted = LexicalScorer::new(Arc::new(Analyzer::default()), Bm25Params::default());

		boosted.index(&[
			LexicalDocument {
				text: "an old keep on the hill".to_string(),
				title: Some("Castle".to_string()),
				tags: vec!["fortress".to_string()],
			},
			LexicalDocument::new("the castle on the hill"),
			LexicalDocument::new("a quiet village"),
		]);

		assert!(boosted.score("castle", 0) > boosted.score("castle", 1));
		assert!(boosted.score("fortress", 0) > 0.0);
	}

	#[test]
	fn empty_inputs_do_not_fail() {
		let empty = scorer(&[]);

		assert!(empty.search("cat", 5).is_empty());
		assert_eq!(empty.score("cat", 0), 0.0);

		let scorer = scorer(&["cat"]);

		assert!(scorer.search("", 5).is_empty());
		assert!(scorer.search("the of", 5).is_empty());
		assert_eq!(scorer.score("cat", 42), 0.0);
	}

	#[test]
	fn search_truncates_to_top_k() {
		let scorer = scorer(&["cat one", "cat two", "cat three"]);

		assert_eq!(scorer.search("cat", 2).len(), 2);
	}
}
