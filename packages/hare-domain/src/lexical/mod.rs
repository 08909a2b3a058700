//! BM25+ lexical scoring with an English analyzer.

pub mod analyzer;
pub mod bm25;

pub use analyzer::{Analyzer, DEFAULT_STEM_CACHE_CAPACITY, tokenize};
pub use bm25::{Bm25Params, LexicalDocument, LexicalScorer};
