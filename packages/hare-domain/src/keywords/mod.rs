pub mod boost;
pub mod extract;

pub use boost::{apply_keyword_boost, keyword_in_query, overfetch_amount};
pub use extract::{ExtractionLevel, KeywordExtractor, KeywordWeights, LorebookEntry};
