//! Subcommands that run without a vector store or providers.

use std::{fs, sync::Arc};

use color_eyre::eyre;
use serde::Serialize;
use tracing::debug;

use hare_domain::{
	chunk::Keyword,
	conditions::{ValidationReport, validate_condition_set_value},
	keywords::{ExtractionLevel, KeywordExtractor, KeywordWeights, LorebookEntry},
	lexical::{Analyzer, Bm25Params, DEFAULT_STEM_CACHE_CAPACITY, LexicalDocument, LexicalScorer},
};

use crate::{ExtractMode, KeywordsArgs, SearchArgs, ValidateArgs};

#[derive(Debug, Serialize)]
pub struct SearchHit {
	pub rank: usize,
	pub source: String,
	pub score: f32,
}

pub fn search(args: &SearchArgs) -> color_eyre::Result<Vec<SearchHit>> {
	let (params, stem_cache_capacity) = match args.config.as_deref() {
		Some(path) => {
			let cfg = hare_config::load(path)?;

			(Bm25Params::from(&cfg.lexical), cfg.lexical.stem_cache_capacity)
		},
		None => (Bm25Params::default(), DEFAULT_STEM_CACHE_CAPACITY),
	};
	let mut sources = Vec::new();
	let mut documents = Vec::new();

	for path in &args.file {
		let mut document = LexicalDocument::new(fs::read_to_string(path)?);

		document.title = path.file_stem().map(|stem| stem.to_string_lossy().replace(['_', '-'], " "));

		sources.push(path.display().to_string());
		documents.push(document);
	}
	for (index, text) in args.text.iter().enumerate() {
		sources.push(format!("text[{index}]"));
		documents.push(LexicalDocument::new(text.as_str()));
	}

	if documents.is_empty() {
		eyre::bail!("Nothing to search; pass --file or --text.");
	}

	let mut scorer = LexicalScorer::new(Arc::new(Analyzer::new(stem_cache_capacity)), params);

	scorer.index(&documents);

	let hits: Vec<SearchHit> = scorer
		.search(&args.query, args.top_k)
		.into_iter()
		.enumerate()
		.map(|(rank, (index, score))| SearchHit { rank: rank + 1, source: sources[index].clone(), score })
		.collect();

	debug!(documents = documents.len(), hits = hits.len(), "Lexical search finished.");

	Ok(hits)
}

pub fn keywords(args: &KeywordsArgs) -> color_eyre::Result<Vec<Keyword>> {
	let Some(level) = ExtractionLevel::parse(&args.level) else {
		eyre::bail!("Unknown extraction level {:?}.", args.level);
	};
	let text = match (&args.text, &args.file) {
		(Some(text), _) => text.clone(),
		(None, Some(path)) => fs::read_to_string(path)?,
		(None, None) => eyre::bail!("Pass a text or --file."),
	};
	let extractor = KeywordExtractor::new(KeywordWeights::default());
	let keywords = match args.mode {
		ExtractMode::Text => extractor.extract_text(&text, level),
		ExtractMode::Chat => extractor.extract_chat_message(&text, level),
		ExtractMode::Tfidf => extractor.extract_tfidf(&text, level),
		ExtractMode::Lorebook => {
			let entry = LorebookEntry { keys: args.keys.clone(), content: text };

			extractor.extract_lorebook(&entry, level)
		},
	};

	Ok(keywords)
}

pub fn validate(args: &ValidateArgs) -> color_eyre::Result<ValidationReport> {
	let Some(path) = args.file.as_deref() else {
		eyre::bail!("Pass a condition set file.");
	};
	let value: serde_json::Value = crate::read_json(path)?;

	Ok(validate_condition_set_value(&value, args.scope.into()))
}
