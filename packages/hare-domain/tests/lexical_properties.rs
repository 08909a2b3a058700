use std::sync::Arc;

use proptest::prelude::*;

use hare_domain::lexical::{Analyzer, Bm25Params, LexicalDocument, LexicalScorer};

fn document(term_count: usize, filler_count: usize) -> String {
	let mut words = vec!["dragon"; term_count];

	words.extend(std::iter::repeat_n("ember", filler_count));

	words.join(" ")
}

fn score_for(term_count: usize, length: usize, others: &[String], params: Bm25Params) -> f32 {
	let mut documents = vec![LexicalDocument::new(document(term_count, length - term_count))];

	documents.extend(others.iter().map(|text| LexicalDocument::new(text.clone())));

	let mut scorer = LexicalScorer::new(Arc::new(Analyzer::default()), params);

	scorer.index(&documents);

	scorer.score("dragon", 0)
}

fn corpus() -> impl Strategy<Value = Vec<String>> {
	prop::collection::vec(
		prop::collection::vec(prop::sample::select(vec!["dragon", "castle", "knight", "river"]), 1..8)
			.prop_map(|words| words.join(" ")),
		0..6,
	)
}

proptest! {
	#[test]
	fn raising_term_frequency_never_lowers_score(
		others in corpus(),
		length in 2_usize..20,
		term_count in 1_usize..19,
		k1 in 0.1_f32..3.0,
		b in 0.0_f32..1.0,
	) {
		prop_assume!(term_count < length);

		let params = Bm25Params { k1, b, ..Bm25Params::default() };
		let before = score_for(term_count, length, &others, params);
		let after = score_for(term_count + 1, length, &others, params);

		prop_assert!(after >= before, "tf {term_count} -> {}: {before} > {after}", term_count + 1);
	}

	#[test]
	fn scores_are_never_negative(others in corpus(), query in "[a-z ]{0,30}") {
		let mut documents: Vec<LexicalDocument> =
			others.iter().map(|text| LexicalDocument::new(text.clone())).collect();

		documents.push(LexicalDocument::new("dragon dragon castle"));

		let mut scorer = LexicalScorer::new(Arc::new(Analyzer::default()), Bm25Params::default());

		scorer.index(&documents);

		for index in 0..documents.len() {
			prop_assert!(scorer.score(&query, index) >= 0.0);
		}
	}
}
