use serde_json::json;

use hare_domain::{
	chunk::{Keyword, chunk_hash},
	conditions::{ConditionSet, SearchContext},
	keywords::overfetch_amount,
};
use hare_service::{ChunkInput, RetrieveRequest, Stage};

use super::{harness, test_config};

fn request(query: &str) -> RetrieveRequest {
	RetrieveRequest {
		query: query.to_string(),
		collections: vec!["lore".to_string()],
		..RetrieveRequest::default()
	}
}

fn conditions(value: serde_json::Value) -> ConditionSet {
	serde_json::from_value(value).expect("Failed to parse condition set.")
}

fn position(texts: &[&str], text: &str) -> usize {
	texts.iter().position(|candidate| *candidate == text).expect("Expected text in results.")
}

#[tokio::test]
async fn cat_chunks_outrank_the_dog_chunk() {
	for hybrid in ["off", "rrf", "weighted"] {
		let mut cfg = test_config();

		cfg.retrieval.hybrid = hybrid.to_string();

		let harness = harness(cfg);
		let inputs = ["the cat sat", "the cat ran fast", "a dog barked"]
			.into_iter()
			.map(ChunkInput::new)
			.collect();

		harness.service.insert_chunks("lore", inputs).await.expect("Failed to insert chunks.");

		let response = harness.service.retrieve(request("cat")).await.expect("Retrieval failed.");
		let texts: Vec<&str> = response.items.iter().map(|item| item.chunk.text()).collect();

		assert_eq!(texts.len(), 3, "hybrid mode {hybrid}");
		assert!(position(&texts, "the cat sat") < position(&texts, "a dog barked"));
		assert!(position(&texts, "the cat ran fast") < position(&texts, "a dog barked"));
	}
}

#[tokio::test]
async fn every_stage_is_traced_in_order() {
	let harness = harness(test_config());

	harness
		.service
		.insert_chunks("lore", vec![ChunkInput::new("the tavern door")])
		.await
		.expect("Failed to insert chunks.");

	let response = harness.service.retrieve(request("tavern")).await.expect("Retrieval failed.");
	let stages: Vec<Stage> = response.trace.iter().map(|entry| entry.stage).collect();

	assert_eq!(stages, vec![
		Stage::QueryIssued,
		Stage::VectorSearchDone,
		Stage::KeywordBoosted,
		Stage::ConditionsFiltered,
		Stage::LinksResolved,
		Stage::Trimmed,
	]);
}

#[tokio::test]
async fn empty_collections_return_early() {
	let harness = harness(test_config());
	let response = harness.service.retrieve(request("tavern")).await.expect("Retrieval failed.");

	assert!(response.items.is_empty());
	assert_eq!(response.trace.last().map(|entry| entry.stage), Some(Stage::VectorSearchDone));
}

#[tokio::test]
async fn keywords_found_in_the_query_boost_scores() {
	let harness = harness(test_config());
	let mut dragon = ChunkInput::new("a dragon sleeps in the vault");

	dragon.keywords = Some(vec![Keyword::new("dragon", 2.0)]);

	harness
		.service
		.insert_chunks("lore", vec![dragon, ChunkInput::new("the vault door")])
		.await
		.expect("Failed to insert chunks.");

	let response =
		harness.service.retrieve(request("dragon vault")).await.expect("Retrieval failed.");
	let top = &response.items[0];

	assert_eq!(top.chunk.text(), "a dragon sleeps in the vault");
	assert_eq!(top.matched_keywords, vec!["dragon".to_string()]);
	assert!((top.keyword_boost - 2.0).abs() < 1e-6);
	assert!((top.score() - top.original_score * 2.0).abs() < 1e-5);
	assert_eq!(response.items[1].keyword_boost, 1.0);
}

#[tokio::test]
async fn chunk_conditions_gate_candidates() {
	let harness = harness(test_config());
	let mut gated = ChunkInput::new("the tavern ale");

	gated.conditions = Some(conditions(json!({
		"logic": "AND",
		"rules": [{ "type": "speaker", "value": "Mira" }]
	})));

	harness
		.service
		.insert_chunks("lore", vec![gated, ChunkInput::new("the tavern door")])
		.await
		.expect("Failed to insert chunks.");

	let mut req = request("tavern");

	req.context = SearchContext { last_speaker: Some("Bram".to_string()), ..SearchContext::default() };

	let response = harness.service.retrieve(req.clone()).await.expect("Retrieval failed.");
	let texts: Vec<&str> = response.items.iter().map(|item| item.chunk.text()).collect();

	assert_eq!(texts, vec!["the tavern door"]);

	req.context.last_speaker = Some("mira".to_string());

	let response = harness.service.retrieve(req).await.expect("Retrieval failed.");

	assert_eq!(response.items.len(), 2);
}

#[tokio::test]
async fn frequency_caps_persist_across_queries_until_reset() {
	let harness = harness(test_config());
	let mut capped = ChunkInput::new("the dragon key");

	capped.conditions = Some(conditions(json!({
		"rules": [{ "type": "frequency", "settings": { "maxActivations": 1 } }]
	})));

	harness.service.insert_chunks("lore", vec![capped]).await.expect("Failed to insert chunks.");

	let first = harness.service.retrieve(request("dragon")).await.expect("Retrieval failed.");
	let second = harness.service.retrieve(request("dragon")).await.expect("Retrieval failed.");

	assert_eq!(first.items.len(), 1);
	assert!(second.items.is_empty());
	assert_eq!(harness.service.history.len(), 1);

	harness.service.reset_state();

	let third = harness.service.retrieve(request("dragon")).await.expect("Retrieval failed.");

	assert_eq!(third.items.len(), 1);
}

#[tokio::test]
async fn frequency_activations_count_only_when_the_rule_passes() {
	let harness = harness(test_config());
	let mut capped = ChunkInput::new("the dragon key");

	capped.conditions = Some(conditions(json!({
		"logic": "OR",
		"rules": [
			{ "type": "frequency", "settings": { "maxActivations": 1 } },
			{ "type": "speaker", "value": "Mira" }
		]
	})));

	harness.service.insert_chunks("lore", vec![capped]).await.expect("Failed to insert chunks.");

	let mut req = request("dragon");

	req.context = SearchContext { last_speaker: Some("Mira".to_string()), ..SearchContext::default() };

	let first = harness.service.retrieve(req.clone()).await.expect("Retrieval failed.");
	let second = harness.service.retrieve(req.clone()).await.expect("Retrieval failed.");
	let third = harness.service.retrieve(req).await.expect("Retrieval failed.");
	let record = harness
		.service
		.history
		.get(chunk_hash("the dragon key"))
		.expect("Expected an activation record.");

	assert_eq!(first.items.len(), 1);
	assert_eq!(second.items.len(), 1);
	assert_eq!(third.items.len(), 1);
	// Later activations came through the speaker rule while the cap was already spent.
	assert_eq!(record.count, 1);
}

#[tokio::test]
async fn score_thresholds_hold_under_rank_fusion() {
	let mut cfg = test_config();

	cfg.retrieval.hybrid = "rrf".to_string();

	let harness = harness(cfg);
	let mut gated = ChunkInput::new("the cat sat");

	gated.conditions = Some(conditions(json!({
		"rules": [{ "type": "scoreThreshold", "settings": { "threshold": 0.3 } }]
	})));

	harness.service.insert_chunks("lore", vec![gated]).await.expect("Failed to insert chunks.");

	let response = harness.service.retrieve(request("cat sat")).await.expect("Retrieval failed.");

	assert_eq!(response.items.len(), 1);

	let score = response.items[0].score();

	assert!((0.3..=1.0 + 1e-6).contains(&score), "fused score {score}");
}

#[tokio::test]
async fn single_result_queries_overfetch_past_a_gated_best_hit() {
	let harness = harness(test_config());
	let mut gated = ChunkInput::new("the cat sat");

	gated.conditions = Some(conditions(json!({
		"rules": [{ "type": "speaker", "value": "Mira" }]
	})));

	harness
		.service
		.insert_chunks("lore", vec![gated, ChunkInput::new("the cat ran fast")])
		.await
		.expect("Failed to insert chunks.");

	let mut req = request("cat sat");

	req.top_k = Some(1);
	req.context = SearchContext { last_speaker: Some("Bram".to_string()), ..SearchContext::default() };

	let response = harness.service.retrieve(req).await.expect("Retrieval failed.");
	let texts: Vec<&str> = response.items.iter().map(|item| item.chunk.text()).collect();

	assert_eq!(texts, vec!["the cat ran fast"]);
	assert_eq!(harness.store.last_limit(), Some(overfetch_amount(1)));
}

#[tokio::test]
async fn single_result_queries_see_hits_boosted_from_below() {
	let harness = harness(test_config());
	let mut plain = ChunkInput::new("the cat sat");
	let mut boosted = ChunkInput::new("the cat ran fast");

	plain.keywords = Some(Vec::new());
	boosted.keywords = Some(vec![Keyword::new("cat", 3.0)]);

	harness
		.service
		.insert_chunks("lore", vec![plain, boosted])
		.await
		.expect("Failed to insert chunks.");

	let mut req = request("cat");

	req.top_k = Some(1);

	let response = harness.service.retrieve(req).await.expect("Retrieval failed.");
	let top = &response.items[0];

	assert_eq!(response.items.len(), 1);
	assert_eq!(top.chunk.text(), "the cat ran fast");
	assert!((top.keyword_boost - 3.0).abs() < 1e-6);
	// Ranked second by similarity alone.
	assert!(top.original_score < 0.55);
	assert_eq!(harness.store.last_limit(), Some(overfetch_amount(1)));
}

#[tokio::test]
async fn inactive_collections_are_skipped_before_embedding() {
	let mut cfg = test_config();

	cfg.conditions
		.collections
		.insert("lore".to_string(), json!({ "rules": [{ "type": "isGroupChat", "value": true }] }));

	let harness = harness(cfg);
	let response = harness.service.retrieve(request("tavern")).await.expect("Retrieval failed.");

	assert!(response.items.is_empty());
	assert_eq!(response.skipped_collections, vec!["lore".to_string()]);
	assert_eq!(harness.embedding.calls(), 0);
}

#[tokio::test]
async fn top_k_limits_results() {
	let harness = harness(test_config());
	let inputs = ["the cat sat", "the cat ran fast", "the dog sat", "the cat door"]
		.into_iter()
		.map(ChunkInput::new)
		.collect();

	harness.service.insert_chunks("lore", inputs).await.expect("Failed to insert chunks.");

	let mut req = request("cat");

	req.top_k = Some(2);

	let response = harness.service.retrieve(req).await.expect("Retrieval failed.");

	assert_eq!(response.items.len(), 2);
}

#[tokio::test]
async fn malformed_requests_are_rejected() {
	let harness = harness(test_config());
	let blank = harness.service.retrieve(request("   ")).await.expect_err("Expected an error.");
	let no_collections = harness
		.service
		.retrieve(RetrieveRequest { query: "cat".to_string(), ..RetrieveRequest::default() })
		.await
		.expect_err("Expected an error.");

	assert_eq!(blank.cause_tag(), "invalid_request");
	assert_eq!(no_collections.cause_tag(), "invalid_request");
}
