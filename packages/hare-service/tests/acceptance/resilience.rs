use std::time::Duration;

use tokio::time::Instant;

use hare_service::{ChunkInput, RetrieveRequest};

use super::{StubKeywords, VocabularyEmbedding, harness_with, test_config};

fn insert_one() -> Vec<ChunkInput> {
	vec![ChunkInput::new("the cat sat")]
}

#[tokio::test]
async fn transient_provider_failures_are_retried() {
	let embedding = VocabularyEmbedding { fail_first: 2, fail_status: 503, ..Default::default() };
	let harness = harness_with(test_config(), embedding, StubKeywords::default());
	let report =
		harness.service.insert_chunks("lore", insert_one()).await.expect("Failed to insert chunks.");

	assert_eq!(report.inserted, 1);
	assert_eq!(harness.embedding.calls(), 3);
}

#[tokio::test]
async fn permanent_provider_failures_surface_immediately() {
	let embedding = VocabularyEmbedding { fail_first: 5, fail_status: 401, ..Default::default() };
	let harness = harness_with(test_config(), embedding, StubKeywords::default());
	let err = harness
		.service
		.insert_chunks("lore", insert_one())
		.await
		.expect_err("Expected a provider failure.");

	assert_eq!(err.cause_tag(), "provider_failed");
	assert_eq!(harness.embedding.calls(), 1);
}

#[tokio::test]
async fn retries_stop_after_the_configured_attempts() {
	let embedding = VocabularyEmbedding { fail_first: 10, fail_status: 429, ..Default::default() };
	let harness = harness_with(test_config(), embedding, StubKeywords::default());
	let err = harness
		.service
		.insert_chunks("lore", insert_one())
		.await
		.expect_err("Expected a provider failure.");

	assert_eq!(err.cause_tag(), "provider_failed");
	assert_eq!(harness.embedding.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn slow_providers_time_out() {
	let embedding =
		VocabularyEmbedding { delay: Some(Duration::from_secs(60)), ..Default::default() };
	let harness = harness_with(test_config(), embedding, StubKeywords::default());
	let err = harness
		.service
		.insert_chunks("lore", insert_one())
		.await
		.expect_err("Expected a timeout.");

	assert_eq!(err.cause_tag(), "timeout");
	assert_eq!(harness.embedding.calls(), 3);
}

#[tokio::test]
async fn malformed_embeddings_are_data_errors() {
	let embedding = VocabularyEmbedding { dim: Some(4), ..Default::default() };
	let harness = harness_with(test_config(), embedding, StubKeywords::default());
	let err = harness
		.service
		.insert_chunks("lore", insert_one())
		.await
		.expect_err("Expected a data error.");

	assert_eq!(err.cause_tag(), "invalid_data");
	assert_eq!(harness.store.len("lore"), 0);
}

#[tokio::test(start_paused = true)]
async fn rate_limit_spaces_out_provider_calls() {
	let mut cfg = test_config();

	cfg.rate_limit.enabled = true;
	cfg.rate_limit.max_calls = 1;
	cfg.rate_limit.window_ms = 1_000;

	let harness = harness_with(cfg, VocabularyEmbedding::default(), StubKeywords::default());
	let started = Instant::now();

	harness.service.insert_chunks("lore", insert_one()).await.expect("Failed to insert chunks.");

	let request = RetrieveRequest {
		query: "cat".to_string(),
		collections: vec!["lore".to_string()],
		..RetrieveRequest::default()
	};

	harness.service.retrieve(request.clone()).await.expect("Retrieval failed.");
	harness.service.retrieve(request).await.expect("Retrieval failed.");

	assert!(started.elapsed() >= Duration::from_millis(2_000));
	assert_eq!(harness.embedding.calls(), 3);
}
