use serde_json::{Map, Value, json};

use hare_domain::chunk::{ChunkPatch, Keyword, chunk_hash};
use hare_service::{ChunkInput, ChunkSource, VectorStore};
use hare_storage::models::CollectionState;

use super::{
	StubKeywords, VocabularyEmbedding, harness, harness_with, keyword_provider_config, test_config,
};

#[tokio::test]
async fn duplicates_and_blank_inputs_are_not_stored() {
	let harness = harness(test_config());
	let report = harness
		.service
		.insert_chunks("lore", vec![
			ChunkInput::new("Hello there"),
			ChunkInput::new("  Hello\tthere "),
			ChunkInput::new("   "),
		])
		.await
		.expect("Failed to insert chunks.");

	assert_eq!(report.inserted, 1);
	assert_eq!(report.duplicates, 1);
	assert_eq!(report.skipped, 1);
	assert_eq!(report.state, CollectionState::Created);
	assert_eq!(report.hashes, vec![chunk_hash("Hello there")]);
	assert_eq!(harness.store.len("lore"), 1);

	let again = harness
		.service
		.insert_chunks("lore", vec![ChunkInput::new("Hello there")])
		.await
		.expect("Failed to insert chunks.");

	assert_eq!(again.state, CollectionState::Existing);
	assert_eq!(harness.store.len("lore"), 1);
}

#[tokio::test]
async fn embedding_runs_in_configured_batches() {
	let mut cfg = test_config();

	cfg.providers.embedding.batch_size = 2;

	let harness = harness(cfg);
	let inputs = ["one cat", "two cat", "three cat", "four cat", "five cat"]
		.into_iter()
		.map(ChunkInput::new)
		.collect();
	let report =
		harness.service.insert_chunks("lore", inputs).await.expect("Failed to insert chunks.");

	assert_eq!(report.inserted, 5);
	assert_eq!(harness.embedding.calls(), 3);
	assert_eq!(harness.store.len("lore"), 5);
}

#[tokio::test]
async fn dimension_mismatch_fails_unless_recreate_is_allowed() {
	let harness = harness(test_config());

	harness.store.ensure_collection("lore", 4, false).await.expect("Failed to seed collection.");

	let err = harness
		.service
		.insert_chunks("lore", vec![ChunkInput::new("the cat sat")])
		.await
		.expect_err("Expected a dimension mismatch.");

	assert_eq!(err.cause_tag(), "dimension_mismatch");

	let mut cfg = test_config();

	cfg.storage.qdrant.allow_recreate_on_dimension_mismatch = true;

	let recreating = super::harness(cfg);

	recreating.store.ensure_collection("lore", 4, false).await.expect("Failed to seed collection.");

	let report = recreating
		.service
		.insert_chunks("lore", vec![ChunkInput::new("the cat sat")])
		.await
		.expect("Failed to insert chunks.");

	assert_eq!(report.state, CollectionState::Recreated);
}

#[tokio::test]
async fn invalid_chunk_conditions_stop_ingestion_before_any_write() {
	let harness = harness(test_config());
	let mut input = ChunkInput::new("the cat sat");

	input.conditions = Some(
		serde_json::from_value(json!({ "rules": [{ "type": "messageCount", "value": "many" }] }))
			.expect("Failed to parse condition set."),
	);

	let err = harness
		.service
		.insert_chunks("lore", vec![input])
		.await
		.expect_err("Expected invalid conditions to be rejected.");

	assert_eq!(err.cause_tag(), "invalid_request");
	assert!(!harness.store.has_collection("lore"));
	assert_eq!(harness.embedding.calls(), 0);
}

#[tokio::test]
async fn patches_update_stored_chunks_without_reembedding() {
	let harness = harness(test_config());
	let hash = chunk_hash("the vault door");

	harness
		.service
		.insert_chunks("lore", vec![ChunkInput::new("the vault door")])
		.await
		.expect("Failed to insert chunks.");

	let mut metadata = Map::new();

	metadata.insert("scene".to_string(), Value::from("cellar"));

	let patched = harness
		.service
		.patch_chunk("lore", hash, ChunkPatch {
			keywords: Some(vec![Keyword::new("vault", 2.5)]),
			metadata: Some(metadata),
			..ChunkPatch::default()
		})
		.await
		.expect("Failed to patch chunk.");

	assert_eq!(patched.hash(), hash);
	assert_eq!(harness.embedding.calls(), 1);

	let stored = harness.store.chunk("lore", hash).expect("Expected stored chunk.");

	assert_eq!(stored.keywords, vec![Keyword::new("vault", 2.5)]);
	assert_eq!(stored.metadata.get("scene"), Some(&Value::from("cellar")));
	assert_eq!(stored.metadata.get("source_type"), Some(&Value::from("text")));

	let missing = harness
		.service
		.patch_chunk("lore", 7, ChunkPatch { links: Some(Vec::new()), ..ChunkPatch::default() })
		.await
		.expect_err("Expected a missing chunk.");
	let empty = harness
		.service
		.patch_chunk("lore", hash, ChunkPatch::default())
		.await
		.expect_err("Expected an empty patch to be rejected.");

	assert_eq!(missing.cause_tag(), "not_found");
	assert_eq!(empty.cause_tag(), "invalid_request");
}

#[tokio::test]
async fn delete_and_purge_remove_chunks() {
	let harness = harness(test_config());
	let report = harness
		.service
		.insert_chunks("lore", vec![ChunkInput::new("the cat sat"), ChunkInput::new("a dog barked")])
		.await
		.expect("Failed to insert chunks.");

	harness
		.service
		.delete_chunks("lore", &report.hashes[..1])
		.await
		.expect("Failed to delete chunks.");

	assert_eq!(harness.store.len("lore"), 1);

	harness.service.purge_collection("lore").await.expect("Failed to purge collection.");

	assert!(!harness.store.has_collection("lore"));
}

#[tokio::test]
async fn lorebook_keys_lead_auto_extracted_keywords() {
	let harness = harness(test_config());
	let mut entry = ChunkInput::new(
		"The vault lies below the keep. The vault door is sealed, and the vault key is lost.",
	);

	entry.source = ChunkSource::Lorebook;
	entry.lorebook_keys = vec!["Silver Order".to_string(), "/sil+ver/".to_string()];

	harness.service.insert_chunks("lore", vec![entry.clone()]).await.expect("Failed to insert.");

	let stored = harness.store.chunk("lore", chunk_hash(&entry.text)).expect("Expected chunk.");
	let texts: Vec<&str> = stored.keywords.iter().map(|keyword| keyword.text.as_str()).collect();

	assert_eq!(stored.keywords[0], Keyword::new("silver order", 1.5));
	assert!(texts.contains(&"vault"));
	assert!(!texts.iter().any(|text| text.contains("sil+ver")));
	assert_eq!(stored.metadata.get("source_type"), Some(&Value::from("lorebook")));
}

#[tokio::test]
async fn remote_keywords_are_weighted_by_rank() {
	let mut cfg = test_config();

	cfg.keywords.source = "yake".to_string();
	cfg.providers.keywords = Some(keyword_provider_config());

	let harness = harness_with(cfg, VocabularyEmbedding::default(), StubKeywords {
		keywords: vec![("Vault", 0.02), ("silver order", 0.05)],
	});

	harness
		.service
		.insert_chunks("lore", vec![ChunkInput::new("The Silver Order guards the vault.")])
		.await
		.expect("Failed to insert chunks.");

	let stored = harness
		.store
		.chunk("lore", chunk_hash("The Silver Order guards the vault."))
		.expect("Expected stored chunk.");

	assert_eq!(stored.keywords, vec![Keyword::new("vault", 3.0), Keyword::new("silver order", 1.5)]);
}
