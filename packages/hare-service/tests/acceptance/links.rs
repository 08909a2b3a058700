use serde_json::Value;

use hare_domain::chunk::{ChunkLink, LinkKind, chunk_hash};
use hare_service::{ChunkInput, RetrieveRequest};
use hare_storage::models::{FilterValue, PayloadFilter};

use super::{harness, metadata, test_config};

const UNKNOWN_HASH: u64 = 999;

fn scene(text: &str, scene: &str, links: Vec<ChunkLink>) -> ChunkInput {
	let mut input = ChunkInput::new(text);

	input.metadata = metadata(&[("scene", Value::from(scene))]);
	input.links = links;

	input
}

fn inn_request(top_k: u32) -> RetrieveRequest {
	RetrieveRequest {
		query: "cat".to_string(),
		collections: vec!["lore".to_string()],
		top_k: Some(top_k),
		filter: Some(PayloadFilter::default().matching("scene", FilterValue::Text("inn".to_string()))),
		..RetrieveRequest::default()
	}
}

#[tokio::test]
async fn hard_link_targets_are_fetched_and_kept() {
	let harness = harness(test_config());
	let dog = chunk_hash("a dog barked");
	let cat = scene("the cat sat", "inn", vec![
		ChunkLink { target: dog, kind: LinkKind::Hard },
		ChunkLink { target: UNKNOWN_HASH, kind: LinkKind::Hard },
	]);

	harness
		.service
		.insert_chunks("lore", vec![
			cat,
			scene("the cat ran fast", "inn", Vec::new()),
			scene("a dog barked", "cellar", Vec::new()),
		])
		.await
		.expect("Failed to insert chunks.");

	let response = harness.service.retrieve(inn_request(1)).await.expect("Retrieval failed.");
	let texts: Vec<&str> = response.items.iter().map(|item| item.chunk.text()).collect();

	assert_eq!(texts, vec!["the cat sat", "a dog barked"]);
	assert!(response.items[1].via_hard_link);
	assert_eq!(response.missing_hard_links, vec![UNKNOWN_HASH]);
}

#[tokio::test]
async fn fetch_rounds_are_bounded_by_config() {
	let mut cfg = test_config();

	cfg.links.max_iterations = 0;

	let harness = harness(cfg);
	let dog = chunk_hash("a dog barked");

	harness
		.service
		.insert_chunks("lore", vec![
			scene("the cat sat", "inn", vec![
				ChunkLink { target: dog, kind: LinkKind::Hard },
				ChunkLink { target: UNKNOWN_HASH, kind: LinkKind::Hard },
			]),
			scene("a dog barked", "cellar", Vec::new()),
		])
		.await
		.expect("Failed to insert chunks.");

	let response = harness.service.retrieve(inn_request(5)).await.expect("Retrieval failed.");

	assert_eq!(response.items.len(), 1);
	assert_eq!(response.missing_hard_links, vec![dog, UNKNOWN_HASH]);
}

#[tokio::test]
async fn soft_links_lift_their_targets() {
	let harness = harness(test_config());
	let ran = chunk_hash("the cat ran fast");

	harness
		.service
		.insert_chunks("lore", vec![
			scene("the cat sat", "inn", vec![ChunkLink { target: ran, kind: LinkKind::Soft }]),
			scene("the cat ran fast", "inn", Vec::new()),
		])
		.await
		.expect("Failed to insert chunks.");

	let response = harness.service.retrieve(inn_request(2)).await.expect("Retrieval failed.");
	let top = &response.items[0];

	assert_eq!(top.chunk.text(), "the cat ran fast");
	assert!((top.link_boost - 0.15).abs() < 1e-6);
	assert!(response.missing_hard_links.is_empty());
}
