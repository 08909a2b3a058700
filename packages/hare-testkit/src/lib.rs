mod error;

pub use error::{Error, Result};

use std::{collections::HashSet, env, future::Future, sync::Mutex, time::Duration};

use qdrant_client::Qdrant;
use rand::Rng;
use tokio::time;

/// Tracks collection ids handed out to a live test so they can be dropped afterwards.
pub struct TestCollections {
	qdrant_url: String,
	prefix: String,
	collections: Mutex<HashSet<String>>,
}
impl TestCollections {
	pub fn new(qdrant_url: impl Into<String>) -> Self {
		let suffix: u32 = rand::rng().random();

		Self {
			qdrant_url: qdrant_url.into(),
			prefix: format!("hare_test_{suffix:08x}"),
			collections: Mutex::new(HashSet::new()),
		}
	}

	/// Prefix to configure `storage.qdrant.collection_prefix` with.
	pub fn prefix(&self) -> &str {
		&self.prefix
	}

	/// Registers a logical collection id; its physical name is `{prefix}_{id}`.
	pub fn collection_id(&self, id: &str) -> String {
		let mut tracked = self.collections.lock().unwrap_or_else(|err| err.into_inner());

		tracked.insert(format!("{}_{id}", self.prefix));

		id.to_string()
	}

	pub async fn cleanup(self) -> Result<()> {
		let collections = {
			let tracked = self.collections.lock().unwrap_or_else(|err| err.into_inner());

			tracked.iter().cloned().collect::<Vec<_>>()
		};

		cleanup_qdrant_collections(&self.qdrant_url, &collections).await
	}
}

pub fn env_qdrant_url() -> Option<String> {
	env::var("HARE_QDRANT_URL").ok()
}

pub async fn with_test_collections<F, Fut, T>(qdrant_url: &str, f: F) -> Result<T>
where
	F: FnOnce(&TestCollections) -> Fut,
	Fut: Future<Output = Result<T>>,
{
	let collections = TestCollections::new(qdrant_url);
	let result = f(&collections).await;

	if let Err(err) = collections.cleanup().await {
		eprintln!("Test collection cleanup warning: {err}.");

		if result.is_ok() {
			return Err(err);
		}
	}

	result
}

async fn cleanup_qdrant_collections(qdrant_url: &str, collections: &[String]) -> Result<()> {
	if collections.is_empty() {
		return Ok(());
	}

	let client = Qdrant::from_url(qdrant_url)
		.build()
		.map_err(|err| Error::Message(format!("Failed to build Qdrant client: {err}.")))?;
	let max_attempts = 6;
	let mut remaining = collections.iter().cloned().collect::<HashSet<_>>();
	let mut backoff = Duration::from_millis(100);

	for attempt in 1..=max_attempts {
		let existing = time::timeout(Duration::from_secs(10), client.list_collections())
			.await
			.map_err(|_| Error::Message("Qdrant list_collections timed out.".to_string()))?
			.map_err(|err| Error::Message(format!("Failed to list Qdrant collections: {err}.")))?;
		let existing = existing.collections.into_iter().map(|c| c.name).collect::<HashSet<_>>();

		remaining.retain(|collection| existing.contains(collection));

		if remaining.is_empty() {
			return Ok(());
		}

		for collection in remaining.iter().cloned().collect::<Vec<_>>() {
			let result = time::timeout(
				Duration::from_secs(10),
				client.delete_collection(collection.clone()),
			)
			.await;

			match result {
				Ok(Ok(_)) => {},
				Ok(Err(err)) =>
					if attempt == max_attempts {
						return Err(Error::Message(format!(
							"Failed to delete Qdrant collection {collection:?} after {attempt} attempts: {err}."
						)));
					},
				Err(_) =>
					if attempt == max_attempts {
						return Err(Error::Message(format!(
							"Timed out deleting Qdrant collection {collection:?} after {attempt} attempts."
						)));
					},
			}
		}

		time::sleep(backoff).await;

		backoff = backoff.saturating_mul(2).min(Duration::from_secs(2));
	}

	Ok(())
}
