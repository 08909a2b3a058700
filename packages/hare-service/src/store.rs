use hare_domain::chunk::{Chunk, ChunkHash};
use hare_storage::{
	models::{CollectionState, PayloadFilter, StoredPoint},
	qdrant::QdrantStore,
};

use crate::{BoxFuture, Result, VectorStore};

impl VectorStore for QdrantStore {
	fn ensure_collection<'a>(
		&'a self,
		collection: &'a str,
		dim: u32,
		allow_recreate: bool,
	) -> BoxFuture<'a, Result<CollectionState>> {
		Box::pin(async move {
			Ok(QdrantStore::ensure_collection(self, collection, dim, allow_recreate).await?)
		})
	}

	fn insert<'a>(
		&'a self,
		collection: &'a str,
		items: Vec<StoredPoint>,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(self.upsert(collection, items).await?) })
	}

	fn query<'a>(
		&'a self,
		collection: &'a str,
		vector: &'a [f32],
		_text: &'a str,
		limit: usize,
		filter: Option<&'a PayloadFilter>,
	) -> BoxFuture<'a, Result<Vec<Chunk>>> {
		Box::pin(async move {
			Ok(QdrantStore::query(self, collection, vector.to_vec(), limit as u64, filter).await?)
		})
	}

	fn fetch<'a>(
		&'a self,
		collection: &'a str,
		hashes: &'a [ChunkHash],
	) -> BoxFuture<'a, Result<Vec<Chunk>>> {
		Box::pin(async move { Ok(QdrantStore::fetch(self, collection, hashes).await?) })
	}

	fn delete_by_hash<'a>(
		&'a self,
		collection: &'a str,
		hashes: &'a [ChunkHash],
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(QdrantStore::delete_by_hash(self, collection, hashes).await?) })
	}

	fn purge<'a>(&'a self, collection: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(QdrantStore::purge(self, collection).await?) })
	}

	fn replace_payload<'a>(
		&'a self,
		collection: &'a str,
		chunk: &'a Chunk,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(QdrantStore::replace_payload(self, collection, chunk).await?) })
	}
}
