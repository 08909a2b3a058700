pub const DENSE_VECTOR_NAME: &str = "dense";

use std::{collections::HashMap, time::Duration};

use qdrant_client::{
	Payload,
	qdrant::{
		Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter,
		GetPointsBuilder, PointId, PointStruct, PointsIdsList, Query, QueryPointsBuilder,
		SetPayloadPointsBuilder, UpsertPointsBuilder, Vector, VectorParamsBuilder,
		VectorsConfigBuilder, point_id::PointIdOptions, vectors_config::Config,
	},
};
use tracing::{info, warn};

use hare_domain::chunk::{Chunk, ChunkHash};

use crate::{
	Error, Result,
	models::{CollectionState, FilterValue, PayloadFilter, StoredPoint},
	payload,
};

pub struct QdrantStore {
	pub client: qdrant_client::Qdrant,
	pub collection_prefix: String,
	pub vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &hare_config::Qdrant) -> Result<Self> {
		let client = qdrant_client::Qdrant::from_url(&cfg.url)
			.timeout(Duration::from_millis(cfg.timeout_ms))
			.build()?;

		Ok(Self {
			client,
			collection_prefix: cfg.collection_prefix.clone(),
			vector_dim: cfg.vector_dim,
		})
	}

	/// Physical collection name for a logical collection id.
	pub fn collection_name(&self, collection_id: &str) -> Result<String> {
		collection_name(&self.collection_prefix, collection_id)
	}

	/// Stored dense dimension, or `None` when the collection does not exist.
	pub async fn collection_dim(&self, collection_id: &str) -> Result<Option<u64>> {
		let name = self.collection_name(collection_id)?;

		if !self.client.collection_exists(name.clone()).await? {
			return Ok(None);
		}

		let info = self.client.collection_info(name).await?;
		let dim = info
			.result
			.and_then(|info| info.config)
			.and_then(|config| config.params)
			.and_then(|params| params.vectors_config)
			.and_then(|vectors| vectors.config)
			.and_then(|config| match config {
				Config::Params(params) => Some(params.size),
				Config::ParamsMap(map) => map.map.get(DENSE_VECTOR_NAME).map(|params| params.size),
			});

		Ok(dim)
	}

	/// Creates the collection when missing. A stored dimension that differs from `dim` is an
	/// error unless `allow_recreate`, in which case the collection is dropped and rebuilt.
	pub async fn ensure_collection(
		&self,
		collection_id: &str,
		dim: u32,
		allow_recreate: bool,
	) -> Result<CollectionState> {
		let name = self.collection_name(collection_id)?;
		let state = match self.collection_dim(collection_id).await? {
			Some(actual) if actual == u64::from(dim) => return Ok(CollectionState::Existing),
			Some(actual) => {
				if !allow_recreate {
					return Err(Error::DimensionMismatch {
						collection: name,
						expected: u64::from(dim),
						actual,
					});
				}

				warn!(
					collection = %name,
					expected = dim,
					actual,
					"Dropping collection with mismatched vector dimension."
				);

				self.client.delete_collection(name.clone()).await?;

				CollectionState::Recreated
			},
			None => CollectionState::Created,
		};
		let mut vectors_config = VectorsConfigBuilder::default();

		vectors_config.add_named_vector_params(
			DENSE_VECTOR_NAME,
			VectorParamsBuilder::new(u64::from(dim), Distance::Cosine),
		);

		self.client
			.create_collection(CreateCollectionBuilder::new(name.clone()).vectors_config(vectors_config))
			.await?;

		info!(collection = %name, dim, ?state, "Qdrant collection ready.");

		Ok(state)
	}

	pub async fn upsert(&self, collection_id: &str, points: Vec<StoredPoint>) -> Result<()> {
		if points.is_empty() {
			return Ok(());
		}

		let name = self.collection_name(collection_id)?;
		let points: Vec<PointStruct> = points
			.into_iter()
			.map(|point| {
				let mut vectors = HashMap::new();

				vectors.insert(DENSE_VECTOR_NAME.to_string(), Vector::from(point.vector));

				PointStruct::new(
					point.chunk.hash(),
					vectors,
					payload::to_qdrant_payload(payload::encode_chunk(&point.chunk)),
				)
			})
			.collect();

		self.client.upsert_points(UpsertPointsBuilder::new(name, points).wait(true)).await?;

		Ok(())
	}

	/// Nearest chunks to `vector`, best first, with similarity as the chunk score.
	pub async fn query(
		&self,
		collection_id: &str,
		vector: Vec<f32>,
		limit: u64,
		filter: Option<&PayloadFilter>,
	) -> Result<Vec<Chunk>> {
		let name = self.collection_name(collection_id)?;
		let mut search = QueryPointsBuilder::new(name)
			.query(Query::new_nearest(vector))
			.using(DENSE_VECTOR_NAME)
			.with_payload(true)
			.limit(limit);

		if let Some(filter) = filter.filter(|filter| !filter.is_empty()) {
			search = search.filter(to_qdrant_filter(filter));
		}

		let response = self.client.query(search).await?;

		response
			.result
			.into_iter()
			.filter_map(|point| {
				let hash = point.id.as_ref().and_then(point_hash)?;

				Some(payload::decode_chunk(
					hash,
					point.score,
					payload::from_qdrant_payload(&point.payload),
				))
			})
			.collect()
	}

	/// Stored chunks for `hashes`, score zero. Unknown hashes are skipped.
	pub async fn fetch(&self, collection_id: &str, hashes: &[ChunkHash]) -> Result<Vec<Chunk>> {
		if hashes.is_empty() {
			return Ok(Vec::new());
		}

		let name = self.collection_name(collection_id)?;
		let ids: Vec<PointId> = hashes.iter().map(|hash| PointId::from(*hash)).collect();
		let response =
			self.client.get_points(GetPointsBuilder::new(name, ids).with_payload(true)).await?;

		response
			.result
			.into_iter()
			.filter_map(|point| {
				let hash = point.id.as_ref().and_then(point_hash)?;

				Some(payload::decode_chunk(hash, 0.0, payload::from_qdrant_payload(&point.payload)))
			})
			.collect()
	}

	pub async fn delete_by_hash(&self, collection_id: &str, hashes: &[ChunkHash]) -> Result<()> {
		if hashes.is_empty() {
			return Ok(());
		}

		let name = self.collection_name(collection_id)?;
		let ids = PointsIdsList { ids: hashes.iter().map(|hash| PointId::from(*hash)).collect() };

		self.client.delete_points(DeletePointsBuilder::new(name).points(ids).wait(true)).await?;

		Ok(())
	}

	/// Drops the collection. Missing collections are not an error.
	pub async fn purge(&self, collection_id: &str) -> Result<()> {
		let name = self.collection_name(collection_id)?;

		if self.client.collection_exists(name.clone()).await? {
			self.client.delete_collection(name.clone()).await?;

			info!(collection = %name, "Qdrant collection purged.");
		}

		Ok(())
	}

	/// Replaces the stored payload of one chunk, leaving its vector untouched.
	pub async fn replace_payload(&self, collection_id: &str, chunk: &Chunk) -> Result<()> {
		let name = self.collection_name(collection_id)?;
		let payload: Payload = payload::to_qdrant_payload(payload::encode_chunk(chunk));
		let request = SetPayloadPointsBuilder::new(name, payload)
			.points_selector(PointsIdsList { ids: vec![PointId::from(chunk.hash())] })
			.wait(true);

		self.client.overwrite_payload(request).await?;

		Ok(())
	}
}

fn point_hash(id: &PointId) -> Option<ChunkHash> {
	match id.point_id_options.as_ref()? {
		PointIdOptions::Num(num) => Some(*num),
		PointIdOptions::Uuid(_) => None,
	}
}

fn to_qdrant_filter(filter: &PayloadFilter) -> Filter {
	Filter::must(filter.must.iter().map(|field| {
		let key = format!("{}.{}", payload::METADATA_FIELD, field.key);

		match &field.value {
			FilterValue::Text(text) => Condition::matches(key, text.clone()),
			FilterValue::Integer(number) => Condition::matches(key, *number),
			FilterValue::Bool(flag) => Condition::matches(key, *flag),
		}
	}))
}

/// `{prefix}_{collection_id}`; ids are restricted to ASCII letters, digits, `_` and `-`.
pub fn collection_name(prefix: &str, collection_id: &str) -> Result<String> {
	let valid = !collection_id.is_empty()
		&& collection_id.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');

	if !valid {
		return Err(Error::InvalidArgument(format!(
			"Collection id {collection_id:?} must be non-empty ASCII letters, digits, '_' or '-'."
		)));
	}

	Ok(format!("{prefix}_{collection_id}"))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn collection_names_are_prefixed_and_checked() {
		assert_eq!(
			collection_name("hare", "lore-book_1").expect("Failed to build collection name."),
			"hare_lore-book_1"
		);
		assert!(collection_name("hare", "").is_err());
		assert!(collection_name("hare", "../etc").is_err());
	}

	#[test]
	fn filters_target_metadata_fields() {
		let filter = PayloadFilter::default()
			.matching("scene", FilterValue::Text("inn".to_string()))
			.matching("message_index", FilterValue::Integer(4));
		let qdrant_filter = to_qdrant_filter(&filter);

		assert_eq!(qdrant_filter.must.len(), 2);
		assert!(format!("{qdrant_filter:?}").contains("metadata.scene"));
	}

	#[test]
	fn numeric_point_ids_map_to_hashes() {
		assert_eq!(point_hash(&PointId::from(u64::MAX)), Some(u64::MAX));
	}
}
