use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;
use tracing::info;

use hare_domain::{chunk::ChunkHash, conditions::SearchContext};
use hare_service::{ChunkInput, HareService, RetrieveRequest, RetrieveResponse};
use hare_storage::qdrant::QdrantStore;

use crate::{IngestArgs, QueryArgs};

#[derive(Debug, Serialize)]
pub struct IngestSummary {
	pub collection: String,
	pub inserted: usize,
	pub duplicates: usize,
	pub skipped: usize,
	pub state: &'static str,
	pub hashes: Vec<ChunkHash>,
}

pub async fn query(args: QueryArgs) -> color_eyre::Result<RetrieveResponse> {
	let service = connect(&args.config)?;
	let context = match args.context.as_deref() {
		Some(path) => crate::read_json::<SearchContext>(path)?,
		None => SearchContext { time_of_day: local_time(), ..SearchContext::default() },
	};
	let request = RetrieveRequest {
		query: args.query,
		collections: args.collections,
		top_k: args.top_k,
		context,
		filter: None,
	};

	Ok(service.retrieve(request).await?)
}

pub async fn ingest(args: IngestArgs) -> color_eyre::Result<IngestSummary> {
	let service = connect(&args.config)?;
	let inputs: Vec<ChunkInput> = crate::read_json(&args.input)?;
	let report = service.insert_chunks(&args.collection, inputs).await?;

	info!(
		collection = %args.collection,
		inserted = report.inserted,
		state = report.state.as_str(),
		"Ingestion finished."
	);

	Ok(IngestSummary {
		collection: args.collection,
		inserted: report.inserted,
		duplicates: report.duplicates,
		skipped: report.skipped,
		state: report.state.as_str(),
		hashes: report.hashes,
	})
}

/// Wall-clock time for `timeOfDay` rules, UTC when the local offset is unknown.
fn local_time() -> time::Time {
	OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc()).time()
}

fn connect(path: &std::path::Path) -> color_eyre::Result<HareService> {
	let cfg = hare_config::load(path)?;

	hare_cli::init_tracing(&cfg.service.log_level);

	let store = QdrantStore::new(&cfg.storage.qdrant)?;

	Ok(HareService::new(cfg, Arc::new(store))?)
}
