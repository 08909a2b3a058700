#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error("Invalid payload for chunk {hash}: {message}")]
	InvalidPayload { hash: u64, message: String },
	#[error(
		"Collection {collection} stores {actual}-dimensional vectors but {expected} were requested."
	)]
	DimensionMismatch { collection: String, expected: u64, actual: u64 },
	#[error(transparent)]
	Qdrant(#[from] Box<qdrant_client::QdrantError>),
}
impl From<qdrant_client::QdrantError> for Error {
	fn from(err: qdrant_client::QdrantError) -> Self {
		Self::Qdrant(Box::new(err))
	}
}
impl Error {
	/// Unavailable, deadline-exceeded, aborted and resource-exhausted gRPC responses.
	pub fn is_transient(&self) -> bool {
		const DEADLINE_EXCEEDED: i32 = 4;
		const RESOURCE_EXHAUSTED: i32 = 8;
		const ABORTED: i32 = 10;
		const UNAVAILABLE: i32 = 14;

		match self {
			Self::Qdrant(err) => match err.as_ref() {
				qdrant_client::QdrantError::ResponseError { status } => matches!(
					status.code() as i32,
					DEADLINE_EXCEEDED | RESOURCE_EXHAUSTED | ABORTED | UNAVAILABLE
				),
				qdrant_client::QdrantError::ResourceExhaustedError { .. } => true,
				_ => false,
			},
			_ => false,
		}
	}
}
