use hare_providers::retry::Retryable;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Config(#[from] hare_config::Error),
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String, retryable: bool },
	#[error("Storage error: {message}")]
	Storage { message: String, retryable: bool },
	#[error("{operation} timed out after {timeout_ms} ms.")]
	Timeout { operation: String, timeout_ms: u64 },
	#[error("Data error: {message}")]
	Data { message: String },
	#[error(
		"Collection {collection} stores {actual}-dimensional vectors but {expected} were requested."
	)]
	DimensionMismatch { collection: String, expected: u64, actual: u64 },
}
impl Error {
	/// Stable tag for UI mapping.
	pub fn cause_tag(&self) -> &'static str {
		match self {
			Self::Config(err) => err.cause_tag(),
			Self::InvalidRequest { .. } => "invalid_request",
			Self::NotFound { .. } => "not_found",
			Self::Provider { .. } => "provider_failed",
			Self::Storage { .. } => "storage_failed",
			Self::Timeout { .. } => "timeout",
			Self::Data { .. } => "invalid_data",
			Self::DimensionMismatch { .. } => "dimension_mismatch",
		}
	}
}
impl Retryable for Error {
	fn is_retryable(&self) -> bool {
		match self {
			Self::Provider { retryable, .. } | Self::Storage { retryable, .. } => *retryable,
			Self::Timeout { .. } => true,
			_ => false,
		}
	}
}

impl From<hare_providers::Error> for Error {
	fn from(err: hare_providers::Error) -> Self {
		match err {
			hare_providers::Error::Timeout { timeout_ms } =>
				Self::Timeout { operation: "Provider call".to_string(), timeout_ms },
			hare_providers::Error::InvalidResponse { message } => Self::Data { message },
			hare_providers::Error::InvalidConfig { message } =>
				Self::Config(hare_config::Error::Validation { message }),
			other => Self::Provider { retryable: other.is_retryable(), message: other.to_string() },
		}
	}
}

impl From<hare_storage::Error> for Error {
	fn from(err: hare_storage::Error) -> Self {
		let retryable = err.is_transient();

		match err {
			hare_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			hare_storage::Error::InvalidPayload { .. } => Self::Data { message: err.to_string() },
			hare_storage::Error::DimensionMismatch { collection, expected, actual } =>
				Self::DimensionMismatch { collection, expected, actual },
			hare_storage::Error::Qdrant(inner) =>
				Self::Storage { message: inner.to_string(), retryable },
		}
	}
}
