pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Failed to read config file at {path:?}.")]
	ReadConfig { path: std::path::PathBuf, source: std::io::Error },
	#[error("Failed to parse config file at {path:?}.")]
	ParseConfig { path: std::path::PathBuf, source: toml::de::Error },
	#[error("{field} must be non-empty.")]
	Missing { field: String, cause: MissingCause },
	#[error("{message}")]
	Validation { message: String },
}
impl Error {
	/// Stable tag for UI mapping.
	pub fn cause_tag(&self) -> &'static str {
		match self {
			Self::ReadConfig { .. } => "config_unreadable",
			Self::ParseConfig { .. } => "config_malformed",
			Self::Missing { cause, .. } => cause.as_str(),
			Self::Validation { .. } => "config_invalid",
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MissingCause {
	ApiKey,
	ApiBase,
	Model,
	StoreUrl,
}
impl MissingCause {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::ApiKey => "missing_api_key",
			Self::ApiBase => "missing_api_base",
			Self::Model => "missing_model",
			Self::StoreUrl => "missing_store_url",
		}
	}
}
