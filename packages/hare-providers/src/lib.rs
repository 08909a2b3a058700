pub mod embedding;
pub mod keywords;
pub mod rate_limit;
pub mod retry;

mod error;

pub use error::{Error, Result};

use reqwest::{
	Response,
	header::{AUTHORIZATION, HeaderMap, HeaderName},
};
use serde_json::{Map, Value};

pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: "Default header values must be strings.".to_string(),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

/// 429 and the 5xx statuses that usually clear on their own.
pub fn is_retryable_status(status: u16) -> bool {
	matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Passes successful responses through and turns the rest into `Error::Status` carrying the
/// response body.
pub(crate) async fn check_status(res: Response) -> Result<Response> {
	let status = res.status();

	if status.is_success() {
		return Ok(res);
	}

	let message = res.text().await.unwrap_or_default();

	Err(Error::Status { status: status.as_u16(), message })
}
