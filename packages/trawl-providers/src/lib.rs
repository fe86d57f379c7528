//! HTTP clients for the external collaborators: grounded search, query decomposition, keyword
//! search, and embeddings. Every call goes through [`retry::send_with_retry`].

pub mod embedding;
pub mod generation;
pub mod keyword;
pub mod retry;

mod error;

pub use error::{Error, Result};
pub use retry::{RetryEvent, RetryPolicy, RetryReason};

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde_json::{Map, Value};

/// Builds request headers. With `auth_header` set the raw key goes into that header, otherwise it is
/// sent as a bearer token.
pub fn auth_headers(
	api_key: &str,
	auth_header: Option<&str>,
	default_headers: &Map<String, Value>,
) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	match auth_header {
		Some(name) => {
			headers.insert(HeaderName::from_bytes(name.as_bytes())?, HeaderValue::from_str(api_key)?);
		},
		None => {
			headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {api_key}"))?);
		},
	}

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: format!("Default header {key} must be a string."),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, HeaderValue::from_str(raw)?);
	}

	Ok(headers)
}
