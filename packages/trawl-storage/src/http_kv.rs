use std::time::Duration;

use reqwest::{Client, StatusCode, Url};

use trawl_providers::{RetryPolicy, retry};

use crate::{
	Error, Result,
	kv::{BoxFuture, KvStore},
};

/// Smallest TTL the REST namespace accepts.
pub const MIN_TTL_SECONDS: u64 = 60;

/// REST key-value namespace:
/// `{api_base}/accounts/{account_id}/storage/kv/namespaces/{namespace_id}/values/{key}`.
#[derive(Debug, Clone)]
pub struct HttpKv {
	client: Client,
	values_url: Url,
	api_token: String,
	retry: RetryPolicy,
}
impl HttpKv {
	pub fn new(cfg: &trawl_config::CacheStore, retry: RetryPolicy) -> Result<Self> {
		let api_base = required(&cfg.api_base, "api_base")?;
		let account_id = required(&cfg.account_id, "account_id")?;
		let namespace_id = required(&cfg.namespace_id, "namespace_id")?;
		let api_token = required(&cfg.api_token, "api_token")?;
		let mut values_url = Url::parse(api_base).map_err(|err| Error::InvalidConfig {
			message: format!("cache.store.api_base is not a valid URL: {err}."),
		})?;

		values_url
			.path_segments_mut()
			.map_err(|_| Error::InvalidConfig {
				message: "cache.store.api_base cannot carry a path.".to_string(),
			})?
			.pop_if_empty()
			.extend(["accounts", account_id, "storage", "kv", "namespaces", namespace_id, "values"]);

		let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
		let retry = retry.with_timeout_cap(Duration::from_millis(cfg.timeout_ms));

		Ok(Self { client, values_url, api_token: api_token.to_string(), retry })
	}

	pub fn value_url(&self, key: &str) -> Url {
		let mut url = self.values_url.clone();

		// The base URL was checked for path support in `new`.
		if let Ok(mut segments) = url.path_segments_mut() {
			segments.push(key);
		}

		url
	}

	async fn get_value(&self, key: &str) -> Result<Option<String>> {
		let url = self.value_url(key);
		let res = retry::send_with_retry(&self.retry, None, |_| {
			self.client.get(url.clone()).bearer_auth(&self.api_token).send()
		})
		.await
		.map_err(trawl_providers::Error::from)?;

		if res.status() == StatusCode::NOT_FOUND {
			return Ok(None);
		}

		Ok(Some(res.error_for_status()?.text().await?))
	}

	async fn put_value(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
		let mut url = self.value_url(key);

		url.query_pairs_mut()
			.append_pair("expiration_ttl", &ttl.as_secs().max(MIN_TTL_SECONDS).to_string());

		let res = retry::send_with_retry(&self.retry, None, |_| {
			self.client
				.put(url.clone())
				.bearer_auth(&self.api_token)
				.header(reqwest::header::CONTENT_TYPE, "text/plain")
				.body(value.clone())
				.send()
		})
		.await
		.map_err(trawl_providers::Error::from)?;

		res.error_for_status()?;

		Ok(())
	}

	async fn delete_value(&self, key: &str) -> Result<()> {
		let url = self.value_url(key);
		let res = retry::send_with_retry(&self.retry, None, |_| {
			self.client.delete(url.clone()).bearer_auth(&self.api_token).send()
		})
		.await
		.map_err(trawl_providers::Error::from)?;

		if res.status() == StatusCode::NOT_FOUND {
			return Ok(());
		}

		res.error_for_status()?;

		Ok(())
	}
}
impl KvStore for HttpKv {
	fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
		Box::pin(self.get_value(key))
	}

	fn put<'a>(&'a self, key: &'a str, value: String, ttl: Duration) -> BoxFuture<'a, Result<()>> {
		Box::pin(self.put_value(key, value, ttl))
	}

	fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(self.delete_value(key))
	}
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str> {
	value.as_deref().ok_or_else(|| Error::InvalidConfig {
		message: format!("cache.store.{field} is required for the http store."),
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	fn store_config() -> trawl_config::CacheStore {
		trawl_config::CacheStore {
			kind: "http".to_string(),
			api_base: Some("https://api.example.net/client/v4/".to_string()),
			account_id: Some("acct".to_string()),
			namespace_id: Some("ns".to_string()),
			api_token: Some("token".to_string()),
			timeout_ms: 2_000,
		}
	}

	#[test]
	fn builds_namespace_value_url() {
		let kv = HttpKv::new(&store_config(), RetryPolicy::default()).expect("Failed to build store.");

		assert_eq!(
			kv.value_url("trawl:exact:abc").as_str(),
			"https://api.example.net/client/v4/accounts/acct/storage/kv/namespaces/ns/values/trawl:exact:abc"
		);
	}

	#[test]
	fn keys_are_percent_encoded() {
		let kv = HttpKv::new(&store_config(), RetryPolicy::default()).expect("Failed to build store.");

		assert!(kv.value_url("a/b c").as_str().ends_with("/values/a%2Fb%20c"));
	}

	#[test]
	fn missing_credentials_are_rejected() {
		let cfg = trawl_config::CacheStore { api_token: None, ..store_config() };

		assert!(matches!(
			HttpKv::new(&cfg, RetryPolicy::default()),
			Err(Error::InvalidConfig { .. })
		));
	}
}
