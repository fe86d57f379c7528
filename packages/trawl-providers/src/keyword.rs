use std::time::Duration;

use reqwest::{Client, Url};
use serde_json::Value;

use crate::{Error, Result, retry::RetryPolicy};

/// Runs a keyword web search and returns the raw response. Items live under `items`.
pub async fn search(
	cfg: &trawl_config::KeywordSearchConfig,
	policy: &RetryPolicy,
	query: &str,
) -> Result<Value> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = search_url(cfg, query)?;
	let policy = policy.with_timeout_cap(Duration::from_millis(cfg.timeout_ms));
	let res = crate::retry::send_with_retry(&policy, None, |_| client.get(url.clone()).send()).await?;
	let json: Value = res.error_for_status()?.json().await?;

	Ok(json)
}

pub fn search_url(cfg: &trawl_config::KeywordSearchConfig, query: &str) -> Result<Url> {
	let num = cfg.result_count.to_string();

	Url::parse_with_params(
		&cfg.api_base,
		[("key", cfg.api_key.as_str()), ("cx", cfg.engine_id.as_str()), ("q", query), ("num", &num)],
	)
	.map_err(|err| Error::InvalidConfig {
		message: format!("providers.keyword_search.api_base is not a valid URL: {err}."),
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn url_carries_all_parameters() {
		let cfg = trawl_config::KeywordSearchConfig {
			api_base: "https://www.googleapis.com/customsearch/v1".to_string(),
			api_key: "k".to_string(),
			engine_id: "cx1".to_string(),
			result_count: 5,
			timeout_ms: 1_000,
		};
		let url = search_url(&cfg, "IMO 9811000 owner").expect("Failed to build URL.");
		let pairs: Vec<(String, String)> =
			url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect();

		assert!(pairs.contains(&("q".to_string(), "IMO 9811000 owner".to_string())));
		assert!(pairs.contains(&("cx".to_string(), "cx1".to_string())));
		assert!(pairs.contains(&("num".to_string(), "5".to_string())));
	}
}
