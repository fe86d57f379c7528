use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::{Error, Result, retry::RetryPolicy};

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
	data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
	index: Option<usize>,
	embedding: Vec<f32>,
}

pub async fn embed(
	cfg: &trawl_config::EmbeddingProviderConfig,
	policy: &RetryPolicy,
	texts: &[String],
) -> Result<Vec<Vec<f32>>> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let headers = crate::auth_headers(&cfg.api_key, None, &cfg.default_headers)?;
	let body = serde_json::json!({
		"model": cfg.model,
		"input": texts,
		"encoding_format": "float",
	});
	let policy = policy.with_timeout_cap(Duration::from_millis(cfg.timeout_ms));
	let res = crate::retry::send_with_retry(&policy, None, |_| {
		client.post(&url).headers(headers.clone()).json(&body).send()
	})
	.await?;
	let json: Value = res.error_for_status()?.json().await?;
	let vectors = parse_embedding_response(json)?;

	if vectors.len() != texts.len() {
		return Err(Error::InvalidResponse {
			message: format!("Expected {} embedding(s), got {}.", texts.len(), vectors.len()),
		});
	}
	if let Some(vector) = vectors.iter().find(|v| v.len() != cfg.dimensions as usize) {
		return Err(Error::InvalidResponse {
			message: format!(
				"Embedding has {} dimension(s), expected {}.",
				vector.len(),
				cfg.dimensions
			),
		});
	}

	Ok(vectors)
}

fn parse_embedding_response(json: Value) -> Result<Vec<Vec<f32>>> {
	let response: EmbeddingResponse = serde_json::from_value(json)?;
	let mut indexed: Vec<(usize, Vec<f32>)> = response
		.data
		.into_iter()
		.enumerate()
		.map(|(position, item)| (item.index.unwrap_or(position), item.embedding))
		.collect();

	indexed.sort_by_key(|(index, _)| *index);

	Ok(indexed.into_iter().map(|(_, vector)| vector).collect())
}
