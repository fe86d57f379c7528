use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result, retry::RetryPolicy};

/// One `generateContent` call.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
	pub prompt: &'a str,
	/// Attach the web search tool.
	pub grounded: bool,
	/// Ask for `application/json` output.
	pub json_output: bool,
}

pub async fn generate(
	cfg: &trawl_config::GenerationProviderConfig,
	policy: &RetryPolicy,
	request: GenerationRequest<'_>,
) -> Result<Value> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let headers =
		crate::auth_headers(&cfg.api_key, cfg.auth_header.as_deref(), &cfg.default_headers)?;
	let body = build_generation_body(cfg.max_output_tokens, request);
	let policy = policy.with_timeout_cap(Duration::from_millis(cfg.timeout_ms));
	let res = crate::retry::send_with_retry(&policy, None, |_| {
		client.post(&url).headers(headers.clone()).json(&body).send()
	})
	.await?;
	let json: Value = res.error_for_status()?.json().await?;

	Ok(json)
}

pub fn build_generation_body(max_output_tokens: u32, request: GenerationRequest<'_>) -> Value {
	let mut generation_config = serde_json::json!({
		"temperature": 0,
		"topP": 1,
		"topK": 1,
		"maxOutputTokens": max_output_tokens,
	});

	if request.json_output {
		generation_config["responseMimeType"] = Value::from("application/json");
	}

	let mut body = serde_json::json!({
		"contents": [
			{ "role": "user", "parts": [{ "text": request.prompt }] }
		],
		"generationConfig": generation_config,
	});

	if request.grounded {
		body["tools"] = serde_json::json!([{ "google_search": {} }]);
	}

	body
}

/// Concatenated text parts of the first candidate. `None` when the candidate has no text.
pub fn answer_text(json: &Value) -> Option<String> {
	let parts = json
		.get("candidates")
		.and_then(Value::as_array)
		.and_then(|candidates| candidates.first())
		.and_then(|candidate| candidate.get("content"))
		.and_then(|content| content.get("parts"))
		.and_then(Value::as_array)?;
	let text: String = parts.iter().filter_map(|part| part.get("text").and_then(Value::as_str)).collect();
	let text = text.trim();

	if text.is_empty() { None } else { Some(text.to_string()) }
}

/// Parses the answer text of a JSON-mode call, tolerating a surrounding code fence.
pub fn parse_json_answer(json: &Value) -> Result<Value> {
	let text = answer_text(json).ok_or_else(|| Error::InvalidResponse {
		message: "Generation response has no text content.".to_string(),
	})?;
	let stripped = strip_code_fence(&text);

	Ok(serde_json::from_str(stripped)?)
}

fn strip_code_fence(text: &str) -> &str {
	let trimmed = text.trim();
	let Some(rest) = trimmed.strip_prefix("```") else { return trimmed };
	let rest = rest.strip_prefix("json").unwrap_or(rest);

	rest.strip_suffix("```").unwrap_or(rest).trim()
}
