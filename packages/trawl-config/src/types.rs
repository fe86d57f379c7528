use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub providers: Providers,
	#[serde(default)]
	pub retry: Retry,
	#[serde(default)]
	pub executor: Executor,
	#[serde(default)]
	pub planner: Planner,
	#[serde(default)]
	pub cache: Cache,
	#[serde(default)]
	pub aggregation: Aggregation,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Providers {
	pub grounded_search: GenerationProviderConfig,
	pub planner: GenerationProviderConfig,
	pub embedding: EmbeddingProviderConfig,
	pub keyword_search: Option<KeywordSearchConfig>,
}

/// A `generateContent`-style endpoint. Used both for grounded search and for query decomposition.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	/// Literal key, or `env:NAME` to read it from the environment at load time.
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub timeout_ms: u64,
	#[serde(default = "default_max_output_tokens")]
	pub max_output_tokens: u32,
	/// Header carrying the raw key, e.g. `x-goog-api-key`. Bearer auth when unset.
	pub auth_header: Option<String>,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeywordSearchConfig {
	pub api_base: String,
	pub api_key: String,
	pub engine_id: String,
	#[serde(default = "default_keyword_result_count")]
	pub result_count: u32,
	pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Retry {
	pub retries: u32,
	pub base_delay_ms: u64,
	pub max_delay_ms: u64,
	pub timeout_ms: u64,
	#[serde(default = "default_retryable_statuses")]
	pub retryable_statuses: Vec<u16>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Executor {
	pub global_budget_ms: u64,
	pub min_task_timeout_ms: u64,
	pub min_workers: usize,
	pub max_workers: usize,
	#[serde(default = "default_true")]
	pub fallback_search: bool,
	#[serde(default = "default_true")]
	pub maritime_filter: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Planner {
	pub enabled: bool,
	pub timeout_ms: u64,
	pub min_sub_queries: usize,
	pub max_sub_queries: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Cache {
	pub enabled: bool,
	#[serde(default = "default_key_prefix")]
	pub key_prefix: String,
	pub exact_ttl_seconds: u64,
	pub semantic_enabled: bool,
	pub semantic_threshold: f32,
	pub semantic_ttl_seconds: u64,
	pub semantic_ttl_floor_seconds: u64,
	#[serde(default)]
	pub cache_final_results: bool,
	#[serde(default)]
	pub store: CacheStore,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheStore {
	/// `memory` or `http`.
	pub kind: String,
	pub api_base: Option<String>,
	pub account_id: Option<String>,
	pub namespace_id: Option<String>,
	pub api_token: Option<String>,
	#[serde(default = "default_store_timeout_ms")]
	pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Aggregation {
	pub top_k: usize,
	pub max_content_chars: usize,
}

impl Default for Retry {
	fn default() -> Self {
		Self {
			retries: 2,
			base_delay_ms: 250,
			max_delay_ms: 4_000,
			timeout_ms: 15_000,
			retryable_statuses: default_retryable_statuses(),
		}
	}
}

impl Default for Executor {
	fn default() -> Self {
		Self {
			global_budget_ms: 20_000,
			min_task_timeout_ms: 3_000,
			min_workers: 4,
			max_workers: 8,
			fallback_search: true,
			maritime_filter: true,
		}
	}
}

impl Default for Planner {
	fn default() -> Self {
		Self { enabled: true, timeout_ms: 8_000, min_sub_queries: 3, max_sub_queries: 13 }
	}
}

impl Default for Cache {
	fn default() -> Self {
		Self {
			enabled: true,
			key_prefix: default_key_prefix(),
			exact_ttl_seconds: 86_400,
			semantic_enabled: true,
			semantic_threshold: 0.92,
			semantic_ttl_seconds: 86_400,
			semantic_ttl_floor_seconds: 3_600,
			cache_final_results: false,
			store: CacheStore::default(),
		}
	}
}

impl Default for CacheStore {
	fn default() -> Self {
		Self {
			kind: "memory".to_string(),
			api_base: None,
			account_id: None,
			namespace_id: None,
			api_token: None,
			timeout_ms: default_store_timeout_ms(),
		}
	}
}

impl Default for Aggregation {
	fn default() -> Self {
		Self { top_k: 10, max_content_chars: 1_500 }
	}
}

fn default_true() -> bool {
	true
}

fn default_max_output_tokens() -> u32 {
	2_048
}

fn default_keyword_result_count() -> u32 {
	10
}

fn default_retryable_statuses() -> Vec<u16> {
	let mut statuses = vec![408, 429];

	statuses.extend(500..=599);

	statuses
}

fn default_key_prefix() -> String {
	"trawl".to_string()
}

fn default_store_timeout_ms() -> u64 {
	5_000
}
