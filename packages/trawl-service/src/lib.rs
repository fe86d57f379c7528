pub mod aggregate;
pub mod cache;
pub mod executor;
pub mod extract;
pub mod planner;
pub mod research;
pub mod status;

mod error;

pub use cache::{CacheLookup, CacheTier, ResearchCache};
pub use error::{Error, Result};
pub use executor::ExecutionReport;
pub use status::{RecordingSink, StatusEvent, StatusSink, TracingSink};

use std::{future::Future, pin::Pin, sync::Arc};

use serde_json::Value;

use trawl_config::{
	Config, EmbeddingProviderConfig, GenerationProviderConfig, KeywordSearchConfig,
};
use trawl_providers::{
	RetryPolicy, embedding,
	generation::{self, GenerationRequest},
	keyword,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Generation call with the web search tool attached. Returns the raw response.
pub trait GroundedSearchProvider
where
	Self: Send + Sync,
{
	fn search<'a>(
		&'a self,
		cfg: &'a GenerationProviderConfig,
		policy: &'a RetryPolicy,
		query: &'a str,
	) -> BoxFuture<'a, trawl_providers::Result<Value>>;
}

/// JSON-mode generation call that splits a research question into sub-queries.
pub trait DecompositionProvider
where
	Self: Send + Sync,
{
	fn decompose<'a>(
		&'a self,
		cfg: &'a GenerationProviderConfig,
		policy: &'a RetryPolicy,
		prompt: &'a str,
	) -> BoxFuture<'a, trawl_providers::Result<Value>>;
}

pub trait KeywordSearchProvider
where
	Self: Send + Sync,
{
	fn search<'a>(
		&'a self,
		cfg: &'a KeywordSearchConfig,
		policy: &'a RetryPolicy,
		query: &'a str,
	) -> BoxFuture<'a, trawl_providers::Result<Value>>;
}

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		policy: &'a RetryPolicy,
		texts: &'a [String],
	) -> BoxFuture<'a, trawl_providers::Result<Vec<Vec<f32>>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub grounded_search: Arc<dyn GroundedSearchProvider>,
	pub decomposition: Arc<dyn DecompositionProvider>,
	pub keyword_search: Arc<dyn KeywordSearchProvider>,
	pub embedding: Arc<dyn EmbeddingProvider>,
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self {
			grounded_search: provider.clone(),
			decomposition: provider.clone(),
			keyword_search: provider.clone(),
			embedding: provider,
		}
	}
}

pub struct ResearchService {
	pub cfg: Config,
	pub providers: Providers,
	pub cache: Option<ResearchCache>,
}
impl ResearchService {
	pub fn new(cfg: Config, providers: Providers, cache: Option<ResearchCache>) -> Self {
		Self { cfg, providers, cache }
	}

	/// Wires the HTTP providers and, when enabled, the cache backend named in the config.
	pub fn from_config(cfg: Config) -> Result<Self> {
		let providers = Providers::default();
		let cache = if cfg.cache.enabled {
			let store = trawl_storage::store_from_config(&cfg.cache.store, &retry_policy(&cfg))?;

			Some(ResearchCache::from_config(&cfg, store, providers.embedding.clone()))
		} else {
			None
		};

		Ok(Self::new(cfg, providers, cache))
	}

	pub fn retry_policy(&self) -> RetryPolicy {
		retry_policy(&self.cfg)
	}
}

struct DefaultProviders;
impl GroundedSearchProvider for DefaultProviders {
	fn search<'a>(
		&'a self,
		cfg: &'a GenerationProviderConfig,
		policy: &'a RetryPolicy,
		query: &'a str,
	) -> BoxFuture<'a, trawl_providers::Result<Value>> {
		Box::pin(generation::generate(
			cfg,
			policy,
			GenerationRequest { prompt: query, grounded: true, json_output: false },
		))
	}
}
impl DecompositionProvider for DefaultProviders {
	fn decompose<'a>(
		&'a self,
		cfg: &'a GenerationProviderConfig,
		policy: &'a RetryPolicy,
		prompt: &'a str,
	) -> BoxFuture<'a, trawl_providers::Result<Value>> {
		Box::pin(generation::generate(
			cfg,
			policy,
			GenerationRequest { prompt, grounded: false, json_output: true },
		))
	}
}
impl KeywordSearchProvider for DefaultProviders {
	fn search<'a>(
		&'a self,
		cfg: &'a KeywordSearchConfig,
		policy: &'a RetryPolicy,
		query: &'a str,
	) -> BoxFuture<'a, trawl_providers::Result<Value>> {
		Box::pin(keyword::search(cfg, policy, query))
	}
}
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		policy: &'a RetryPolicy,
		texts: &'a [String],
	) -> BoxFuture<'a, trawl_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, policy, texts))
	}
}

fn retry_policy(cfg: &Config) -> RetryPolicy {
	RetryPolicy::from(&cfg.retry)
}
