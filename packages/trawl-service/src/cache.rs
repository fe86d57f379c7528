use std::sync::Arc;

use time::OffsetDateTime;

use trawl_config::{Config, EmbeddingProviderConfig};
use trawl_domain::{AggregatedResult, CachedResult};
use trawl_providers::RetryPolicy;
use trawl_storage::{CacheScope, ExactCache, KvStore, SemanticCache};

use crate::EmbeddingProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
	Semantic,
	Exact,
}

/// Outcome of a sub-query lookup. The query embedding is handed back so a later write can reuse it.
#[derive(Debug, Default)]
pub struct CacheLookup {
	pub hit: Option<(CachedResult, CacheTier)>,
	pub embedding: Option<Vec<f32>>,
}

/// Both cache tiers behind one facade. Lookups go semantic first, then exact. Every failure is a
/// miss or a dropped write.
#[derive(Clone)]
pub struct ResearchCache {
	exact: ExactCache,
	semantic: Option<SemanticCache>,
	embedding: Arc<dyn EmbeddingProvider>,
	embedding_cfg: EmbeddingProviderConfig,
	retry: RetryPolicy,
}
impl ResearchCache {
	pub fn from_config(
		cfg: &Config,
		store: Arc<dyn KvStore>,
		embedding: Arc<dyn EmbeddingProvider>,
	) -> Self {
		let semantic = cfg
			.cache
			.semantic_enabled
			.then(|| SemanticCache::from_config(store.clone(), &cfg.cache));

		Self {
			exact: ExactCache::from_config(store, &cfg.cache),
			semantic,
			embedding,
			embedding_cfg: cfg.providers.embedding.clone(),
			retry: RetryPolicy::from(&cfg.retry),
		}
	}

	pub async fn lookup(&self, query: &str, entity_context: Option<&str>) -> CacheLookup {
		let mut lookup = CacheLookup::default();

		if let Some(semantic) = &self.semantic {
			lookup.embedding = self.embed(query).await;

			if let Some(embedding) = &lookup.embedding
				&& let Some(hit) = semantic
					.lookup::<CachedResult>(entity_context, embedding, OffsetDateTime::now_utc())
					.await
			{
				tracing::debug!(query = %query, similar_to = %hit.query, "Semantic cache hit.");

				lookup.hit = Some((hit.result, CacheTier::Semantic));

				return lookup;
			}
		}

		if let Some(entry) =
			self.exact.get::<CachedResult>(query, entity_context, CacheScope::SubQuery).await
		{
			lookup.hit = Some((entry.payload, CacheTier::Exact));
		}

		lookup
	}

	/// Writes both tiers. Embeds the query when the lookup did not already do so.
	pub async fn store(
		&self,
		query: &str,
		entity_context: Option<&str>,
		result: &CachedResult,
		embedding: Option<Vec<f32>>,
	) {
		self.exact.put(query, entity_context, CacheScope::SubQuery, result).await;

		let Some(semantic) = &self.semantic else { return };
		let embedding = match embedding {
			Some(embedding) => Some(embedding),
			None => self.embed(query).await,
		};

		if let Some(embedding) = embedding {
			semantic
				.insert(query, entity_context, embedding, result.clone(), OffsetDateTime::now_utc())
				.await;
		}
	}

	pub async fn lookup_result(
		&self,
		query: &str,
		entity_context: Option<&str>,
	) -> Option<AggregatedResult> {
		self.exact
			.get::<AggregatedResult>(query, entity_context, CacheScope::Result)
			.await
			.map(|entry| entry.payload)
	}

	pub async fn store_result(
		&self,
		query: &str,
		entity_context: Option<&str>,
		result: &AggregatedResult,
	) {
		self.exact.put(query, entity_context, CacheScope::Result, result).await;
	}

	async fn embed(&self, query: &str) -> Option<Vec<f32>> {
		let texts = [query.to_string()];

		match self.embedding.embed(&self.embedding_cfg, &self.retry, &texts).await {
			Ok(mut vectors) if !vectors.is_empty() => Some(vectors.swap_remove(0)),
			Ok(_) => None,
			Err(err) => {
				tracing::warn!(error = %err, "Query embedding failed. Skipping semantic cache.");

				None
			},
		}
	}
}
