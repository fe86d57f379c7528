use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use time::OffsetDateTime;

use trawl_domain::{entity, text};

use crate::kv::KvStore;

/// Key namespace inside the exact tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheScope {
	/// One sub-query's extracted sources.
	SubQuery,
	/// A whole aggregated result for a main query.
	Result,
}
impl CacheScope {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::SubQuery => "exact",
			Self::Result => "result",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
	#[serde(flatten)]
	pub payload: T,
	#[serde(with = "crate::time_serde")]
	pub cached_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub expires_at: OffsetDateTime,
}

/// Exact-match tier keyed by normalized query text and canonical entity identifier. Store errors
/// degrade to misses and dropped writes.
#[derive(Clone)]
pub struct ExactCache {
	store: Arc<dyn KvStore>,
	prefix: String,
	ttl: Duration,
}
impl ExactCache {
	pub fn new(store: Arc<dyn KvStore>, prefix: impl Into<String>, ttl: Duration) -> Self {
		Self { store, prefix: prefix.into(), ttl }
	}

	pub fn from_config(store: Arc<dyn KvStore>, cfg: &trawl_config::Cache) -> Self {
		Self::new(store, cfg.key_prefix.clone(), Duration::from_secs(cfg.exact_ttl_seconds))
	}

	pub fn key(&self, query: &str, entity_context: Option<&str>, scope: CacheScope) -> String {
		let canonical = entity::canonical_entity_id(entity_context).unwrap_or_default();
		let material = format!("{}::{canonical}", text::normalize_for_key(query));

		format!("{}:{}:{}", self.prefix, scope.as_str(), blake3::hash(material.as_bytes()).to_hex())
	}

	pub async fn get<T>(
		&self,
		query: &str,
		entity_context: Option<&str>,
		scope: CacheScope,
	) -> Option<CacheEntry<T>>
	where
		T: DeserializeOwned,
	{
		self.get_at(query, entity_context, scope, OffsetDateTime::now_utc()).await
	}

	/// Reads an entry, treating it as a miss at or after its `expires_at`.
	pub async fn get_at<T>(
		&self,
		query: &str,
		entity_context: Option<&str>,
		scope: CacheScope,
		now: OffsetDateTime,
	) -> Option<CacheEntry<T>>
	where
		T: DeserializeOwned,
	{
		let key = self.key(query, entity_context, scope);
		let raw = match self.store.get(&key).await {
			Ok(raw) => raw?,
			Err(err) => {
				tracing::warn!(error = %err, key = %key, "Exact cache read failed.");

				return None;
			},
		};
		let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
			Ok(entry) => entry,
			Err(err) => {
				tracing::warn!(error = %err, key = %key, "Exact cache entry is not decodable.");

				return None;
			},
		};

		if now >= entry.expires_at {
			return None;
		}

		Some(entry)
	}

	pub async fn put<T>(&self, query: &str, entity_context: Option<&str>, scope: CacheScope, payload: &T)
	where
		T: Serialize,
	{
		self.put_at(query, entity_context, scope, payload, OffsetDateTime::now_utc()).await;
	}

	pub async fn put_at<T>(
		&self,
		query: &str,
		entity_context: Option<&str>,
		scope: CacheScope,
		payload: &T,
		now: OffsetDateTime,
	) where
		T: Serialize,
	{
		let key = self.key(query, entity_context, scope);
		let Some(expires_at) =
			time::Duration::try_from(self.ttl).ok().and_then(|ttl| now.checked_add(ttl))
		else {
			tracing::warn!(
				key = %key,
				ttl_seconds = self.ttl.as_secs(),
				"Exact cache TTL is out of range. Skipping write."
			);

			return;
		};
		let entry = CacheEntry { payload, cached_at: now, expires_at };
		let raw = match serde_json::to_string(&entry) {
			Ok(raw) => raw,
			Err(err) => {
				tracing::warn!(error = %err, key = %key, "Failed to encode exact cache entry.");

				return;
			},
		};

		if let Err(err) = self.store.put(&key, raw, self.ttl).await {
			tracing::warn!(error = %err, key = %key, "Exact cache write failed.");
		}
	}
}
