use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use time::OffsetDateTime;

use trawl_domain::{entity, similarity};

use crate::{kv::KvStore, ring::BoundedRing};

pub const BUCKET_CAPACITY: usize = 20;

pub type Bucket<T> = BoundedRing<SemanticEntry<T>, BUCKET_CAPACITY>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticEntry<T> {
	pub query: String,
	pub embedding: Vec<f32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub entity_context: Option<String>,
	pub result: T,
	#[serde(with = "crate::time_serde")]
	pub timestamp: OffsetDateTime,
	pub ttl_seconds: u64,
}
impl<T> SemanticEntry<T> {
	pub fn is_live_at(&self, now: OffsetDateTime) -> bool {
		now - self.timestamp < time::Duration::seconds(self.ttl_seconds.min(i64::MAX as u64) as i64)
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct SemanticHit<T> {
	/// The cached query that matched.
	pub query: String,
	pub similarity: f32,
	pub result: T,
}

/// Nearest-neighbour tier. One bucket per canonical entity, or a shared global bucket.
#[derive(Clone)]
pub struct SemanticCache {
	store: Arc<dyn KvStore>,
	prefix: String,
	threshold: f32,
	ttl: Duration,
	ttl_floor: Duration,
}
impl SemanticCache {
	pub fn new(
		store: Arc<dyn KvStore>,
		prefix: impl Into<String>,
		threshold: f32,
		ttl: Duration,
		ttl_floor: Duration,
	) -> Self {
		Self { store, prefix: prefix.into(), threshold, ttl, ttl_floor }
	}

	pub fn from_config(store: Arc<dyn KvStore>, cfg: &trawl_config::Cache) -> Self {
		Self::new(
			store,
			cfg.key_prefix.clone(),
			cfg.semantic_threshold,
			Duration::from_secs(cfg.semantic_ttl_seconds),
			Duration::from_secs(cfg.semantic_ttl_floor_seconds),
		)
	}

	pub fn bucket_key(&self, entity_context: Option<&str>) -> String {
		let scope = entity::canonical_entity_id(entity_context).unwrap_or_else(|| "global".to_string());

		format!("{}:semantic:{}", self.prefix, blake3::hash(scope.as_bytes()).to_hex())
	}

	pub async fn lookup<T>(
		&self,
		entity_context: Option<&str>,
		embedding: &[f32],
		now: OffsetDateTime,
	) -> Option<SemanticHit<T>>
	where
		T: DeserializeOwned,
	{
		let bucket: Bucket<T> = self.load_bucket(entity_context).await?;
		let (index, similarity) = best_match(&bucket, embedding, self.threshold, now)?;
		let entry = bucket.into_iter().nth(index)?;

		tracing::debug!(similarity, cached_query = %entry.query, "Semantic cache hit.");

		Some(SemanticHit { query: entry.query, similarity, result: entry.result })
	}

	/// Appends an entry to the bucket, dropping expired entries and the oldest beyond capacity.
	/// The bucket is stored for the longest entry TTL, never less than the floor.
	pub async fn insert<T>(
		&self,
		query: &str,
		entity_context: Option<&str>,
		embedding: Vec<f32>,
		result: T,
		now: OffsetDateTime,
	) where
		T: Serialize + DeserializeOwned,
	{
		let key = self.bucket_key(entity_context);
		let mut bucket: Bucket<T> = self.load_bucket(entity_context).await.unwrap_or_default();

		bucket.retain(|entry| entry.is_live_at(now));
		bucket.push(SemanticEntry {
			query: query.to_string(),
			embedding,
			entity_context: entity_context.map(str::to_string),
			result,
			timestamp: now,
			ttl_seconds: self.ttl.as_secs(),
		});

		let ttl = bucket
			.iter()
			.map(|entry| Duration::from_secs(entry.ttl_seconds))
			.max()
			.unwrap_or(self.ttl)
			.max(self.ttl_floor);
		let raw = match serde_json::to_string(&bucket) {
			Ok(raw) => raw,
			Err(err) => {
				tracing::warn!(error = %err, key = %key, "Failed to encode semantic bucket.");

				return;
			},
		};

		if let Err(err) = self.store.put(&key, raw, ttl).await {
			tracing::warn!(error = %err, key = %key, "Semantic cache write failed.");
		}
	}

	async fn load_bucket<T>(&self, entity_context: Option<&str>) -> Option<Bucket<T>>
	where
		T: DeserializeOwned,
	{
		let key = self.bucket_key(entity_context);
		let raw = match self.store.get(&key).await {
			Ok(raw) => raw?,
			Err(err) => {
				tracing::warn!(error = %err, key = %key, "Semantic cache read failed.");

				return None;
			},
		};

		match serde_json::from_str(&raw) {
			Ok(bucket) => Some(bucket),
			Err(err) => {
				tracing::warn!(error = %err, key = %key, "Semantic bucket is not decodable.");

				None
			},
		}
	}
}

/// Position and similarity of the most similar live entry at or above `threshold`. Ties go to the
/// older entry.
pub fn best_match<T>(
	bucket: &Bucket<T>,
	embedding: &[f32],
	threshold: f32,
	now: OffsetDateTime,
) -> Option<(usize, f32)> {
	bucket
		.iter()
		.enumerate()
		.filter(|(_, entry)| entry.is_live_at(now))
		.map(|(index, entry)| (index, similarity::cosine_similarity(&entry.embedding, embedding)))
		.filter(|(_, score)| *score >= threshold)
		.fold(None, |best: Option<(usize, f32)>, candidate| match best {
			Some(best) if best.1 >= candidate.1 => Some(best),
			_ => Some(candidate),
		})
}
