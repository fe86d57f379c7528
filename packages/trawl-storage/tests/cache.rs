use std::{
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, macros::datetime};

use trawl_storage::{
	BoxFuture, CacheScope, Error, ExactCache, KvStore, MemoryKv, Result, SemanticCache,
	semantic::{self, Bucket},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Payload {
	answer: String,
}

const NOW: OffsetDateTime = datetime!(2026-03-01 12:00 UTC);

fn payload(answer: &str) -> Payload {
	Payload { answer: answer.to_string() }
}

struct FailingKv {
	calls: AtomicUsize,
}
impl KvStore for FailingKv {
	fn get<'a>(&'a self, _key: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
		Box::pin(async move {
			self.calls.fetch_add(1, Ordering::SeqCst);

			Err(Error::Store { message: "unavailable".to_string() })
		})
	}

	fn put<'a>(&'a self, _key: &'a str, _value: String, _ttl: Duration) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			self.calls.fetch_add(1, Ordering::SeqCst);

			Err(Error::Store { message: "unavailable".to_string() })
		})
	}

	fn delete<'a>(&'a self, _key: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(()) })
	}
}

fn exact(ttl_secs: u64) -> ExactCache {
	ExactCache::new(Arc::new(MemoryKv::default()), "test", Duration::from_secs(ttl_secs))
}

fn semantic_cache(store: Arc<dyn KvStore>) -> SemanticCache {
	SemanticCache::new(store, "test", 0.92, Duration::from_secs(3_600), Duration::from_secs(600))
}

#[tokio::test]
async fn exact_round_trip_until_expiry() {
	let cache = exact(60);

	cache.put_at("Ever Given owner?", None, CacheScope::SubQuery, &payload("Shoei Kisen"), NOW).await;

	let hit = cache
		.get_at::<Payload>("ever  given OWNER", None, CacheScope::SubQuery, NOW + Duration::from_secs(59))
		.await
		.expect("Entry must be served before expiry.");

	assert_eq!(hit.payload, payload("Shoei Kisen"));
	assert_eq!(hit.cached_at, NOW);
	assert!(
		cache
			.get_at::<Payload>("Ever Given owner", None, CacheScope::SubQuery, NOW + Duration::from_secs(60))
			.await
			.is_none()
	);
}

#[tokio::test]
async fn exact_keys_follow_canonical_entity_not_context_text() {
	let cache = exact(60);
	let first = Some("Vessel: EVER GIVEN (IMO 9811000), discussed earlier today");
	let second = Some("IMO: 9811000");

	assert_eq!(
		cache.key("tonnage", first, CacheScope::SubQuery),
		cache.key("tonnage", second, CacheScope::SubQuery)
	);
	assert_ne!(
		cache.key("tonnage", first, CacheScope::SubQuery),
		cache.key("tonnage", None, CacheScope::SubQuery)
	);
	assert_ne!(
		cache.key("tonnage", None, CacheScope::SubQuery),
		cache.key("tonnage", None, CacheScope::Result)
	);
}

#[tokio::test]
async fn store_failures_degrade_to_misses() {
	let store = Arc::new(FailingKv { calls: AtomicUsize::new(0) });
	let cache = ExactCache::new(store.clone(), "test", Duration::from_secs(60));

	cache.put("q", None, CacheScope::SubQuery, &payload("a")).await;

	assert!(cache.get::<Payload>("q", None, CacheScope::SubQuery).await.is_none());
	assert_eq!(store.calls.load(Ordering::SeqCst), 2);

	let semantic = semantic_cache(store.clone());

	semantic.insert("q", None, vec![1.0, 0.0], payload("a"), NOW).await;

	assert!(semantic.lookup::<Payload>(None, &[1.0, 0.0], NOW).await.is_none());
}

#[tokio::test]
async fn semantic_hit_requires_threshold() {
	let cache = semantic_cache(Arc::new(MemoryKv::default()));

	cache.insert("Ever Given gross tonnage", None, vec![1.0, 0.0, 0.0], payload("219079"), NOW).await;

	let hit = cache
		.lookup::<Payload>(None, &[0.99, 0.05, 0.0], NOW)
		.await
		.expect("Near-identical embedding must hit.");

	assert_eq!(hit.result, payload("219079"));
	assert_eq!(hit.query, "Ever Given gross tonnage");
	assert!(hit.similarity > 0.99);
	assert!(cache.lookup::<Payload>(None, &[0.5, 0.5, 0.0], NOW).await.is_none());
}

#[tokio::test]
async fn semantic_buckets_are_scoped_by_entity() {
	let cache = semantic_cache(Arc::new(MemoryKv::default()));

	cache.insert("owner", Some("IMO 9811000"), vec![0.0, 1.0], payload("a"), NOW).await;

	assert!(cache.lookup::<Payload>(None, &[0.0, 1.0], NOW).await.is_none());
	assert!(cache.lookup::<Payload>(Some("imo no. 9811000"), &[0.0, 1.0], NOW).await.is_some());
}

#[tokio::test]
async fn semantic_entries_expire_by_their_own_ttl() {
	let cache = semantic_cache(Arc::new(MemoryKv::default()));

	cache.insert("owner", None, vec![0.0, 1.0], payload("a"), NOW).await;

	assert!(cache.lookup::<Payload>(None, &[0.0, 1.0], NOW + Duration::from_secs(3_599)).await.is_some());
	assert!(cache.lookup::<Payload>(None, &[0.0, 1.0], NOW + Duration::from_secs(3_600)).await.is_none());
}

#[tokio::test]
async fn semantic_bucket_never_exceeds_capacity() {
	let store = Arc::new(MemoryKv::default());
	let cache = semantic_cache(store.clone());

	for i in 0..25_u16 {
		let angle = f32::from(i) * 0.2;

		cache.insert(&format!("q{i}"), None, vec![angle.cos(), angle.sin()], payload(&i.to_string()), NOW).await;
	}

	let raw = store
		.get(&cache.bucket_key(None))
		.await
		.expect("Memory store never fails.")
		.expect("Bucket must exist.");
	let bucket: Bucket<Payload> = serde_json::from_str(&raw).expect("Bucket must decode.");

	assert_eq!(bucket.len(), semantic::BUCKET_CAPACITY);
	assert_eq!(bucket.iter().next().map(|entry| entry.query.as_str()), Some("q5"));
	assert!(cache.lookup::<Payload>(None, &[1.0, 0.0], NOW).await.is_none());
}

#[tokio::test]
async fn out_of_range_ttl_skips_the_write() {
	let store = Arc::new(MemoryKv::default());
	let cache = ExactCache::new(store.clone(), "test", Duration::from_secs(10_000_000_000_000));

	cache.put_at("Ever Given owner", None, CacheScope::SubQuery, &payload("Shoei Kisen"), NOW).await;

	assert!(store.is_empty());
	assert!(
		cache.get_at::<Payload>("Ever Given owner", None, CacheScope::SubQuery, NOW).await.is_none()
	);
}
