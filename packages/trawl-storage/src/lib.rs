//! Key-value backends and the two cache tiers built on top of them.

pub mod exact;
pub mod http_kv;
pub mod kv;
pub mod ring;
pub mod semantic;
pub mod time_serde;

mod error;

pub use error::Error;
pub use exact::{CacheEntry, CacheScope, ExactCache};
pub use http_kv::HttpKv;
pub use kv::{BoxFuture, KvStore, MemoryKv};
pub use ring::BoundedRing;
pub use semantic::{SemanticCache, SemanticEntry, SemanticHit};

pub type Result<T, E = Error> = std::result::Result<T, E>;

use std::sync::Arc;

/// Builds the backend named by `cache.store.kind`.
pub fn store_from_config(
	cfg: &trawl_config::CacheStore,
	retry: &trawl_providers::RetryPolicy,
) -> Result<Arc<dyn KvStore>> {
	match cfg.kind.as_str() {
		"memory" => Ok(Arc::new(MemoryKv::default())),
		"http" => Ok(Arc::new(HttpKv::new(cfg, retry.clone())?)),
		other => Err(Error::InvalidConfig { message: format!("Unknown store kind {other}.") }),
	}
}
