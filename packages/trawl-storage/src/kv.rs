use std::{
	collections::HashMap,
	future::Future,
	pin::Pin,
	sync::{Mutex, PoisonError},
	time::Duration,
};

use tokio::time::Instant;

use crate::{Error, Result};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Eventually consistent string store with per-entry expiry.
pub trait KvStore
where
	Self: Send + Sync,
{
	fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>>>;

	fn put<'a>(&'a self, key: &'a str, value: String, ttl: Duration) -> BoxFuture<'a, Result<()>>;

	fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<()>>;
}

/// In-process store. Expired entries are dropped lazily on read.
#[derive(Debug, Default)]
pub struct MemoryKv {
	entries: Mutex<HashMap<String, (String, Instant)>>,
}
impl MemoryKv {
	pub fn len(&self) -> usize {
		let now = Instant::now();

		self.entries
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.values()
			.filter(|(_, expires_at)| *expires_at > now)
			.count()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn get_now(&self, key: &str) -> Option<String> {
		let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
		let (value, expires_at) = entries.get(key)?;

		if *expires_at <= Instant::now() {
			entries.remove(key);

			return None;
		}

		Some(value.clone())
	}
}
impl KvStore for MemoryKv {
	fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
		Box::pin(async move { Ok(self.get_now(key)) })
	}

	fn put<'a>(&'a self, key: &'a str, value: String, ttl: Duration) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let expires_at = Instant::now().checked_add(ttl).ok_or_else(|| Error::Store {
				message: format!("TTL of {} seconds is out of range.", ttl.as_secs()),
			})?;

			self.entries
				.lock()
				.unwrap_or_else(PoisonError::into_inner)
				.insert(key.to_string(), (value, expires_at));

			Ok(())
		})
	}

	fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			self.entries.lock().unwrap_or_else(PoisonError::into_inner).remove(key);

			Ok(())
		})
	}
}
