//! Bounded retries with capped exponential backoff, additive jitter, and a per-attempt deadline.
//!
//! The loop is generic over what an attempt yields so it can drive `reqwest` in production and
//! plain fakes in tests. A response whose status is retryable is retried while budget remains;
//! once the budget is spent the last response is handed back unchanged, and the last error is
//! returned as-is.

use std::{future::Future, time::Duration};

use rand::Rng;
use tokio::time;

/// Invoked before each backoff sleep.
pub type OnRetry<'a> = &'a (dyn Fn(&RetryEvent) + Send + Sync);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
	/// Retries after the first attempt. `retries = 2` allows three attempts in total.
	pub retries: u32,
	pub base_delay: Duration,
	pub max_delay: Duration,
	/// Deadline for a single attempt.
	pub timeout: Duration,
	pub retryable_statuses: Vec<u16>,
}
impl RetryPolicy {
	pub fn is_retryable_status(&self, status: u16) -> bool {
		self.retryable_statuses.contains(&status)
	}

	/// Same policy with the per-attempt deadline capped at `limit`.
	pub fn with_timeout_cap(&self, limit: Duration) -> Self {
		Self { timeout: self.timeout.min(limit), ..self.clone() }
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self::from(&trawl_config::Retry::default())
	}
}
impl From<&trawl_config::Retry> for RetryPolicy {
	fn from(cfg: &trawl_config::Retry) -> Self {
		Self {
			retries: cfg.retries,
			base_delay: Duration::from_millis(cfg.base_delay_ms),
			max_delay: Duration::from_millis(cfg.max_delay_ms),
			timeout: Duration::from_millis(cfg.timeout_ms),
			retryable_statuses: cfg.retryable_statuses.clone(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryReason {
	Status(u16),
	Timeout,
	Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryEvent {
	/// Zero-based index of the attempt that failed.
	pub attempt: u32,
	pub delay: Duration,
	pub reason: RetryReason,
}

#[derive(Debug, thiserror::Error)]
pub enum RetryError<E>
where
	E: std::error::Error + 'static,
{
	#[error("Request timed out after {attempts} attempt(s).")]
	Timeout { attempts: u32 },
	#[error("Request failed after {attempts} attempt(s): {source}")]
	Transport {
		attempts: u32,
		#[source]
		source: E,
	},
}

/// Anything carrying an HTTP status.
pub trait HasStatus {
	fn status_code(&self) -> u16;
}
impl HasStatus for reqwest::Response {
	fn status_code(&self) -> u16 {
		self.status().as_u16()
	}
}

/// Errors that are worth another attempt.
pub trait Transient {
	fn is_transient(&self) -> bool;
}
impl Transient for reqwest::Error {
	fn is_transient(&self) -> bool {
		self.is_timeout() || self.is_connect() || self.is_request() || self.is_body()
	}
}

/// `min(max_delay, 2^attempt * base + jitter)`.
pub fn backoff_delay(policy: &RetryPolicy, attempt: u32, jitter: Duration) -> Duration {
	let base_ms = policy.base_delay.as_millis().min(u128::from(u64::MAX)) as u64;
	let exp = base_ms.saturating_mul(1_u64 << attempt.min(20));
	let jitter_ms = jitter.as_millis().min(u128::from(u64::MAX)) as u64;
	let delay = Duration::from_millis(exp.saturating_add(jitter_ms));

	delay.min(policy.max_delay)
}

/// Uniform jitter in `[0, base]`.
pub fn sample_jitter(base: Duration) -> Duration {
	let base_ms = base.as_millis().min(u128::from(u64::MAX)) as u64;

	if base_ms == 0 {
		return Duration::ZERO;
	}

	Duration::from_millis(rand::thread_rng().gen_range(0..=base_ms))
}

pub async fn send_with_retry<T, E, F, Fut>(
	policy: &RetryPolicy,
	on_retry: Option<OnRetry<'_>>,
	mut attempt: F,
) -> Result<T, RetryError<E>>
where
	T: HasStatus,
	E: Transient + std::error::Error + 'static,
	F: FnMut(u32) -> Fut,
	Fut: Future<Output = Result<T, E>>,
{
	let mut index = 0_u32;

	loop {
		let outcome = time::timeout(policy.timeout, attempt(index)).await;
		let has_budget = index < policy.retries;
		let reason = match outcome {
			Ok(Ok(response)) => {
				let status = response.status_code();

				if !has_budget || !policy.is_retryable_status(status) {
					return Ok(response);
				}

				RetryReason::Status(status)
			},
			Ok(Err(err)) => {
				if !has_budget || !err.is_transient() {
					return Err(RetryError::Transport { attempts: index + 1, source: err });
				}

				RetryReason::Transport(err.to_string())
			},
			Err(_) => {
				if !has_budget {
					return Err(RetryError::Timeout { attempts: index + 1 });
				}

				RetryReason::Timeout
			},
		};
		let delay = backoff_delay(policy, index, sample_jitter(policy.base_delay));

		tracing::warn!(attempt = index, delay_ms = delay.as_millis() as u64, reason = ?reason, "Retrying request.");

		if let Some(on_retry) = on_retry {
			on_retry(&RetryEvent { attempt: index, delay, reason });
		}

		time::sleep(delay).await;

		index += 1;
	}
}

#[cfg(test)]
mod tests {
	use std::sync::{
		Arc, Mutex,
		atomic::{AtomicU32, Ordering},
	};

	use super::*;

	#[derive(Debug)]
	struct FakeResponse(u16);
	impl HasStatus for FakeResponse {
		fn status_code(&self) -> u16 {
			self.0
		}
	}

	#[derive(Debug, thiserror::Error)]
	#[error("fake failure (transient: {0})")]
	struct FakeError(bool);
	impl Transient for FakeError {
		fn is_transient(&self) -> bool {
			self.0
		}
	}

	fn policy(retries: u32) -> RetryPolicy {
		RetryPolicy {
			retries,
			base_delay: Duration::from_millis(100),
			max_delay: Duration::from_millis(1_000),
			timeout: Duration::from_millis(500),
			retryable_statuses: vec![408, 429, 500, 502, 503, 504],
		}
	}

	#[test]
	fn backoff_grows_exponentially_and_caps() {
		let policy = policy(5);

		assert_eq!(backoff_delay(&policy, 0, Duration::ZERO), Duration::from_millis(100));
		assert_eq!(backoff_delay(&policy, 1, Duration::from_millis(50)), Duration::from_millis(250));
		assert_eq!(backoff_delay(&policy, 3, Duration::ZERO), Duration::from_millis(800));
		assert_eq!(backoff_delay(&policy, 4, Duration::ZERO), Duration::from_millis(1_000));
		assert_eq!(backoff_delay(&policy, 60, Duration::from_millis(99)), Duration::from_millis(1_000));
	}

	#[test]
	fn jitter_stays_within_base() {
		for _ in 0..100 {
			assert!(sample_jitter(Duration::from_millis(20)) <= Duration::from_millis(20));
		}

		assert_eq!(sample_jitter(Duration::ZERO), Duration::ZERO);
	}

	#[tokio::test(start_paused = true)]
	async fn retries_retryable_status_until_success() {
		let calls = AtomicU32::new(0);
		let result = send_with_retry(&policy(3), None, |_| {
			let n = calls.fetch_add(1, Ordering::SeqCst);

			async move {
				Ok::<_, FakeError>(FakeResponse(if n < 2 { 503 } else { 200 }))
			}
		})
		.await
		.expect("Retry loop must succeed.");

		assert_eq!(result.0, 200);
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test(start_paused = true)]
	async fn returns_last_response_when_budget_is_exhausted() {
		let calls = AtomicU32::new(0);
		let result = send_with_retry(&policy(2), None, |_| {
			calls.fetch_add(1, Ordering::SeqCst);

			async { Ok::<_, FakeError>(FakeResponse(429)) }
		})
		.await
		.expect("Exhausted retries must hand back the last response.");

		assert_eq!(result.0, 429);
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test(start_paused = true)]
	async fn does_not_retry_client_errors() {
		let calls = AtomicU32::new(0);
		let result = send_with_retry(&policy(3), None, |_| {
			calls.fetch_add(1, Ordering::SeqCst);

			async { Ok::<_, FakeError>(FakeResponse(404)) }
		})
		.await
		.expect("A 404 is a response, not an error.");

		assert_eq!(result.0, 404);
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn non_transient_errors_fail_immediately() {
		let calls = AtomicU32::new(0);
		let err = send_with_retry(&policy(3), None, |_| {
			calls.fetch_add(1, Ordering::SeqCst);

			async { Err::<FakeResponse, _>(FakeError(false)) }
		})
		.await
		.expect_err("Non-transient error must surface.");

		assert!(matches!(err, RetryError::Transport { attempts: 1, .. }));
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn slow_attempts_time_out_and_surface_after_retries() {
		let events = Arc::new(Mutex::new(Vec::new()));
		let sink = events.clone();
		let on_retry = move |event: &RetryEvent| {
			sink.lock().unwrap_or_else(|err| err.into_inner()).push(event.clone());
		};
		let err = send_with_retry(&policy(2), Some(&on_retry), |_| async {
			time::sleep(Duration::from_secs(60)).await;

			Ok::<_, FakeError>(FakeResponse(200))
		})
		.await
		.expect_err("Every attempt times out.");

		assert!(matches!(err, RetryError::Timeout { attempts: 3 }));

		let events = events.lock().unwrap_or_else(|err| err.into_inner());

		assert_eq!(events.len(), 2);
		assert!(events.iter().all(|event| event.reason == RetryReason::Timeout));
		assert!(events[1].delay >= Duration::from_millis(200));
	}

	#[tokio::test(start_paused = true)]
	async fn transient_errors_are_retried() {
		let calls = AtomicU32::new(0);
		let result = send_with_retry(&policy(2), None, |_| {
			let n = calls.fetch_add(1, Ordering::SeqCst);

			async move {
				if n == 0 { Err(FakeError(true)) } else { Ok(FakeResponse(200)) }
			}
		})
		.await
		.expect("Second attempt succeeds.");

		assert_eq!(result.0, 200);
	}
}
