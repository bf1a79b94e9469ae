//! Bounded retries with linear backoff.

use crate::{ClientError, ErrorKind};
use std::future::Future;
use std::time::Duration;

/// Default number of attempts for read calls.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Default delay unit between attempts.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(100);

/// Retries an operation while it fails with one designated error kind.
///
/// Between attempt `n` and `n + 1` the policy sleeps `base_delay * n`. Any
/// other error kind is returned immediately. When all attempts are used up
/// the last error is returned as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
	max_attempts: u32,
	base_delay: Duration,
	retryable: ErrorKind,
}

impl RetryPolicy {
	/// Creates a policy; `max_attempts` is raised to 1 if zero.
	pub fn new(max_attempts: u32, base_delay: Duration, retryable: ErrorKind) -> Self {
		Self {
			max_attempts: max_attempts.max(1),
			base_delay,
			retryable,
		}
	}

	/// Creates a policy that retries stale responses only.
	pub fn stale_responses(max_attempts: u32, base_delay: Duration) -> Self {
		Self::new(max_attempts, base_delay, ErrorKind::StaleResponse)
	}

	pub fn max_attempts(&self) -> u32 {
		self.max_attempts
	}

	pub fn base_delay(&self) -> Duration {
		self.base_delay
	}

	pub fn retryable(&self) -> ErrorKind {
		self.retryable
	}

	/// Runs `operation` until it succeeds, fails with a non-retryable error,
	/// or `max_attempts` attempts have been made.
	pub async fn execute<T, F, Fut>(&self, mut operation: F) -> Result<T, ClientError>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<T, ClientError>>,
	{
		let mut attempt: u32 = 1;
		loop {
			match operation().await {
				Ok(value) => return Ok(value),
				Err(error) if error.kind() == self.retryable && attempt < self.max_attempts => {
					let delay = self.base_delay * attempt;
					tracing::warn!(
						attempt,
						max_attempts = self.max_attempts,
						delay_ms = delay.as_millis() as u64,
						error = %error,
						"Retrying after retryable error"
					);
					tokio::time::sleep(delay).await;
					attempt += 1;
				},
				Err(error) => return Err(error),
			}
		}
	}
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self::stale_responses(DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY)
	}
}
