use std::{fmt::Display, future::Future, time::Duration};

use tracing::warn;

/// Errors that can tell a transient failure from a permanent one.
pub trait Retryable {
	fn is_retryable(&self) -> bool;
}
impl Retryable for crate::Error {
	fn is_retryable(&self) -> bool {
		crate::Error::is_retryable(self)
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
	/// Total attempts, the first call included.
	pub max_attempts: u32,
	pub base_delay: Duration,
	pub max_delay: Duration,
}
impl RetryPolicy {
	/// `base · 2^attempt`, capped. `attempt` is 0-based.
	pub fn delay_for(&self, attempt: u32) -> Duration {
		let factor = 2_u32.checked_pow(attempt).unwrap_or(u32::MAX);

		self.base_delay.saturating_mul(factor).min(self.max_delay)
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			base_delay: Duration::from_millis(500),
			max_delay: Duration::from_millis(30_000),
		}
	}
}
impl From<&hare_config::Retry> for RetryPolicy {
	fn from(cfg: &hare_config::Retry) -> Self {
		Self {
			max_attempts: cfg.max_attempts.max(1),
			base_delay: Duration::from_millis(cfg.base_delay_ms),
			max_delay: Duration::from_millis(cfg.max_delay_ms),
		}
	}
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or the attempts run out.
/// The last error is returned unchanged.
pub async fn with_retry<T, E, F, Fut>(policy: RetryPolicy, label: &str, mut op: F) -> Result<T, E>
where
	E: Retryable + Display,
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T, E>>,
{
	let mut attempt = 0;

	loop {
		match op().await {
			Ok(value) => return Ok(value),
			Err(err) if err.is_retryable() && attempt + 1 < policy.max_attempts => {
				let delay = policy.delay_for(attempt);

				warn!(
					operation = label,
					attempt = attempt + 1,
					max_attempts = policy.max_attempts,
					delay_ms = delay.as_millis() as u64,
					error = %err,
					"Retrying after transient failure."
				);

				tokio::time::sleep(delay).await;

				attempt += 1;
			},
			Err(err) => return Err(err),
		}
	}
}
