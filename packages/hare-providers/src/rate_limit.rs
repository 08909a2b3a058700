use std::{
	collections::VecDeque,
	sync::{Mutex, MutexGuard},
	time::Duration,
};

use tokio::time::Instant;
use tracing::debug;

/// Sliding-window limiter for outbound provider calls. Each `acquire` prunes timestamps older
/// than the window, then either records a call or sleeps until the oldest one expires and
/// checks again. The lock is never held across the sleep.
#[derive(Debug)]
pub struct RateLimiter {
	max_calls: usize,
	window: Duration,
	calls: Mutex<VecDeque<Instant>>,
}
impl RateLimiter {
	pub fn new(max_calls: u32, window: Duration) -> Self {
		let max_calls = (max_calls as usize).max(1);

		Self { max_calls, window, calls: Mutex::new(VecDeque::with_capacity(max_calls)) }
	}

	/// `None` when rate limiting is disabled.
	pub fn from_config(cfg: &hare_config::RateLimit) -> Option<Self> {
		cfg.enabled.then(|| Self::new(cfg.max_calls, Duration::from_millis(cfg.window_ms)))
	}

	pub async fn acquire(&self) {
		loop {
			let wait = {
				let mut calls = self.lock();
				let now = Instant::now();

				while calls.front().is_some_and(|oldest| now.duration_since(*oldest) >= self.window) {
					calls.pop_front();
				}

				if calls.len() < self.max_calls {
					calls.push_back(now);

					return;
				}

				calls
					.front()
					.map(|oldest| self.window.saturating_sub(now.duration_since(*oldest)))
					.unwrap_or(self.window)
			};

			debug!(wait_ms = wait.as_millis() as u64, "Rate limit reached. Waiting for a slot.");

			tokio::time::sleep(wait).await;
		}
	}

	/// Calls recorded inside the current window.
	pub fn recent_calls(&self) -> usize {
		let mut calls = self.lock();
		let now = Instant::now();

		calls.retain(|call| now.duration_since(*call) < self.window);

		calls.len()
	}

	pub fn reset(&self) {
		self.lock().clear();
	}

	fn lock(&self) -> MutexGuard<'_, VecDeque<Instant>> {
		self.calls.lock().unwrap_or_else(|err| err.into_inner())
	}
}
