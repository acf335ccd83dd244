//! Process-wide outbound rate limiter
//!
//! One [`RateLimiter`] is created at startup and shared (via `Arc`) by every
//! outbound call, whatever the operation. It enforces a minimum spacing between
//! send instants; there is no per-endpoint limiting.

use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

/// Gate enforcing a minimum interval between outbound requests
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    /// Send instant of the most recent request
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits until a request may be sent and records the send instant
    ///
    /// The lock is held across the sleep, so concurrent callers are admitted one
    /// at a time and never act on the same stale timestamp. Only callers of
    /// `wait` queue here; other tasks keep running.
    pub async fn wait(&self) -> Instant {
        let mut last = self.last_request.lock().await;

        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let delay = self.min_interval - elapsed;
                tracing::trace!(delay_ms = delay.as_millis() as u64, "Rate limiting request");
                sleep(delay).await;
            }
        }

        let now = Instant::now();
        *last = Some(now);
        now
    }
}
