//! Bounded retry with linear backoff and offline fallback

use crate::{
    cache::{OfflineCache, TtlCache},
    cache_key::CacheKey,
    error::FetchError,
    types::{Fetched, Origin},
};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Runs a single outbound call up to `max_attempts` times
///
/// Failed attempt `n` is followed by a pause of `n * base_delay`. A success is
/// written to both caches when a key is given. Once the budget is spent the
/// offline copy for the key is served, if there is one; otherwise the call
/// fails with [`FetchError::ExhaustedRetries`]. Errors that are not retryable
/// (see [`FetchError::is_retryable`]) are returned at once.
pub struct RetryExecutor {
    max_attempts: u32,
    base_delay: Duration,
    cache: Arc<TtlCache<Value>>,
    offline: Arc<OfflineCache>,
}

impl RetryExecutor {
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        cache: Arc<TtlCache<Value>>,
        offline: Arc<OfflineCache>,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            cache,
            offline,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Executes `attempt_fn` with retries
    ///
    /// `attempt_fn` must perform exactly one outbound call per invocation.
    pub async fn execute<F, Fut>(
        &self,
        key: Option<&CacheKey>,
        mut attempt_fn: F,
    ) -> Result<Fetched<Value>, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Value, FetchError>>,
    {
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            match attempt_fn().await {
                Ok(value) => {
                    if let Some(key) = key {
                        self.store(key, &value).await;
                    }
                    return Ok(Fetched::new(value, Origin::Live));
                }
                Err(e) if !e.is_retryable() => {
                    tracing::debug!(
                        attempt = attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "Request failed with a non-retryable error"
                    );
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "Request failed ({}/{})",
                        attempt,
                        self.max_attempts
                    );
                    last_error = Some(e);

                    if attempt < self.max_attempts {
                        sleep(self.backoff(attempt)).await;
                    }
                }
            }
        }

        if let Some(key) = key {
            if let Some(entry) = self.offline.get(key).await {
                tracing::warn!(
                    cache_key = %key,
                    captured_at = %entry.captured_at,
                    "Serving data from offline cache"
                );
                return Ok(Fetched::new(
                    entry.value,
                    Origin::Offline {
                        captured_at: entry.captured_at,
                    },
                ));
            }
        }

        // The loop runs at least once, so a failure has been recorded
        let last = last_error
            .unwrap_or_else(|| FetchError::invalid_response("no attempt was made"));
        Err(FetchError::ExhaustedRetries {
            attempts: self.max_attempts,
            last: Box::new(last),
        })
    }

    /// Pause after failed attempt `attempt`, saturating at `Duration::MAX`
    fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Writes a fresh payload to both caches; offline persistence is best-effort
    async fn store(&self, key: &CacheKey, value: &Value) {
        self.cache.set(key.clone(), value.clone()).await;

        if let Err(e) = self.offline.set(key, value.clone()).await {
            tracing::warn!(cache_key = %key, error = %e, "Failed to persist offline cache");
        }
    }
}
