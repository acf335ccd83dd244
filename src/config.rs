//! Runtime configuration for the fetch layer
//!
//! Defaults come from [`crate::constants`]. [`FetchConfig::from_env`] overlays
//! environment variables on top; the `crypto` binary applies its flags last.

use crate::constants::{
    APP_NAME, CACHE_TTL_SECS, COINGECKO_API_URL, MAX_RETRY_ATTEMPTS, OFFLINE_CACHE_FILE,
    RATE_LIMIT_INTERVAL_MS, REQUEST_TIMEOUT_MS, RETRY_BASE_DELAY_MS,
};
use directories::ProjectDirs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Settings consumed by [`crate::service::MarketDataService`]
#[derive(Debug, Clone, PartialEq)]
pub struct FetchConfig {
    /// Base URL of the upstream REST API
    pub base_url: String,
    /// Lifetime of an in-memory cache entry
    pub cache_ttl: Duration,
    /// Minimum spacing between outbound requests
    pub rate_limit_interval: Duration,
    /// Timeout applied to each outbound request
    pub request_timeout: Duration,
    /// Maximum attempts per logical request (at least 1)
    pub max_attempts: u32,
    /// Base backoff delay between attempts
    pub retry_base_delay: Duration,
    /// Location of the offline cache file; `None` disables persistence
    pub offline_cache_path: Option<PathBuf>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: COINGECKO_API_URL.to_string(),
            cache_ttl: Duration::from_secs(CACHE_TTL_SECS),
            rate_limit_interval: Duration::from_millis(RATE_LIMIT_INTERVAL_MS),
            request_timeout: Duration::from_millis(REQUEST_TIMEOUT_MS),
            max_attempts: MAX_RETRY_ATTEMPTS,
            retry_base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
            offline_cache_path: default_offline_cache_path(),
        }
    }
}

impl FetchConfig {
    /// Default configuration with environment overrides applied
    ///
    /// Recognized variables:
    /// - `COINGECKO_BASE_URL`
    /// - `CRYPTO_CACHE_TTL_SECS`
    /// - `CRYPTO_RATE_LIMIT_MS`
    /// - `CRYPTO_REQUEST_TIMEOUT_MS`
    /// - `CRYPTO_RETRY_ATTEMPTS`
    /// - `CRYPTO_RETRY_DELAY_MS`
    /// - `CRYPTO_OFFLINE_CACHE` (path to the offline cache file)
    pub fn from_env() -> Self {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    /// Applies overrides from an arbitrary variable source
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("COINGECKO_BASE_URL") {
            self.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "CRYPTO_CACHE_TTL_SECS") {
            self.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "CRYPTO_RATE_LIMIT_MS") {
            self.rate_limit_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "CRYPTO_REQUEST_TIMEOUT_MS") {
            self.request_timeout = Duration::from_millis(ms);
        }
        if let Some(attempts) = parse_var::<u32>(&lookup, "CRYPTO_RETRY_ATTEMPTS") {
            self.max_attempts = attempts;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "CRYPTO_RETRY_DELAY_MS") {
            self.retry_base_delay = Duration::from_millis(ms);
        }
        if let Some(path) = lookup("CRYPTO_OFFLINE_CACHE") {
            self.offline_cache_path = Some(PathBuf::from(path));
        }
        self.normalized()
    }

    /// Clamps values that would make the fetch layer unusable
    pub fn normalized(mut self) -> Self {
        self.max_attempts = self.max_attempts.max(1);
        self
    }
}

/// Offline cache location under the platform cache directory
///
/// Returns `None` when no home directory can be determined.
pub fn default_offline_cache_path() -> Option<PathBuf> {
    let dirs = ProjectDirs::from("", "", APP_NAME)?;
    Some(dirs.cache_dir().join(OFFLINE_CACHE_FILE))
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(variable = name, value = %raw, "Ignoring unparseable setting");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_match_constants() {
        let config = FetchConfig::default();
        assert_eq!(config.base_url, COINGECKO_API_URL);
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.rate_limit_interval, Duration::from_millis(1500));
        assert_eq!(config.request_timeout, Duration::from_millis(10_000));
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retry_base_delay, Duration::from_millis(1000));
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = FetchConfig::default().with_overrides(lookup_from(&[
            ("COINGECKO_BASE_URL", "http://localhost:8080/api/"),
            ("CRYPTO_CACHE_TTL_SECS", "5"),
            ("CRYPTO_RATE_LIMIT_MS", "250"),
            ("CRYPTO_REQUEST_TIMEOUT_MS", "2000"),
            ("CRYPTO_RETRY_ATTEMPTS", "5"),
            ("CRYPTO_RETRY_DELAY_MS", "10"),
            ("CRYPTO_OFFLINE_CACHE", "/tmp/offline.json"),
        ]));

        assert_eq!(config.base_url, "http://localhost:8080/api");
        assert_eq!(config.cache_ttl, Duration::from_secs(5));
        assert_eq!(config.rate_limit_interval, Duration::from_millis(250));
        assert_eq!(config.request_timeout, Duration::from_millis(2000));
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.retry_base_delay, Duration::from_millis(10));
        assert_eq!(
            config.offline_cache_path,
            Some(PathBuf::from("/tmp/offline.json"))
        );
    }

    #[test]
    fn test_unparseable_values_are_ignored() {
        let config = FetchConfig::default()
            .with_overrides(lookup_from(&[("CRYPTO_CACHE_TTL_SECS", "soon")]));
        assert_eq!(config.cache_ttl, Duration::from_secs(CACHE_TTL_SECS));
    }

    #[test]
    fn test_zero_attempts_is_clamped() {
        let config =
            FetchConfig::default().with_overrides(lookup_from(&[("CRYPTO_RETRY_ATTEMPTS", "0")]));
        assert_eq!(config.max_attempts, 1);
    }
}
