//! Default settings for the fetch layer
//!
//! Every value here can be overridden at runtime through [`crate::config::FetchConfig`]
//! (environment variables or CLI flags).

/// CoinGecko API base URL
pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";

/// How long a response stays in the in-memory cache (in seconds)
pub const CACHE_TTL_SECS: u64 = 60;

/// Multiplier applied to the cache TTL for resolved coin identities
pub const RESOLVER_TTL_MULTIPLIER: u32 = 5;

/// Minimum spacing between two outbound requests (in milliseconds)
pub const RATE_LIMIT_INTERVAL_MS: u64 = 1500;

/// HTTP request timeout (in milliseconds)
pub const REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Maximum number of attempts per logical request
pub const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base backoff delay; attempt `n` waits `n * RETRY_BASE_DELAY_MS` before the next one
pub const RETRY_BASE_DELAY_MS: u64 = 1000;

/// Key prefix for records in the offline cache file
pub const OFFLINE_CACHE_KEY_PREFIX: &str = "offline-cache";

/// File name of the offline cache inside the platform cache directory
pub const OFFLINE_CACHE_FILE: &str = "offline-cache.json";

/// Application name used for platform directories
pub const APP_NAME: &str = "crypto-tracker";

/// User agent for HTTP requests
pub const USER_AGENT: &str = concat!("crypto-tracker/", env!("CARGO_PKG_VERSION"));

/// Default page size for market listings
pub const DEFAULT_PER_PAGE: u32 = 50;

/// Largest page size CoinGecko accepts for market listings
pub const MAX_PER_PAGE: u32 = 250;

/// Default day range for market charts
pub const DEFAULT_CHART_DAYS: u32 = 7;
