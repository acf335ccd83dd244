//! # Crypto Tracker
//!
//! Cached, rate-limited, retrying client for the CoinGecko market data API.
//!
//! ## Request flow
//!
//! Every operation on [`MarketDataService`] builds a normalized [`CacheKey`]
//! and checks a short-lived in-memory cache first. On a miss the request waits
//! for the process-wide [`RateLimiter`], goes out through a [`Transport`] and is
//! retried with linear backoff. A success lands in the memory cache and in the
//! on-disk offline cache; when every attempt fails the offline copy is served
//! instead, tagged with [`Origin::Offline`].
//!
//! ## Usage
//!
//! ```no_run
//! use crypto_tracker::{FetchConfig, MarketDataService};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = MarketDataService::new(FetchConfig::from_env())?;
//!
//! let prices = service.simple_price(&["bitcoin", "ethereum"], &["usd"]).await?;
//! if prices.origin.is_offline() {
//!     eprintln!("showing cached prices");
//! }
//! for (id, quotes) in &prices.data {
//!     println!("{}: {:?}", id, quotes.get("usd"));
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod cache_key;
pub mod config;
pub mod constants;
pub mod error;
pub mod metrics;
pub mod rate_limiter;
pub mod resolver;
pub mod retry;
pub mod service;
pub mod transport;
pub mod transports;
pub mod types;

// Re-export commonly used types
pub use cache_key::CacheKey;
pub use config::FetchConfig;
pub use error::{FetchError, OfflineCacheError};
pub use metrics::FetchMetrics;
pub use rate_limiter::RateLimiter;
pub use resolver::CoinResolver;
pub use service::MarketDataService;
pub use transport::{RequestDescriptor, Transport};
pub use types::{
    CoinDetail, CoinRef, Fetched, MarketChart, MarketCoin, MarketOrder, MarketsQuery, Origin,
    SearchResults, SimplePrice, Trending,
};
