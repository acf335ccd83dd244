//! Market data service
//!
//! Public entry point of the fetch layer. Every operation builds a
//! [`CacheKey`], answers from the in-memory cache when it can and otherwise
//! drives rate limiter → transport through the [`RetryExecutor`].

use crate::{
    cache::{OfflineCache, TtlCache},
    cache_key::{normalize, normalize_list, CacheKey},
    config::FetchConfig,
    error::FetchError,
    metrics::{FetchMetrics, MetricsCollector},
    rate_limiter::RateLimiter,
    retry::RetryExecutor,
    transport::{RequestDescriptor, Transport},
    transports::CoinGeckoTransport,
    types::{
        CoinDetail, Fetched, MarketChart, MarketCoin, MarketsQuery, Origin, SearchResults,
        SimplePrice, Trending,
    },
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// Cached, rate-limited, retrying client for the market data provider
///
/// Construct one per process and share it by `Arc`. The rate limiter and both
/// caches live for as long as the service.
///
/// # Example
/// ```no_run
/// use crypto_tracker::{FetchConfig, MarketDataService, MarketsQuery};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let service = MarketDataService::new(FetchConfig::from_env())?;
/// let top = service.markets(&MarketsQuery::new("usd").per_page(10)).await?;
/// for coin in &top.data {
///     println!("{}: {:?}", coin.symbol, coin.current_price);
/// }
/// # Ok(())
/// # }
/// ```
pub struct MarketDataService {
    config: FetchConfig,
    transport: Arc<dyn Transport>,
    limiter: Arc<RateLimiter>,
    cache: Arc<TtlCache<Value>>,
    retry: RetryExecutor,
    metrics: MetricsCollector,
}

impl MarketDataService {
    /// Creates a service talking to the configured CoinGecko endpoint
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let config = config.normalized();
        let transport = Arc::new(CoinGeckoTransport::new(
            &config.base_url,
            config.request_timeout,
        )?);
        let limiter = Arc::new(RateLimiter::new(config.rate_limit_interval));
        let offline = Arc::new(match &config.offline_cache_path {
            Some(path) => OfflineCache::open(path),
            None => OfflineCache::in_memory(),
        });

        Ok(Self::with_parts(config, transport, limiter, offline))
    }

    /// Creates a service from explicit collaborators
    ///
    /// Use this to share one rate limiter between services or to plug in a
    /// different transport.
    pub fn with_parts(
        config: FetchConfig,
        transport: Arc<dyn Transport>,
        limiter: Arc<RateLimiter>,
        offline: Arc<OfflineCache>,
    ) -> Self {
        let config = config.normalized();
        let cache = Arc::new(TtlCache::new(config.cache_ttl));
        let retry = RetryExecutor::new(
            config.max_attempts,
            config.retry_base_delay,
            cache.clone(),
            offline,
        );
        let metrics = MetricsCollector::new(transport.name());

        Self {
            config,
            transport,
            limiter,
            cache,
            retry,
            metrics,
        }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Shared handle to the outbound rate limiter
    pub fn limiter(&self) -> Arc<RateLimiter> {
        self.limiter.clone()
    }

    /// Drops every in-memory entry; the offline cache is untouched
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    pub async fn metrics(&self) -> FetchMetrics {
        self.metrics.snapshot().await
    }

    /// Market listing for a quote currency, page and ordering
    pub async fn markets(&self, query: &MarketsQuery) -> Result<Fetched<Vec<MarketCoin>>, FetchError> {
        let key = CacheKey::markets(query);
        let ids = query
            .ids
            .as_deref()
            .map(normalize_list)
            .filter(|ids| !ids.is_empty())
            .map(|ids| ids.join(","));

        let request = self
            .request("/coins/markets")
            .param("vs_currency", normalize(&query.vs_currency))
            .param("order", query.order)
            .param("per_page", query.per_page)
            .param("page", query.page)
            .param_opt("ids", ids)
            .param("price_change_percentage", "24h");

        self.fetch(key, request).await
    }

    /// Free-text search over coins
    ///
    /// A query with no matching coin fails with [`FetchError::NotFound`].
    pub async fn search(&self, query: &str) -> Result<Fetched<SearchResults>, FetchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(FetchError::not_found("search: empty query"));
        }

        let key = CacheKey::search(query);
        let request = self.request("/search").param("query", query);

        let results: Fetched<SearchResults> = self.fetch(key, request).await?;
        if results.data.coins.is_empty() {
            return Err(FetchError::not_found(format!("search: {}", query)));
        }
        Ok(results)
    }

    /// Detail record for a single coin id
    pub async fn coin_detail(&self, id: &str) -> Result<Fetched<CoinDetail>, FetchError> {
        let id = normalize(id);
        if id.is_empty() {
            return Err(FetchError::not_found("coin: empty id"));
        }

        let key = CacheKey::coin_detail(&id);
        let request = self
            .request(format!("/coins/{}", id))
            .param("localization", false)
            .param("tickers", false)
            .param("market_data", true)
            .param("community_data", false)
            .param("developer_data", false)
            .param("sparkline", false);

        self.fetch(key, request).await
    }

    /// Historical prices for a coin over the last `days` days
    pub async fn market_chart(
        &self,
        id: &str,
        vs_currency: &str,
        days: u32,
    ) -> Result<Fetched<MarketChart>, FetchError> {
        let id = normalize(id);
        if id.is_empty() {
            return Err(FetchError::not_found("coin: empty id"));
        }

        let key = CacheKey::market_chart(&id, vs_currency, days);
        let request = self
            .request(format!("/coins/{}/market_chart", id))
            .param("vs_currency", normalize(vs_currency))
            .param("days", days);

        self.fetch(key, request).await
    }

    /// Currently trending coins
    pub async fn trending(&self) -> Result<Fetched<Trending>, FetchError> {
        let request = self.request("/search/trending");
        self.fetch(CacheKey::trending(), request).await
    }

    /// Spot rates for every id/currency pair
    pub async fn simple_price<A, B>(
        &self,
        ids: &[A],
        vs_currencies: &[B],
    ) -> Result<Fetched<SimplePrice>, FetchError>
    where
        A: AsRef<str>,
        B: AsRef<str>,
    {
        let key = CacheKey::simple_price(ids, vs_currencies);
        let request = self
            .request("/simple/price")
            .param("ids", normalize_list(ids).join(","))
            .param("vs_currencies", normalize_list(vs_currencies).join(","))
            .param("include_last_updated_at", true);

        self.fetch(key, request).await
    }

    fn request(&self, path: impl Into<String>) -> RequestDescriptor {
        RequestDescriptor::get(path, self.config.request_timeout)
    }

    /// Cache check, then retried rate-limited fetch on a miss
    ///
    /// Only payloads that decode as `T` are accepted by an attempt, so a body
    /// of the wrong shape is retried and never reaches either cache.
    async fn fetch<T: DeserializeOwned>(
        &self,
        key: CacheKey,
        request: RequestDescriptor,
    ) -> Result<Fetched<T>, FetchError> {
        if let Some(value) = self.cache.get(&key).await {
            tracing::debug!(cache_key = %key, "Cache hit");
            self.metrics.record_memory_hit().await;
            return decode(Fetched::new(value, Origin::Memory));
        }

        tracing::debug!(cache_key = %key, path = %request.path, "Cache miss");
        let fetched = self
            .retry
            .execute(Some(&key), || self.send::<T>(&request))
            .await?;

        if fetched.origin.is_offline() {
            self.metrics.record_offline_served().await;
        }
        decode(fetched)
    }

    /// One outbound call: wait for the rate limiter, hit the transport and
    /// check the body decodes as `T`
    async fn send<T: DeserializeOwned>(
        &self,
        request: &RequestDescriptor,
    ) -> Result<Value, FetchError> {
        self.limiter.wait().await;

        let start = Instant::now();
        let result = self
            .transport
            .get(request)
            .await
            .and_then(|value| check_shape::<T>(&value).map(|()| value));
        self.metrics
            .record_attempt(start.elapsed(), result.is_ok())
            .await;
        result
    }
}

fn check_shape<T: DeserializeOwned>(value: &Value) -> Result<(), FetchError> {
    T::deserialize(value).map(drop).map_err(shape_error)
}

fn decode<T: DeserializeOwned>(fetched: Fetched<Value>) -> Result<Fetched<T>, FetchError> {
    fetched.try_map(|value| serde_json::from_value(value).map_err(shape_error))
}

fn shape_error(e: serde_json::Error) -> FetchError {
    FetchError::invalid_response(format!("Unexpected payload shape: {}", e))
}
