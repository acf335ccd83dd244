//! Free-form coin lookup
//!
//! Turns user input such as `btc`, `Bitcoin` or `bitcoin` into a [`CoinRef`].

use crate::{
    cache::TtlCache,
    cache_key::{normalize, CacheKey},
    constants::RESOLVER_TTL_MULTIPLIER,
    error::FetchError,
    service::MarketDataService,
    types::{CoinRef, SearchCoin},
};
use std::sync::Arc;

/// Resolves ids, symbols and names to a coin identity
///
/// A direct detail lookup by id is tried first; when the id is unknown the
/// search endpoint is consulted, preferring an exact id match, then an exact
/// symbol match, then the top result. Hits are kept for five times the
/// service's cache TTL.
pub struct CoinResolver {
    service: Arc<MarketDataService>,
    cache: TtlCache<CoinRef>,
}

impl CoinResolver {
    pub fn new(service: Arc<MarketDataService>) -> Self {
        let ttl = service
            .config()
            .cache_ttl
            .saturating_mul(RESOLVER_TTL_MULTIPLIER);
        Self {
            service,
            cache: TtlCache::new(ttl),
        }
    }

    /// Resolves `input` to a coin
    ///
    /// Returns `Ok(None)` when nothing matches. Failures other than
    /// [`FetchError::NotFound`] are propagated.
    pub async fn resolve(&self, input: &str) -> Result<Option<CoinRef>, FetchError> {
        let query = normalize(input);
        if query.is_empty() {
            return Ok(None);
        }

        let key = CacheKey::coin_resolve(&query);
        if let Some(coin) = self.cache.get(&key).await {
            return Ok(Some(coin));
        }

        let resolved = match self.by_id(&query).await? {
            Some(coin) => Some(coin),
            None => self.by_search(&query).await?,
        };

        match &resolved {
            Some(coin) => {
                tracing::debug!(input = %query, id = %coin.id, "Resolved coin");
                self.cache.set(key, coin.clone()).await;
            }
            None => tracing::debug!(input = %query, "No coin matches input"),
        }
        Ok(resolved)
    }

    async fn by_id(&self, id: &str) -> Result<Option<CoinRef>, FetchError> {
        match self.service.coin_detail(id).await {
            Ok(detail) => Ok(Some(CoinRef {
                id: detail.data.id,
                symbol: detail.data.symbol,
                name: detail.data.name,
            })),
            Err(FetchError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn by_search(&self, query: &str) -> Result<Option<CoinRef>, FetchError> {
        let results = match self.service.search(query).await {
            Ok(results) => results.data,
            Err(FetchError::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        Ok(best_match(&results.coins, query).map(|coin| CoinRef {
            id: coin.id.clone(),
            symbol: coin.symbol.clone(),
            name: coin.name.clone(),
        }))
    }
}

/// Exact id match, then exact symbol match, then the first result
fn best_match<'a>(coins: &'a [SearchCoin], query: &str) -> Option<&'a SearchCoin> {
    coins
        .iter()
        .find(|coin| coin.id.eq_ignore_ascii_case(query))
        .or_else(|| {
            coins
                .iter()
                .find(|coin| coin.symbol.eq_ignore_ascii_case(query))
        })
        .or_else(|| coins.first())
}
