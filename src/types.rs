//! Types for the market data service

use crate::constants::DEFAULT_PER_PAGE;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Where a returned payload came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Origin {
    /// In-memory cache hit; no network activity
    Memory,
    /// Fresh response from the provider
    Live,
    /// Stale copy served from the offline cache after every attempt failed
    Offline { captured_at: DateTime<Utc> },
}

impl Origin {
    /// True when the payload is a degraded offline copy
    pub fn is_offline(&self) -> bool {
        matches!(self, Origin::Offline { .. })
    }
}

/// A payload together with its origin
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fetched<T> {
    pub data: T,
    pub origin: Origin,
}

impl<T> Fetched<T> {
    pub fn new(data: T, origin: Origin) -> Self {
        Self { data, origin }
    }

    /// Converts the payload while keeping the origin
    pub fn try_map<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<Fetched<U>, E> {
        Ok(Fetched {
            data: f(self.data)?,
            origin: self.origin,
        })
    }

    pub fn into_inner(self) -> T {
        self.data
    }
}

/// Sort order for market listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketOrder {
    #[default]
    MarketCapDesc,
    MarketCapAsc,
    VolumeDesc,
    VolumeAsc,
    IdDesc,
    IdAsc,
}

impl MarketOrder {
    /// Value of the `order` query parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketOrder::MarketCapDesc => "market_cap_desc",
            MarketOrder::MarketCapAsc => "market_cap_asc",
            MarketOrder::VolumeDesc => "volume_desc",
            MarketOrder::VolumeAsc => "volume_asc",
            MarketOrder::IdDesc => "id_desc",
            MarketOrder::IdAsc => "id_asc",
        }
    }
}

impl fmt::Display for MarketOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarketOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "market_cap_desc" => Ok(MarketOrder::MarketCapDesc),
            "market_cap_asc" => Ok(MarketOrder::MarketCapAsc),
            "volume_desc" => Ok(MarketOrder::VolumeDesc),
            "volume_asc" => Ok(MarketOrder::VolumeAsc),
            "id_desc" => Ok(MarketOrder::IdDesc),
            "id_asc" => Ok(MarketOrder::IdAsc),
            other => Err(format!(
                "unknown order '{}' (expected market_cap_desc, market_cap_asc, volume_desc, volume_asc, id_desc or id_asc)",
                other
            )),
        }
    }
}

/// Parameters of a market listing request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketsQuery {
    /// Quote currency (e.g. "usd")
    pub vs_currency: String,
    pub per_page: u32,
    /// 1-based page number
    pub page: u32,
    pub order: MarketOrder,
    /// Restrict the listing to these coin ids
    pub ids: Option<Vec<String>>,
}

impl MarketsQuery {
    /// Top coins by market cap in the given currency
    pub fn new(vs_currency: impl Into<String>) -> Self {
        Self {
            vs_currency: vs_currency.into(),
            per_page: DEFAULT_PER_PAGE,
            page: 1,
            order: MarketOrder::default(),
            ids: None,
        }
    }

    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn order(mut self, order: MarketOrder) -> Self {
        self.order = order;
        self
    }

    pub fn ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }
}

/// One row of the market listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketCoin {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub market_cap_rank: Option<u32>,
    pub total_volume: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
    pub ath: Option<f64>,
    pub ath_change_percentage: Option<f64>,
    pub atl: Option<f64>,
    pub atl_change_percentage: Option<f64>,
    pub circulating_supply: Option<f64>,
    pub total_supply: Option<f64>,
    pub max_supply: Option<f64>,
}

/// Search response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub coins: Vec<SearchCoin>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchCoin {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub market_cap_rank: Option<u32>,
}

/// Detail record for a single coin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinDetail {
    pub id: String,
    pub symbol: String,
    pub name: String,
    /// Free-text description keyed by language code
    #[serde(default)]
    pub description: HashMap<String, String>,
    pub market_cap_rank: Option<u32>,
    pub market_data: Option<CoinMarketData>,
}

impl CoinDetail {
    /// English description, if the provider has one
    pub fn description_en(&self) -> Option<&str> {
        self.description
            .get("en")
            .map(String::as_str)
            .filter(|text| !text.is_empty())
    }
}

/// Per-currency market figures nested in a coin detail record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoinMarketData {
    #[serde(default)]
    pub current_price: HashMap<String, f64>,
    #[serde(default)]
    pub market_cap: HashMap<String, f64>,
    #[serde(default)]
    pub total_volume: HashMap<String, f64>,
    #[serde(default)]
    pub high_24h: HashMap<String, f64>,
    #[serde(default)]
    pub low_24h: HashMap<String, f64>,
    #[serde(default)]
    pub ath: HashMap<String, f64>,
    #[serde(default)]
    pub atl: HashMap<String, f64>,
    pub price_change_percentage_24h: Option<f64>,
    pub price_change_percentage_7d: Option<f64>,
    pub circulating_supply: Option<f64>,
    pub total_supply: Option<f64>,
    pub max_supply: Option<f64>,
}

/// Historical price series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketChart {
    /// `(unix millis, price)` pairs
    pub prices: Vec<(i64, f64)>,
}

impl MarketChart {
    /// Prices without timestamps, oldest first
    pub fn values(&self) -> Vec<f64> {
        self.prices.iter().map(|(_, price)| *price).collect()
    }
}

/// Trending coins response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trending {
    pub coins: Vec<TrendingItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingItem {
    pub item: TrendingCoin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingCoin {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub market_cap_rank: Option<u32>,
    pub price_btc: Option<f64>,
    pub score: Option<u32>,
}

/// Spot rates: coin id -> currency -> value
///
/// When requested with `include_last_updated_at` the inner map also carries
/// a `last_updated_at` unix timestamp.
pub type SimplePrice = HashMap<String, HashMap<String, f64>>;

/// Minimal identity of a coin, as produced by the resolver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinRef {
    pub id: String,
    pub symbol: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_order_parse_and_display() {
        assert_eq!(
            "market_cap_asc".parse::<MarketOrder>().unwrap(),
            MarketOrder::MarketCapAsc
        );
        assert_eq!(
            "VOLUME_DESC".parse::<MarketOrder>().unwrap(),
            MarketOrder::VolumeDesc
        );
        assert!("price".parse::<MarketOrder>().is_err());
        assert_eq!(MarketOrder::default().to_string(), "market_cap_desc");
    }

    #[test]
    fn test_markets_query_builder() {
        let query = MarketsQuery::new("eur")
            .per_page(10)
            .page(2)
            .order(MarketOrder::VolumeDesc)
            .ids(["ethereum", "bitcoin"]);

        assert_eq!(query.vs_currency, "eur");
        assert_eq!(query.per_page, 10);
        assert_eq!(query.page, 2);
        assert_eq!(query.order, MarketOrder::VolumeDesc);
        assert_eq!(
            query.ids,
            Some(vec!["ethereum".to_string(), "bitcoin".to_string()])
        );
    }

    #[test]
    fn test_market_coin_tolerates_null_fields() {
        let json = r#"{
            "id": "bitcoin",
            "symbol": "btc",
            "name": "Bitcoin",
            "current_price": 67000.5,
            "market_cap": 1320000000000,
            "market_cap_rank": 1,
            "total_volume": 25000000000,
            "price_change_percentage_24h": -1.25,
            "ath": 73738,
            "ath_change_percentage": -9.1,
            "atl": 67.81,
            "atl_change_percentage": 98700.2,
            "circulating_supply": 19700000,
            "total_supply": 21000000,
            "max_supply": null
        }"#;

        let coin: MarketCoin = serde_json::from_str(json).unwrap();
        assert_eq!(coin.id, "bitcoin");
        assert_eq!(coin.market_cap_rank, Some(1));
        assert!(coin.max_supply.is_none());
    }

    #[test]
    fn test_coin_detail_description() {
        let json = r#"{
            "id": "ethereum",
            "symbol": "eth",
            "name": "Ethereum",
            "description": {"en": "A decentralized platform.", "de": ""},
            "market_cap_rank": 2,
            "market_data": {
                "current_price": {"usd": 3500.0, "eur": 3200.0},
                "price_change_percentage_24h": 2.5
            }
        }"#;

        let detail: CoinDetail = serde_json::from_str(json).unwrap();
        assert_eq!(detail.description_en(), Some("A decentralized platform."));
        let market = detail.market_data.unwrap();
        assert_eq!(market.current_price.get("eur"), Some(&3200.0));
        assert!(market.market_cap.is_empty());
    }

    #[test]
    fn test_market_chart_pairs() {
        let json = r#"{"prices": [[1700000000000, 35000.1], [1700003600000, 35100.7]]}"#;
        let chart: MarketChart = serde_json::from_str(json).unwrap();
        assert_eq!(chart.prices[0].0, 1_700_000_000_000);
        assert_eq!(chart.values(), vec![35000.1, 35100.7]);
    }

    #[test]
    fn test_trending_shape() {
        let json = r#"{"coins": [{"item": {"id": "pepe", "coin_id": 29850, "name": "Pepe", "symbol": "PEPE", "market_cap_rank": 30, "price_btc": 0.00000000021, "score": 0}}]}"#;
        let trending: Trending = serde_json::from_str(json).unwrap();
        assert_eq!(trending.coins.len(), 1);
        assert_eq!(trending.coins[0].item.symbol, "PEPE");
    }

    #[test]
    fn test_simple_price_with_last_updated() {
        let json = r#"{"bitcoin": {"usd": 67000, "eur": 62000.5, "last_updated_at": 1700000000}}"#;
        let prices: SimplePrice = serde_json::from_str(json).unwrap();
        assert_eq!(prices["bitcoin"]["usd"], 67000.0);
        assert_eq!(prices["bitcoin"]["last_updated_at"], 1_700_000_000.0);
    }

    #[test]
    fn test_error_objects_are_rejected() {
        let error_body = r#"{"status": {"error_code": 429, "error_message": "rate limited"}}"#;
        assert!(serde_json::from_str::<Trending>(error_body).is_err());
        assert!(serde_json::from_str::<SearchResults>(error_body).is_err());
        assert!(serde_json::from_str::<MarketChart>(error_body).is_err());
        assert!(serde_json::from_str::<Vec<MarketCoin>>(error_body).is_err());
    }

    #[test]
    fn test_origin_is_offline() {
        assert!(!Origin::Live.is_offline());
        assert!(!Origin::Memory.is_offline());
        assert!(Origin::Offline {
            captured_at: Utc::now()
        }
        .is_offline());
    }
}
