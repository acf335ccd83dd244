//! Deterministic cache keys for logical requests
//!
//! Keys are shared by the in-memory cache and the offline cache. Identifier
//! and currency lists are normalized (trimmed, lowercased, sorted, deduplicated)
//! so that `[btc, eth]` and `[eth, btc]` map to the same key. The separators
//! `:` and `,` (and `%` itself) are percent-encoded inside segments, so free
//! user input cannot make two distinct requests share a key.

use crate::types::MarketsQuery;
use std::fmt;

/// Cache key of one logical request
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Market listing key: `markets:{vs}:{per_page}:{page}:{order}:{ids|all}`
    pub fn markets(query: &MarketsQuery) -> Self {
        let ids = query
            .ids
            .as_deref()
            .map(list_segment)
            .filter(|ids| !ids.is_empty())
            .unwrap_or_else(|| "all".to_string());

        Self(format!(
            "markets:{}:{}:{}:{}:{}",
            segment(&query.vs_currency),
            query.per_page,
            query.page,
            query.order.as_str(),
            ids
        ))
    }

    pub fn search(query: &str) -> Self {
        Self(format!("search:{}", segment(query)))
    }

    pub fn coin_detail(id: &str) -> Self {
        Self(format!("detail:{}", segment(id)))
    }

    pub fn market_chart(id: &str, vs_currency: &str, days: u32) -> Self {
        Self(format!(
            "chart:{}:{}:{}",
            segment(id),
            segment(vs_currency),
            days
        ))
    }

    pub fn trending() -> Self {
        Self("trending".to_string())
    }

    pub fn simple_price<A: AsRef<str>, B: AsRef<str>>(ids: &[A], vs_currencies: &[B]) -> Self {
        Self(format!(
            "price:{}:{}",
            list_segment(ids),
            list_segment(vs_currencies)
        ))
    }

    /// Key for a resolver lookup; lives in its own cache
    pub fn coin_resolve(input: &str) -> Self {
        Self(format!("coin-resolve:{}", segment(input)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Trims and lowercases a single parameter
pub fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Normalizes, sorts and deduplicates a parameter list, dropping blanks
pub fn normalize_list<S: AsRef<str>>(values: &[S]) -> Vec<String> {
    let mut list: Vec<String> = values
        .iter()
        .map(|v| normalize(v.as_ref()))
        .filter(|v| !v.is_empty())
        .collect();
    list.sort();
    list.dedup();
    list
}

/// Normalized value with key separators escaped
fn segment(value: &str) -> String {
    escape(&normalize(value))
}

/// Normalized list joined with `,`, each item escaped
fn list_segment<S: AsRef<str>>(values: &[S]) -> String {
    normalize_list(values)
        .iter()
        .map(|value| escape(value))
        .collect::<Vec<_>>()
        .join(",")
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '%' => escaped.push_str("%25"),
            ':' => escaped.push_str("%3A"),
            ',' => escaped.push_str("%2C"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MarketOrder;
    use std::collections::HashSet;

    #[test]
    fn test_id_order_does_not_change_markets_key() {
        let a = MarketsQuery::new("usd").ids(["bitcoin", "ethereum"]);
        let b = MarketsQuery::new("usd").ids(["ethereum", "bitcoin"]);
        assert_eq!(CacheKey::markets(&a), CacheKey::markets(&b));
        assert_eq!(
            CacheKey::markets(&a).as_str(),
            "markets:usd:50:1:market_cap_desc:bitcoin,ethereum"
        );
    }

    #[test]
    fn test_id_order_does_not_change_price_key() {
        let a = CacheKey::simple_price(&["ethereum", "bitcoin"], &["usd", "eur"]);
        let b = CacheKey::simple_price(&["bitcoin", "ethereum"], &["eur", "usd"]);
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "price:bitcoin,ethereum:eur,usd");
    }

    #[test]
    fn test_case_and_whitespace_are_normalized() {
        let a = MarketsQuery::new(" USD ").ids(["Bitcoin", "bitcoin"]);
        let b = MarketsQuery::new("usd").ids(["bitcoin"]);
        assert_eq!(CacheKey::markets(&a), CacheKey::markets(&b));
        assert_eq!(CacheKey::search("Bitcoin "), CacheKey::search("bitcoin"));
    }

    #[test]
    fn test_empty_id_filter_keys_as_all() {
        let none = MarketsQuery::new("usd");
        let empty = MarketsQuery::new("usd").ids(Vec::<String>::new());
        assert_eq!(CacheKey::markets(&none), CacheKey::markets(&empty));
        assert!(CacheKey::markets(&none).as_str().ends_with(":all"));
    }

    #[test]
    fn test_separators_in_input_cannot_collide() {
        assert_ne!(
            CacheKey::market_chart("a:b", "c", 7),
            CacheKey::market_chart("a", "b:c", 7)
        );
        assert_ne!(
            CacheKey::simple_price(&["a,b"], &["usd"]),
            CacheKey::simple_price(&["a", "b"], &["usd"])
        );
        assert_ne!(
            CacheKey::markets(&MarketsQuery::new("usd:1")),
            CacheKey::markets(&MarketsQuery::new("usd"))
        );
        assert_ne!(CacheKey::search("a%3Ab"), CacheKey::search("a:b"));
        assert_eq!(CacheKey::market_chart("a:b", "c", 7).as_str(), "chart:a%3Ab:c:7");
    }

    #[test]
    fn test_distinct_requests_have_distinct_keys() {
        let base = MarketsQuery::new("usd");
        let variants = vec![
            CacheKey::markets(&base),
            CacheKey::markets(&base.clone().per_page(100)),
            CacheKey::markets(&base.clone().page(2)),
            CacheKey::markets(&base.clone().order(MarketOrder::VolumeDesc)),
            CacheKey::markets(&MarketsQuery::new("eur")),
            CacheKey::markets(&base.clone().ids(["bitcoin"])),
            CacheKey::markets(&base.clone().ids(["bitcoin", "ethereum"])),
            CacheKey::search("bitcoin"),
            CacheKey::search("ethereum"),
            CacheKey::coin_detail("bitcoin"),
            CacheKey::market_chart("bitcoin", "usd", 7),
            CacheKey::market_chart("bitcoin", "usd", 30),
            CacheKey::market_chart("bitcoin", "eur", 7),
            CacheKey::trending(),
            CacheKey::simple_price(&["bitcoin"], &["usd"]),
            CacheKey::simple_price(&["bitcoin"], &["usd", "eur"]),
        ];

        let unique: HashSet<_> = variants.iter().collect();
        assert_eq!(unique.len(), variants.len());
    }
}
