//! In-memory cache with a fixed per-instance TTL

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::cache_key::CacheKey;

/// A cached value and the instant it stops being served
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    /// `None` when the TTL reaches past what `Instant` can represent
    expires_at: Option<Instant>,
}

/// In-memory key/value store with lazy expiry
///
/// Entries leave the cache only when read after expiry or through
/// [`delete`](Self::delete) / [`clear`](Self::clear). There is no capacity bound
/// and no background sweeper.
pub struct TtlCache<V> {
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, CacheEntry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    /// Creates an empty cache whose entries live for `ttl`
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the value for `key` unless it is missing or expired
    pub async fn get(&self, key: &CacheKey) -> Option<V> {
        self.get_at(key, Instant::now()).await
    }

    /// Stores `value`, replacing any previous entry for `key`
    pub async fn set(&self, key: CacheKey, value: V) {
        self.set_at(key, value, Instant::now()).await
    }

    pub async fn delete(&self, key: &CacheKey) {
        self.entries.lock().await.remove(key);
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    /// Number of stored entries, expired ones included
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Reads `key` as seen at `now`, evicting the entry if it has expired
    pub(crate) async fn get_at(&self, key: &CacheKey, now: Instant) -> Option<V> {
        let mut entries = self.entries.lock().await;
        let expired = match entries.get(key) {
            None => return None,
            Some(entry) => entry.expires_at.is_some_and(|expires_at| expires_at <= now),
        };

        if expired {
            entries.remove(key);
            tracing::trace!(cache_key = %key, "Evicted expired cache entry");
            return None;
        }

        entries.get(key).map(|entry| entry.value.clone())
    }

    pub(crate) async fn set_at(&self, key: CacheKey, value: V, now: Instant) {
        let entry = CacheEntry {
            value,
            expires_at: now.checked_add(self.ttl),
        };
        self.entries.lock().await.insert(key, entry);
    }
}
