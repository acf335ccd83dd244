//! Durable offline cache backed by a JSON file
//!
//! Holds the last successful payload per cache key. Records are stored under
//! `offline-cache:{key}` in a single JSON document, which is loaded once when
//! the cache is opened and rewritten (via a uniquely named temporary file in
//! the same directory, then renamed over the target) on every successful live
//! fetch. Entries never expire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;

use crate::cache_key::CacheKey;
use crate::constants::OFFLINE_CACHE_KEY_PREFIX;
use crate::error::OfflineCacheError;

/// Last captured payload for one cache key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfflineCacheEntry {
    /// When the payload was fetched
    pub captured_at: DateTime<Utc>,
    pub value: Value,
}

/// Disk-backed last-resort store
#[derive(Debug)]
pub struct OfflineCache {
    /// File holding the records; `None` keeps entries in memory only
    path: Option<PathBuf>,
    entries: Mutex<HashMap<String, OfflineCacheEntry>>,
}

impl OfflineCache {
    /// Opens the cache at `path`, loading any records from a previous run
    ///
    /// A missing file starts empty. An unreadable or corrupt file is logged and
    /// also starts empty; it is replaced on the next successful write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = load_entries(&path);
        tracing::debug!(
            path = %path.display(),
            entries = entries.len(),
            "Opened offline cache"
        );
        Self {
            path: Some(path),
            entries: Mutex::new(entries),
        }
    }

    /// A cache that is never persisted
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the last captured entry for `key`
    pub async fn get(&self, key: &CacheKey) -> Option<OfflineCacheEntry> {
        self.entries.lock().await.get(&record_key(key)).cloned()
    }

    /// Records `value` as the latest payload for `key` and persists the store
    ///
    /// The in-memory copy is updated even if persisting fails.
    pub async fn set(&self, key: &CacheKey, value: Value) -> Result<(), OfflineCacheError> {
        let entry = OfflineCacheEntry {
            captured_at: Utc::now(),
            value,
        };

        // The lock is held through the write so concurrent writers persist in order
        let mut entries = self.entries.lock().await;
        entries.insert(record_key(key), entry);

        let Some(path) = &self.path else {
            return Ok(());
        };

        let json = serde_json::to_vec_pretty(&*entries)?;
        let path = path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, &json))
            .await
            .map_err(io::Error::other)??;
        Ok(())
    }
}

/// Writes `contents` to a fresh temp file next to `path` and renames it into place
///
/// Each writer gets its own temp file, so concurrent processes never share one.
fn write_atomically(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn record_key(key: &CacheKey) -> String {
    format!("{}:{}", OFFLINE_CACHE_KEY_PREFIX, key)
}

fn load_entries(path: &Path) -> HashMap<String, OfflineCacheEntry> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return HashMap::new(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read offline cache");
            return HashMap::new();
        }
    };

    serde_json::from_str(&content).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "Discarding corrupt offline cache");
        HashMap::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_cache() -> (OfflineCache, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let cache = OfflineCache::open(temp_dir.path().join("offline-cache.json"));
        (cache, temp_dir)
    }

    #[tokio::test]
    async fn test_get_missing_key_returns_none() {
        let (cache, _temp_dir) = create_test_cache();
        assert!(cache.get(&CacheKey::trending()).await.is_none());
    }

    #[tokio::test]
    async fn test_set_then_get_returns_written_value() {
        let (cache, _temp_dir) = create_test_cache();
        let key = CacheKey::coin_detail("bitcoin");
        let value = json!({"id": "bitcoin", "name": "Bitcoin"});

        let before = Utc::now();
        cache.set(&key, value.clone()).await.expect("write should succeed");

        let entry = cache.get(&key).await.expect("entry should exist");
        assert_eq!(entry.value, value);
        assert!(entry.captured_at >= before);
    }

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let (cache, temp_dir) = create_test_cache();
        let key = CacheKey::search("eth");
        let value = json!({"coins": [{"id": "ethereum", "name": "Ethereum", "symbol": "eth"}]});
        cache.set(&key, value.clone()).await.expect("write should succeed");

        let reopened = OfflineCache::open(temp_dir.path().join("offline-cache.json"));
        assert_eq!(reopened.get(&key).await.map(|e| e.value), Some(value));
    }

    #[tokio::test]
    async fn test_records_are_namespaced_in_file() {
        let (cache, temp_dir) = create_test_cache();
        cache
            .set(&CacheKey::trending(), json!({"coins": []}))
            .await
            .expect("write should succeed");

        let content =
            fs::read_to_string(temp_dir.path().join("offline-cache.json")).expect("file exists");
        assert!(content.contains("\"offline-cache:trending\""));
        assert!(content.contains("\"captured_at\""));
    }

    #[tokio::test]
    async fn test_set_overwrites_previous_entry() {
        let (cache, _temp_dir) = create_test_cache();
        let key = CacheKey::trending();
        cache.set(&key, json!(1)).await.unwrap();
        cache.set(&key, json!(2)).await.unwrap();

        assert_eq!(cache.get(&key).await.unwrap().value, json!(2));
    }

    #[tokio::test]
    async fn test_write_creates_missing_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("dir").join("offline.json");
        let cache = OfflineCache::open(&path);

        cache.set(&CacheKey::trending(), json!([])).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_failed_write_keeps_in_memory_copy() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("not-a-dir");
        fs::write(&blocker, "file").unwrap();
        let cache = OfflineCache::open(blocker.join("offline.json"));

        let key = CacheKey::trending();
        assert!(cache.set(&key, json!({"coins": []})).await.is_err());
        assert!(cache.get(&key).await.is_some());
    }

    #[tokio::test]
    async fn test_corrupt_file_starts_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("offline.json");
        fs::write(&path, "{not json").unwrap();

        let cache = OfflineCache::open(&path);
        assert!(cache.get(&CacheKey::trending()).await.is_none());

        cache.set(&CacheKey::trending(), json!(1)).await.unwrap();
        let reopened = OfflineCache::open(&path);
        assert!(reopened.get(&CacheKey::trending()).await.is_some());
    }

    #[tokio::test]
    async fn test_concurrent_writers_leave_one_valid_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("offline.json");
        let first = OfflineCache::open(&path);
        let second = OfflineCache::open(&path);

        let trending_key = CacheKey::trending();
        let search_key = CacheKey::search("btc");
        let (a, b) = tokio::join!(
            first.set(&trending_key, json!({"writer": 1})),
            second.set(&search_key, json!({"writer": 2})),
        );
        a.expect("first write should succeed");
        b.expect("second write should succeed");

        let reopened = OfflineCache::open(&path);
        let survivors = [
            reopened.get(&CacheKey::trending()).await,
            reopened.get(&CacheKey::search("btc")).await,
        ];
        assert!(survivors.iter().any(Option::is_some), "file must hold a complete document");

        let leftovers: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|entry| entry.path() != path)
            .collect();
        assert!(leftovers.is_empty(), "temp files must not be left behind");
    }

    #[tokio::test]
    async fn test_in_memory_cache_round_trips() {
        let cache = OfflineCache::in_memory();
        assert!(cache.path().is_none());
        cache.set(&CacheKey::trending(), json!("x")).await.unwrap();
        assert_eq!(cache.get(&CacheKey::trending()).await.unwrap().value, json!("x"));
    }
}
