//! TTL-keyed data cache with optional JSON persistence.

use chrono::{DateTime, Duration, Utc};
use lru::LruCache;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::future::Future;
use std::num::NonZeroUsize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Maximum number of cached keys.
pub const CACHE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(64) {
    Some(capacity) => capacity,
    None => NonZeroUsize::MIN,
};

/// Errors from the data cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Reading or writing the cache file failed.
    #[error("cache I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// A value could not be converted.
    #[error("cache value could not be converted: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    value: serde_json::Value,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedEntry {
    key: String,
    #[serde(flatten)]
    entry: CacheEntry,
}

/// Values kept until their expiry time.
#[derive(Debug)]
pub struct DataCache {
    entries: LruCache<String, CacheEntry>,
}

impl Default for DataCache {
    fn default() -> Self {
        Self::new()
    }
}

impl DataCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self {
            entries: LruCache::new(CACHE_CAPACITY),
        }
    }

    /// Load from a JSON file; a missing file yields an empty cache.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let path = path.as_ref();
        let mut cache = Self::new();
        if !path.exists() {
            debug!(path = %path.display(), "No cache file, starting empty");
            return Ok(cache);
        }

        let raw = fs::read_to_string(path)?;
        let persisted: Vec<PersistedEntry> = serde_json::from_str(&raw)?;
        let now = Utc::now();
        for PersistedEntry { key, entry } in persisted {
            if entry.expires_at > now {
                cache.entries.put(key, entry);
            }
        }
        debug!(path = %path.display(), entries = cache.len(), "Loaded data cache");
        Ok(cache)
    }

    /// Write all live entries to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CacheError> {
        let now = Utc::now();
        // Least recently used first, so loading restores recency order.
        let persisted: Vec<PersistedEntry> = self
            .entries
            .iter()
            .rev()
            .filter(|(_, entry)| entry.expires_at > now)
            .map(|(key, entry)| PersistedEntry {
                key: key.clone(),
                entry: entry.clone(),
            })
            .collect();
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path.as_ref(), serde_json::to_string_pretty(&persisted)?)?;
        Ok(())
    }

    /// Number of entries, live or expired.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached value for `key`, if present and not expired.
    pub fn get<T: DeserializeOwned>(&mut self, key: &str) -> Result<Option<T>, CacheError> {
        let now = Utc::now();
        match self.entries.get(key) {
            Some(entry) if entry.expires_at > now => {
                Ok(Some(serde_json::from_value(entry.value.clone())?))
            }
            Some(_) => {
                self.entries.pop(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Store `value` under `key` for `ttl`.
    pub fn insert<T: Serialize>(&mut self, key: &str, value: &T, ttl: Duration) -> Result<(), CacheError> {
        let entry = CacheEntry {
            value: serde_json::to_value(value)?,
            expires_at: Utc::now() + ttl,
        };
        self.entries.put(key.to_string(), entry);
        Ok(())
    }

    /// Cached value for `key`, or the result of `fetch`, which is then stored.
    ///
    /// An entry that no longer converts to `T` is treated as missing.
    pub async fn get_or_fetch<T, E, F, Fut>(&mut self, key: &str, ttl: Duration, fetch: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match self.get(key) {
            Ok(Some(value)) => {
                debug!(key, "Cache hit");
                return Ok(value);
            }
            Ok(None) => debug!(key, "Cache miss"),
            Err(err) => warn!(key, error = %err, "Discarding unreadable cache entry"),
        }

        let value = fetch().await?;
        self.insert(key, &value, ttl)?;
        Ok(value)
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
