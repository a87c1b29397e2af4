//! Single-key JSON file cache with a freshness window

use crate::error::Result;
use crate::types::{CacheStats, StoredEntry};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, warn};

/// A persistent cache slot holding the most recent value for one key
pub struct LocationCache {
    /// Directory where the entry file lives
    cache_dir: PathBuf,
    /// Entry file name stem
    key: String,
    /// Maximum age at which an entry is still handed out
    freshness: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    stale: AtomicU64,
}

impl LocationCache {
    /// Create a new cache slot
    pub fn new(cache_dir: PathBuf, key: &str, freshness: Duration) -> Self {
        Self {
            cache_dir,
            key: key.to_string(),
            freshness,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            stale: AtomicU64::new(0),
        }
    }

    /// Initialize the cache by ensuring the cache directory exists
    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.cache_dir).await?;
        info!(cache_dir = ?self.cache_dir, key = %self.key, "Location cache initialized");
        Ok(())
    }

    /// Path of the entry file
    pub fn path(&self) -> PathBuf {
        self.cache_dir.join(format!("{}.json", self.key))
    }

    pub fn freshness(&self) -> Duration {
        self.freshness
    }

    /// Get the cached value if it is still within the freshness window
    pub async fn load<T: DeserializeOwned>(&self) -> Option<T> {
        let Some(entry) = self.load_entry::<T>().await else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };

        // Entries stamped in the future count as age zero
        let age = (Utc::now() - entry.stored_at)
            .to_std()
            .unwrap_or(Duration::ZERO);

        if age > self.freshness {
            debug!(
                key = %self.key,
                age_ms = age.as_millis() as u64,
                freshness_ms = self.freshness.as_millis() as u64,
                "Cached location is stale"
            );
            self.stale.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        self.hits.fetch_add(1, Ordering::Relaxed);
        debug!(key = %self.key, age_ms = age.as_millis() as u64, "Cache hit");
        Some(entry.value)
    }

    /// Read the raw entry regardless of its age
    pub async fn load_entry<T: DeserializeOwned>(&self) -> Option<StoredEntry<T>> {
        let path = self.path();
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = ?path, error = %e, "Failed to read cached location");
                return None;
            }
        };

        match serde_json::from_slice::<StoredEntry<T>>(&bytes) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(path = ?path, error = %e, "Corrupt cached location, removing entry");
                remove_quietly(&path).await;
                None
            }
        }
    }

    /// Store a value, stamping it with the current time
    pub async fn store<T: Serialize>(&self, value: &T) -> Result<()> {
        let entry = StoredEntry {
            stored_at: Utc::now(),
            value,
        };
        let json = serde_json::to_vec(&entry)?;

        let path = self.path();
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, &json).await?;
        fs::rename(&tmp_path, &path).await?;

        debug!(key = %self.key, size = json.len(), "Cached location");
        Ok(())
    }

    /// Remove the entry; a missing entry is not an error
    pub async fn clear(&self) -> Result<()> {
        match fs::remove_file(self.path()).await {
            Ok(()) => {
                debug!(key = %self.key, "Cleared cached location");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Get current cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
        }
    }
}

async fn remove_quietly(path: &Path) {
    let _ = fs::remove_file(path).await;
}
