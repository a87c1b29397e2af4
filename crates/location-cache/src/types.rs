//! Cache types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// On-disk envelope around a cached value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEntry<T> {
    pub stored_at: DateTime<Utc>,
    pub value: T,
}

/// Statistics about the cache
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub stale: u64,
}
