//! File-backed cache for the last known location
//!
//! Holds one JSON document per key on disk together with the time it was
//! stored, and only hands it back while it is younger than the configured
//! freshness window.

mod cache;
mod error;
mod types;

pub use cache::LocationCache;
pub use error::{CacheError, Result};
pub use types::{CacheStats, StoredEntry};
