// --- Position acquisition ---

/// Accuracy (in meters) at which a watched sample ends the watch early.
pub const TARGET_ACCURACY_METERS: f64 = 30.0;

/// Watch timeout (ms) when extended accuracy is requested.
pub const EXTENDED_WATCH_TIMEOUT_MS: u64 = 45_000;

/// Watch timeout (ms) for a normal high-accuracy attempt.
pub const STANDARD_WATCH_TIMEOUT_MS: u64 = 15_000;

/// Timeout (ms) of the low-accuracy single read fallback.
pub const SINGLE_READ_TIMEOUT_MS: u64 = 10_000;

/// Oldest device-cached position (ms) the single read may return.
pub const SINGLE_READ_MAX_AGE_MS: u64 = 60_000;

// --- IP fallback ---

/// Accuracy (in meters) assigned to IP geolocation results.
pub const IP_ACCURACY_METERS: f64 = 5_000.0;

// --- Location cache ---

/// Cache key of the last successful location.
pub const LOCATION_CACHE_KEY: &str = "last_location";

/// Default freshness window (seconds) of the cached location.
pub const DEFAULT_LOCATION_CACHE_TTL_SECS: u64 = 60;

// --- Debug log ---

/// Number of debug log entries retained per resolution attempt.
pub const DEBUG_LOG_CAPACITY: usize = 10;

// --- Fallback address ---

/// Placeholder for address fields that could not be resolved.
pub const UNKNOWN_FIELD: &str = "ไม่ทราบ";
