use std::env;
use std::path::PathBuf;
use std::time::Duration;

use geocoding_client::HouseNumberPolicy;

use crate::constants::DEFAULT_LOCATION_CACHE_TTL_SECS;
use crate::validation::BoundingBox;

/// Resolver configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub primary_geocoder_url: String,
    pub secondary_geocoder_url: String,
    pub ip_geolocation_url: String,
    pub user_agent: String,
    pub http_timeout: Duration,
    pub geocoder_request_interval: Duration,
    pub cache_dir: PathBuf,
    pub cache_ttl: Duration,
    pub bounds: BoundingBox,
    pub house_number_policy: HouseNumberPolicy,
}

impl Config {
    /// Parse configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let primary_geocoder_url = lookup("PRIMARY_GEOCODER_URL")
            .unwrap_or_else(|| "https://nominatim.openstreetmap.org".to_string());

        let secondary_geocoder_url = lookup("SECONDARY_GEOCODER_URL")
            .unwrap_or_else(|| "https://geocode.maps.co".to_string());

        let ip_geolocation_url =
            lookup("IP_GEOLOCATION_URL").unwrap_or_else(|| "https://ipapi.co".to_string());

        let user_agent = lookup("GEOCODER_USER_AGENT")
            .unwrap_or_else(|| format!("location-resolver/{}", env!("CARGO_PKG_VERSION")));

        let http_timeout = lookup("HTTP_TIMEOUT_SECS")
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));

        // Nominatim usage policy: at most one request per second
        let geocoder_request_interval = lookup("GEOCODER_REQUEST_INTERVAL_MS")
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_millis(1100));

        let cache_dir = lookup("LOCATION_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| env::temp_dir().join("location-resolver"));

        let cache_ttl = lookup("LOCATION_CACHE_TTL_SECS")
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_LOCATION_CACHE_TTL_SECS));

        let bounds = lookup("LOCATION_BOUNDS")
            .and_then(|s| BoundingBox::parse(&s))
            .unwrap_or_default();

        let house_number_policy = lookup("HOUSE_NUMBER_POLICY")
            .and_then(|s| HouseNumberPolicy::parse(&s))
            .unwrap_or_default();

        Self {
            primary_geocoder_url,
            secondary_geocoder_url,
            ip_geolocation_url,
            user_agent,
            http_timeout,
            geocoder_request_interval,
            cache_dir,
            cache_ttl,
            bounds,
            house_number_policy,
        }
    }
}
