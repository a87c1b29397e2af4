use std::time::Duration;

use moka::future::Cache;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::error::GeocodingError;
use crate::parse::parse_structured_address;
use crate::types::{ClientConfig, HouseNumberPolicy, NominatimResponse, ParsedAddress};

const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";
const CACHE_TTL_SECS: u64 = 86400; // 24 hours
const ACCEPT_LANGUAGE: &str = "th,en";

/// Nominatim reverse geocoding client with rate limiting and caching
pub struct NominatimClient {
    client: reqwest::Client,
    base_url: String,
    cache: Cache<String, ParsedAddress>,
    /// Semaphore to serialise requests for the rate limit
    rate_limiter: Semaphore,
    request_interval: Duration,
    house_numbers: HouseNumberPolicy,
}

impl NominatimClient {
    /// Create a client against the public Nominatim instance
    pub fn new() -> crate::Result<Self> {
        Self::with_config(
            ClientConfig::new(DEFAULT_BASE_URL).with_request_interval(Duration::from_millis(1100)),
            HouseNumberPolicy::default(),
        )
    }

    /// Create a client with custom connection settings
    pub fn with_config(config: ClientConfig, house_numbers: HouseNumberPolicy) -> crate::Result<Self> {
        let client = config.build_http_client()?;

        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(Duration::from_secs(CACHE_TTL_SECS))
            .build();

        Ok(Self {
            client,
            base_url: config.base_url,
            cache,
            rate_limiter: Semaphore::new(1),
            request_interval: config.request_interval,
            house_numbers,
        })
    }

    /// Reverse geocode coordinates to a Thai address
    pub async fn reverse_geocode(&self, latitude: f64, longitude: f64) -> crate::Result<ParsedAddress> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(GeocodingError::InvalidCoordinates(latitude, longitude));
        }

        // Round to 6 decimal places for cache key (~0.1m precision)
        let cache_key = format!("{:.6},{:.6}", latitude, longitude);

        if let Some(cached) = self.cache.get(&cache_key).await {
            debug!(lat = latitude, lon = longitude, "Nominatim cache hit");
            return Ok(cached);
        }

        // Rate limit: hold the permit for the request plus the trailing interval
        let _permit = self
            .rate_limiter
            .acquire()
            .await
            .map_err(|e| GeocodingError::ApiError(format!("rate limiter closed: {e}")))?;

        let result = self.fetch(latitude, longitude).await;

        if !self.request_interval.is_zero() {
            tokio::time::sleep(self.request_interval).await;
        }

        let result = result?;
        self.cache.insert(cache_key, result.clone()).await;
        Ok(result)
    }

    async fn fetch(&self, latitude: f64, longitude: f64) -> crate::Result<ParsedAddress> {
        let url = format!("{}/reverse", self.base_url);
        let lat = latitude.to_string();
        let lon = longitude.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("format", "json"),
                ("addressdetails", "1"),
                ("zoom", "18"),
                ("accept-language", ACCEPT_LANGUAGE),
            ])
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GeocodingError::ApiError(format!(
                "Nominatim returned status {}",
                response.status()
            )));
        }

        let raw: serde_json::Value = response.json().await?;
        let data: NominatimResponse = serde_json::from_value(raw.clone())
            .map_err(|e| GeocodingError::ApiError(format!("Malformed Nominatim response: {e}")))?;

        if let Some(ref err) = data.error {
            warn!(lat = latitude, lon = longitude, error = %err, "Nominatim returned error");
            return Err(GeocodingError::ApiError(err.clone()));
        }

        let address = data.address.ok_or(GeocodingError::MissingAddress)?;
        let mut result = parse_structured_address(&address, self.house_numbers);
        result.raw = raw;

        debug!(
            lat = latitude,
            lon = longitude,
            province = %result.province,
            postal_code = %result.postal_code,
            "Geocoded coordinates"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_public_instance_defaults() {
        let client = NominatimClient::new().unwrap();
        assert_eq!(client.base_url, DEFAULT_BASE_URL);
        assert_eq!(client.request_interval, Duration::from_millis(1100));
        assert_eq!(client.house_numbers, HouseNumberPolicy::Omit);
    }

    #[test]
    fn test_with_config_overrides_defaults() {
        let config = ClientConfig::new("http://localhost:8080").with_request_interval(Duration::ZERO);
        let client = NominatimClient::with_config(config, HouseNumberPolicy::Placeholder).unwrap();
        assert_eq!(client.base_url, "http://localhost:8080");
        assert_eq!(client.request_interval, Duration::ZERO);
        assert_eq!(client.house_numbers, HouseNumberPolicy::Placeholder);
    }
}
