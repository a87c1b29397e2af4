//! Secondary reverse geocoder that only returns free text

use tracing::{debug, warn};

use crate::error::GeocodingError;
use crate::parse::parse_display_name;
use crate::types::{ClientConfig, DisplayNameResponse, HouseNumberPolicy, ParsedAddress};

const DEFAULT_BASE_URL: &str = "https://geocode.maps.co";

/// Client for `/reverse` endpoints answering with a single `display_name`
pub struct DisplayNameClient {
    client: reqwest::Client,
    base_url: String,
    house_numbers: HouseNumberPolicy,
}

impl DisplayNameClient {
    pub fn new() -> crate::Result<Self> {
        Self::with_config(ClientConfig::new(DEFAULT_BASE_URL), HouseNumberPolicy::default())
    }

    pub fn with_config(config: ClientConfig, house_numbers: HouseNumberPolicy) -> crate::Result<Self> {
        Ok(Self {
            client: config.build_http_client()?,
            base_url: config.base_url,
            house_numbers,
        })
    }

    pub async fn reverse_geocode(&self, latitude: f64, longitude: f64) -> crate::Result<ParsedAddress> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(GeocodingError::InvalidCoordinates(latitude, longitude));
        }

        let url = format!("{}/reverse", self.base_url);
        let lat = latitude.to_string();
        let lon = longitude.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[("lat", lat.as_str()), ("lon", lon.as_str()), ("format", "json")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GeocodingError::ApiError(format!(
                "Secondary geocoder returned status {}",
                response.status()
            )));
        }

        let raw: serde_json::Value = response.json().await?;
        let data: DisplayNameResponse = serde_json::from_value(raw.clone()).map_err(|e| {
            GeocodingError::ApiError(format!("Malformed secondary geocoder response: {e}"))
        })?;

        if let Some(err) = data.error {
            warn!(lat = latitude, lon = longitude, error = %err, "Secondary geocoder returned error");
            return Err(GeocodingError::ApiError(err));
        }

        let display_name = data
            .display_name
            .filter(|name| !name.trim().is_empty())
            .ok_or(GeocodingError::MissingAddress)?;

        let mut result = parse_display_name(&display_name, self.house_numbers);
        result.raw = raw;

        debug!(lat = latitude, lon = longitude, %display_name, "Geocoded coordinates from display name");

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let client = DisplayNameClient::new().unwrap();
        assert_eq!(client.base_url, DEFAULT_BASE_URL);
        assert_eq!(client.house_numbers, HouseNumberPolicy::Omit);

        let client = DisplayNameClient::with_config(
            ClientConfig::new("http://localhost:8080"),
            HouseNumberPolicy::Placeholder,
        )
        .unwrap();
        assert_eq!(client.base_url, "http://localhost:8080");
        assert_eq!(client.house_numbers, HouseNumberPolicy::Placeholder);
    }
}
