//! Coarse location from the caller's public IP address

use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::constants::IP_ACCURACY_METERS;
use crate::error::{LocationError, Result};
use crate::types::{Coordinate, LocationResult, LocationSource};

const DEFAULT_BASE_URL: &str = "https://ipapi.co";

#[derive(Debug, Deserialize)]
struct IpGeolocationResponse {
    latitude: Option<f64>,
    longitude: Option<f64>,
    city: Option<String>,
    region: Option<String>,
    country_name: Option<String>,
    #[serde(default)]
    error: bool,
    reason: Option<String>,
}

/// Client for an ipapi-style `GET /json/` endpoint
pub struct IpLocator {
    client: reqwest::Client,
    base_url: String,
}

impl IpLocator {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(DEFAULT_BASE_URL, "location-resolver/0.1", Duration::from_secs(30))
    }

    /// Look up the approximate location; accuracy is fixed at 5 km
    pub async fn locate(&self) -> Result<LocationResult> {
        let url = format!("{}/json/", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LocationError::Network(format!(
                "IP geolocation returned status {}",
                response.status()
            )));
        }

        let data: IpGeolocationResponse = response.json().await?;

        if data.error {
            let reason = data.reason.unwrap_or_else(|| "unknown reason".to_string());
            warn!(%reason, "IP geolocation returned error");
            return Err(LocationError::Network(format!(
                "IP geolocation failed: {}",
                reason
            )));
        }

        let (Some(latitude), Some(longitude)) = (data.latitude, data.longitude) else {
            return Err(LocationError::Network(
                "IP geolocation response missing coordinates".to_string(),
            ));
        };

        debug!(
            lat = latitude,
            lon = longitude,
            city = data.city.as_deref().unwrap_or("unknown"),
            region = data.region.as_deref().unwrap_or("unknown"),
            country = data.country_name.as_deref().unwrap_or("unknown"),
            "Located by IP"
        );

        Ok(LocationResult {
            coordinate: Coordinate::new(latitude, longitude, IP_ACCURACY_METERS),
            source: LocationSource::Ip,
            captured_at: Utc::now(),
            timed_out: false,
        })
    }
}
