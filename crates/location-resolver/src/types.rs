//! Location data types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A geographic position with its claimed accuracy radius
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64, accuracy_meters: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_meters,
        }
    }
}

/// How a location was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocationSource {
    DeviceHighAccuracy,
    DeviceStandard,
    Ip,
}

/// A located position, immutable once created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationResult {
    pub coordinate: Coordinate,
    pub source: LocationSource,
    pub captured_at: DateTime<Utc>,
    /// Set when the watch deadline passed before the target accuracy was met
    #[serde(default)]
    pub timed_out: bool,
}

/// Which reverse geocoder produced an address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressSource {
    Primary,
    Secondary,
    Fallback,
}

/// A structured postal address derived from a coordinate
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedAddress {
    pub address_line: String,
    pub subdistrict: String,
    pub district: String,
    pub province: String,
    pub postal_code: String,
    pub source_service: AddressSource,
    pub fallback: bool,
    /// True when the house number is a generated placeholder
    pub house_number_synthesized: bool,
    pub raw: serde_json::Value,
}
