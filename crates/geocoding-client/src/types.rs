use std::time::Duration;

use serde::{Deserialize, Serialize};

const DEFAULT_USER_AGENT: &str = "geocoding-client-rs/0.1";

/// Address fields produced by either reverse geocoding client
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedAddress {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub house_number: Option<String>,
    /// True when `house_number` is a generated placeholder, not service data
    pub house_number_synthesized: bool,
    pub address_line: String,
    pub subdistrict: String,
    pub district: String,
    pub province: String,
    pub postal_code: String,
    /// Untouched service response
    pub raw: serde_json::Value,
}

/// What to put in the house number slot when the service has none
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HouseNumberPolicy {
    /// Leave the house number out of the address line
    #[default]
    Omit,
    /// Insert a random number in 100..=999 and flag it as synthesized
    Placeholder,
}

impl HouseNumberPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "omit" => Some(Self::Omit),
            "placeholder" => Some(Self::Placeholder),
            _ => None,
        }
    }
}

/// Connection settings shared by both clients
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    /// Pause held after every request before the next one may start
    pub request_interval: Duration,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
            request_interval: Duration::ZERO,
        }
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_request_interval(mut self, interval: Duration) -> Self {
        self.request_interval = interval;
        self
    }

    pub(crate) fn build_http_client(&self) -> crate::Result<reqwest::Client> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.as_str())
            .build()?;
        Ok(client)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct NominatimResponse {
    pub(crate) address: Option<NominatimAddress>,
    pub(crate) error: Option<String>,
}

/// The structured `address` object of a Nominatim reverse lookup
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NominatimAddress {
    pub house_number: Option<String>,
    pub road: Option<String>,
    pub suburb: Option<String>,
    pub neighbourhood: Option<String>,
    pub city_district: Option<String>,
    pub district: Option<String>,
    pub county: Option<String>,
    pub state: Option<String>,
    pub province: Option<String>,
    pub city: Option<String>,
    pub postcode: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DisplayNameResponse {
    pub(crate) display_name: Option<String>,
    pub(crate) error: Option<String>,
}
