//! Reverse Geocoding Clients
//!
//! Two clients for turning coordinates into a Thai postal address:
//!
//! - [`NominatimClient`] talks to a Nominatim-compatible `/reverse` endpoint and
//!   reads the structured `address` object, with rate limiting (1 req/sec by
//!   default) and moka async caching.
//! - [`DisplayNameClient`] talks to a secondary service that only returns a
//!   free-text `display_name`, which is split on commas.
//!
//! Both produce a [`ParsedAddress`].

mod client;
mod error;
mod parse;
mod secondary;
mod types;

pub use client::NominatimClient;
pub use error::{GeocodingError, Result};
pub use parse::{parse_display_name, parse_structured_address};
pub use secondary::DisplayNameClient;
pub use types::{ClientConfig, HouseNumberPolicy, NominatimAddress, ParsedAddress};
