//! Reverse geocoding with primary, secondary and coordinate-only fallbacks

use geocoding_client::{DisplayNameClient, NominatimClient, ParsedAddress};
use serde_json::json;
use tracing::{info, warn};

use crate::constants::UNKNOWN_FIELD;
use crate::debug_log::DebugLog;
use crate::types::{AddressSource, Coordinate, ResolvedAddress};
use crate::validation::CoordinateValidator;

/// Turns a coordinate into an address; never fails
pub struct ReverseGeocoder {
    primary: NominatimClient,
    secondary: DisplayNameClient,
    validator: CoordinateValidator,
}

impl ReverseGeocoder {
    pub fn new(
        primary: NominatimClient,
        secondary: DisplayNameClient,
        validator: CoordinateValidator,
    ) -> Self {
        Self {
            primary,
            secondary,
            validator,
        }
    }

    pub fn validator(&self) -> CoordinateValidator {
        self.validator
    }

    /// Best-effort address for `coordinate`, recording each attempt in `log`
    pub async fn reverse_geocode(&self, coordinate: &Coordinate, log: &DebugLog) -> ResolvedAddress {
        let (lat, lon) = (coordinate.latitude, coordinate.longitude);

        if !self.validator.is_valid(lat, lon) {
            warn!(lat, lon, "Coordinate failed validation, skipping geocoders");
            log.record(
                "Coordinate failed validation, skipping geocoders",
                Some(json!({ "lat": lat, "lon": lon, "bounds": self.validator.bounds() })),
            );
            return fallback_address(coordinate);
        }

        log.record("Trying primary geocoder", Some(json!({ "lat": lat, "lon": lon })));
        match self.primary.reverse_geocode(lat, lon).await {
            Ok(parsed) if has_content(&parsed) => {
                log.record(
                    "Primary geocoder succeeded",
                    Some(json!({ "province": parsed.province, "postalCode": parsed.postal_code })),
                );
                return resolved(parsed, AddressSource::Primary);
            }
            Ok(_) => {
                warn!(lat, lon, "Primary geocoder returned an empty address");
                log.record("Primary geocoder returned an empty address", None);
            }
            Err(e) => {
                warn!(lat, lon, error = %e, "Primary geocoder failed");
                log.record("Primary geocoder failed", Some(json!({ "error": e.to_string() })));
            }
        }

        log.record("Trying secondary geocoder", Some(json!({ "lat": lat, "lon": lon })));
        match self.secondary.reverse_geocode(lat, lon).await {
            Ok(parsed) if has_content(&parsed) => {
                log.record(
                    "Secondary geocoder succeeded",
                    Some(json!({ "province": parsed.province, "postalCode": parsed.postal_code })),
                );
                return resolved(parsed, AddressSource::Secondary);
            }
            Ok(_) => {
                warn!(lat, lon, "Secondary geocoder returned an empty address");
                log.record("Secondary geocoder returned an empty address", None);
            }
            Err(e) => {
                warn!(lat, lon, error = %e, "Secondary geocoder failed");
                log.record("Secondary geocoder failed", Some(json!({ "error": e.to_string() })));
            }
        }

        info!(lat, lon, "Both geocoders failed, using coordinate address");
        log.record("Using coordinate fallback address", None);
        fallback_address(coordinate)
    }
}

/// Address that only carries the raw coordinate
pub fn fallback_address(coordinate: &Coordinate) -> ResolvedAddress {
    ResolvedAddress {
        address_line: format!(
            "พิกัด GPS: {}, {}",
            coordinate.latitude, coordinate.longitude
        ),
        subdistrict: UNKNOWN_FIELD.to_string(),
        district: UNKNOWN_FIELD.to_string(),
        province: UNKNOWN_FIELD.to_string(),
        postal_code: UNKNOWN_FIELD.to_string(),
        source_service: AddressSource::Fallback,
        fallback: true,
        house_number_synthesized: false,
        raw: json!({
            "latitude": coordinate.latitude,
            "longitude": coordinate.longitude,
            "accuracyMeters": coordinate.accuracy_meters,
        }),
    }
}

fn resolved(parsed: ParsedAddress, source: AddressSource) -> ResolvedAddress {
    ResolvedAddress {
        address_line: parsed.address_line,
        subdistrict: parsed.subdistrict,
        district: parsed.district,
        province: parsed.province,
        postal_code: parsed.postal_code,
        source_service: source,
        fallback: false,
        house_number_synthesized: parsed.house_number_synthesized,
        raw: parsed.raw,
    }
}

fn has_content(parsed: &ParsedAddress) -> bool {
    [
        &parsed.address_line,
        &parsed.subdistrict,
        &parsed.district,
        &parsed.province,
        &parsed.postal_code,
    ]
    .iter()
    .any(|field| !field.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_address_embeds_coordinate() {
        let address = fallback_address(&Coordinate::new(13.7563, 100.5018, 20.0));
        assert!(address.fallback);
        assert_eq!(address.source_service, AddressSource::Fallback);
        assert!(address.address_line.contains("13.7563"));
        assert!(address.address_line.contains("100.5018"));
        assert_eq!(address.province, UNKNOWN_FIELD);
        assert_eq!(address.postal_code, UNKNOWN_FIELD);
        assert_eq!(address.raw["accuracyMeters"], 20.0);
    }

    #[test]
    fn test_has_content() {
        assert!(!has_content(&ParsedAddress::default()));
        let parsed = ParsedAddress {
            postal_code: "10110".to_string(),
            ..Default::default()
        };
        assert!(has_content(&parsed));
    }
}
