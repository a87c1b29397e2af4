//! Address parsing for both service response shapes

use rand::Rng;
use regex::Regex;

use crate::types::{HouseNumberPolicy, NominatimAddress, ParsedAddress};

/// Marker for a sub-lane; such road names are already fully qualified
const SOI_MARKER: &str = "ซอย";
/// Road designator prefixed onto bare road names
const ROAD_PREFIX: &str = "ถนน";
const COUNTRY_NAMES: [&str; 2] = ["ประเทศไทย", "thailand"];

lazy_static::lazy_static! {
    static ref POSTAL_CODE: Regex = Regex::new(r"\b[0-9]{5}\b").unwrap();
}

/// Map a structured Nominatim address onto the Thai address shape
pub fn parse_structured_address(
    addr: &NominatimAddress,
    policy: HouseNumberPolicy,
) -> ParsedAddress {
    let (house_number, house_number_synthesized) =
        house_number_or_placeholder(non_empty(&addr.house_number), policy);

    let road = non_empty(&addr.road).map(format_road);
    let address_line = join_non_empty(&[house_number.as_deref(), road.as_deref()]);

    let subdistrict = first_present(&[&addr.suburb, &addr.neighbourhood]);
    let district = first_present(&[&addr.city_district, &addr.district, &addr.county]);
    let province = first_present(&[&addr.state, &addr.province, &addr.city]);
    let postal_code = non_empty(&addr.postcode).unwrap_or_default();

    ParsedAddress {
        house_number,
        house_number_synthesized,
        address_line,
        subdistrict,
        district,
        province,
        postal_code,
        raw: serde_json::Value::Null,
    }
}

/// Split a free-text `display_name` into the Thai address shape
///
/// The split is positional: first segment is the address line, then counting
/// from the end (after removing the postal code and dropping country
/// segments) come province, district and subdistrict.
pub fn parse_display_name(display_name: &str, policy: HouseNumberPolicy) -> ParsedAddress {
    let raw_segments: Vec<&str> = display_name
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let postal_code = raw_segments
        .iter()
        .rev()
        .find_map(|segment| POSTAL_CODE.find(segment))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();

    let mut segments: Vec<String> = raw_segments
        .iter()
        .map(|segment| strip_postal_code(segment, &postal_code))
        .filter(|s| !s.is_empty())
        .collect();

    while segments.last().is_some_and(|last| is_country(last)) {
        segments.pop();
    }
    let count = segments.len();
    let from_end = |offset: usize| -> String {
        if count > offset {
            segments[count - offset].clone()
        } else {
            String::new()
        }
    };

    let (house_number, house_number_synthesized) = house_number_or_placeholder(None, policy);
    let address_line = join_non_empty(&[house_number.as_deref(), segments.first().map(String::as_str)]);

    ParsedAddress {
        house_number,
        house_number_synthesized,
        address_line,
        subdistrict: from_end(3),
        district: from_end(2),
        province: from_end(1),
        postal_code,
        raw: serde_json::Value::Null,
    }
}

/// Prefix a bare road name with the road designator
fn format_road(road: String) -> String {
    if road.contains(SOI_MARKER) || road.starts_with(ROAD_PREFIX) {
        road
    } else {
        format!("{ROAD_PREFIX}{road}")
    }
}

fn house_number_or_placeholder(
    house_number: Option<String>,
    policy: HouseNumberPolicy,
) -> (Option<String>, bool) {
    match (house_number, policy) {
        (Some(number), _) => (Some(number), false),
        (None, HouseNumberPolicy::Omit) => (None, false),
        (None, HouseNumberPolicy::Placeholder) => {
            let number: u16 = rand::rng().random_range(100..=999);
            (Some(number.to_string()), true)
        }
    }
}

/// Remove every standalone occurrence of `code` and tidy the whitespace left behind
fn strip_postal_code(segment: &str, code: &str) -> String {
    if code.is_empty() {
        return segment.to_string();
    }
    POSTAL_CODE
        .replace_all(segment, |caps: &regex::Captures| {
            if &caps[0] == code {
                String::new()
            } else {
                caps[0].to_string()
            }
        })
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_country(segment: &str) -> bool {
    let lowered = segment.to_lowercase();
    COUNTRY_NAMES.iter().any(|name| lowered == *name)
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn first_present(candidates: &[&Option<String>]) -> String {
    candidates
        .iter()
        .find_map(|candidate| non_empty(candidate))
        .unwrap_or_default()
}

fn join_non_empty(parts: &[Option<&str>]) -> String {
    parts
        .iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}
