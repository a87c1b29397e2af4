//! Error types for location resolution

use std::fmt;

use crate::workflow::LocationStrategy;

/// Failures reported by a device positioning capability
#[derive(Debug, Clone, PartialEq)]
pub enum PositionError {
    PermissionDenied,
    Unavailable(String),
    Timeout,
}

impl fmt::Display for PositionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PermissionDenied => write!(f, "Location permission denied"),
            Self::Unavailable(msg) => write!(f, "Position unavailable: {}", msg),
            Self::Timeout => write!(f, "Position request timed out"),
        }
    }
}

impl std::error::Error for PositionError {}

/// One failed step of the location fallback chain
#[derive(Debug)]
pub struct MethodFailure {
    pub strategy: LocationStrategy,
    pub error: LocationError,
}

impl fmt::Display for MethodFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.strategy, self.error)
    }
}

#[derive(Debug)]
pub enum LocationError {
    PositionPermissionDenied,
    PositionTimeout,
    /// No position samples at all
    PositionUnavailable(String),
    Network(String),
    InvalidCoordinate(f64, f64),
    /// Terminal: every location method failed
    AllLocationMethodsFailed(Vec<MethodFailure>),
    AlreadyInProgress,
    Geocoding(geocoding_client::GeocodingError),
    Cache(location_cache::CacheError),
    Config(String),
}

/// Steps shown to the user alongside a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Remediation {
    pub title: &'static str,
    pub steps: &'static [&'static str],
}

const PERMISSION_REMEDIATION: Remediation = Remediation {
    title: "Location access is turned off",
    steps: &[
        "Open the system or browser settings for this application",
        "Allow access to your location",
        "Try filling the address from your location again",
    ],
};

const TIMEOUT_REMEDIATION: Remediation = Remediation {
    title: "Could not get a location fix in time",
    steps: &[
        "Move outdoors or next to a window for a clearer GPS signal",
        "Make sure location services are switched on",
        "Check your internet connection",
    ],
};

impl LocationError {
    /// Status line shown to the user
    pub fn status_message(&self) -> String {
        match self {
            Self::PositionPermissionDenied => "Location permission was denied".to_string(),
            Self::PositionTimeout => "Timed out while waiting for a location".to_string(),
            Self::PositionUnavailable(_) => "Your location is currently unavailable".to_string(),
            Self::Network(_) => "Network error while looking up your location".to_string(),
            Self::InvalidCoordinate(..) => "The location received is not valid".to_string(),
            Self::AllLocationMethodsFailed(failures) => format!(
                "Could not determine your location ({} methods tried)",
                failures.len()
            ),
            Self::AlreadyInProgress => "A location lookup is already in progress".to_string(),
            Self::Geocoding(_) | Self::Cache(_) | Self::Config(_) => {
                "Location lookup is not available right now".to_string()
            }
        }
    }

    /// Remediation steps for permission and timeout failures
    pub fn remediation(&self) -> Option<Remediation> {
        match self {
            Self::PositionPermissionDenied => Some(PERMISSION_REMEDIATION),
            Self::PositionTimeout => Some(TIMEOUT_REMEDIATION),
            Self::AllLocationMethodsFailed(failures) => {
                let has = |wanted: fn(&LocationError) -> bool| {
                    failures.iter().any(|failure| wanted(&failure.error))
                };
                if has(|e| matches!(e, Self::PositionPermissionDenied)) {
                    Some(PERMISSION_REMEDIATION)
                } else if has(|e| matches!(e, Self::PositionTimeout)) {
                    Some(TIMEOUT_REMEDIATION)
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

impl fmt::Display for LocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PositionPermissionDenied => write!(f, "Location permission denied"),
            Self::PositionTimeout => write!(f, "Position request timed out"),
            Self::PositionUnavailable(msg) => write!(f, "Position unavailable: {}", msg),
            Self::Network(msg) => write!(f, "Network error: {}", msg),
            Self::InvalidCoordinate(lat, lon) => write!(f, "Invalid coordinate: {lat}, {lon}"),
            Self::AllLocationMethodsFailed(failures) => {
                write!(f, "All location methods failed")?;
                for failure in failures {
                    write!(f, "; {}", failure)?;
                }
                Ok(())
            }
            Self::AlreadyInProgress => write!(f, "Location resolution already in progress"),
            Self::Geocoding(e) => write!(f, "Geocoding error: {}", e),
            Self::Cache(e) => write!(f, "{}", e),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for LocationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Geocoding(e) => Some(e),
            Self::Cache(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PositionError> for LocationError {
    fn from(err: PositionError) -> Self {
        match err {
            PositionError::PermissionDenied => Self::PositionPermissionDenied,
            PositionError::Timeout => Self::PositionTimeout,
            PositionError::Unavailable(msg) => Self::PositionUnavailable(msg),
        }
    }
}

impl From<reqwest::Error> for LocationError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl From<geocoding_client::GeocodingError> for LocationError {
    fn from(err: geocoding_client::GeocodingError) -> Self {
        Self::Geocoding(err)
    }
}

impl From<location_cache::CacheError> for LocationError {
    fn from(err: location_cache::CacheError) -> Self {
        Self::Cache(err)
    }
}

impl From<tracing_subscriber::filter::ParseError> for LocationError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        Self::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LocationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_error_conversion() {
        assert!(matches!(
            LocationError::from(PositionError::PermissionDenied),
            LocationError::PositionPermissionDenied
        ));
        assert!(matches!(
            LocationError::from(PositionError::Unavailable("no fix".into())),
            LocationError::PositionUnavailable(ref msg) if msg == "no fix"
        ));
    }

    #[test]
    fn test_all_methods_failed_lists_every_message() {
        let err = LocationError::AllLocationMethodsFailed(vec![
            MethodFailure {
                strategy: LocationStrategy::DeviceWatch,
                error: LocationError::PositionTimeout,
            },
            MethodFailure {
                strategy: LocationStrategy::DeviceSingleRead,
                error: LocationError::PositionUnavailable("no samples".into()),
            },
            MethodFailure {
                strategy: LocationStrategy::IpLookup,
                error: LocationError::Network("connection refused".into()),
            },
        ]);

        let text = err.to_string();
        assert!(text.contains("timed out"));
        assert!(text.contains("no samples"));
        assert!(text.contains("connection refused"));
        assert_eq!(err.remediation(), Some(TIMEOUT_REMEDIATION));
    }

    #[test]
    fn test_permission_remediation_takes_priority() {
        let err = LocationError::AllLocationMethodsFailed(vec![
            MethodFailure {
                strategy: LocationStrategy::DeviceWatch,
                error: LocationError::PositionPermissionDenied,
            },
            MethodFailure {
                strategy: LocationStrategy::DeviceSingleRead,
                error: LocationError::PositionTimeout,
            },
        ]);
        assert_eq!(err.remediation(), Some(PERMISSION_REMEDIATION));
    }

    #[test]
    fn test_network_error_has_no_remediation() {
        let err = LocationError::Network("dns".into());
        assert!(err.remediation().is_none());
        assert_eq!(err.status_message(), "Network error while looking up your location");
    }
}
