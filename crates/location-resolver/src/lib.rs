//! GPS-assisted address auto-fill
//!
//! Finds where the user is (device watch, then a single device read, then IP
//! geolocation), reverse geocodes the position into a Thai postal address
//! (primary geocoder, then secondary, then a coordinate-only fallback) and
//! writes the result into the address form once.

pub mod config;
pub mod constants;
pub mod debug_log;
pub mod error;
pub mod filler;
pub mod geocoder;
pub mod ip;
pub mod position;
pub mod types;
pub mod validation;
pub mod workflow;

pub use config::Config;
pub use debug_log::{DebugLog, DebugLogEntry};
pub use error::{LocationError, MethodFailure, PositionError, Remediation, Result};
pub use filler::{AddressForm, FormUpdate, SharedForm};
pub use geocoder::ReverseGeocoder;
pub use ip::IpLocator;
pub use position::{
    AcquiredPosition, AcquisitionOutcome, PositionAcquirer, PositionOptions, PositionSample,
    PositionSource, ReportedPositionSource,
};
pub use types::{AddressSource, Coordinate, LocationResult, LocationSource, ResolvedAddress};
pub use validation::{BoundingBox, CoordinateValidator};
pub use workflow::{LocationStrategy, LocationWorkflow, Resolution, WorkflowSettings};
