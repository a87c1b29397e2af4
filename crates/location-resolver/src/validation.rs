//! Coordinate sanity checks

use serde::{Deserialize, Serialize};

use crate::error::{LocationError, Result};

/// Rectangular latitude/longitude range a coordinate must fall inside
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl BoundingBox {
    /// Thailand
    pub const THAILAND: BoundingBox = BoundingBox {
        min_latitude: 5.6,
        max_latitude: 20.5,
        min_longitude: 97.3,
        max_longitude: 105.6,
    };

    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        (self.min_latitude..=self.max_latitude).contains(&latitude)
            && (self.min_longitude..=self.max_longitude).contains(&longitude)
    }

    /// Parse `min_lat,max_lat,min_lon,max_lon`
    pub fn parse(value: &str) -> Option<Self> {
        let parts: Vec<f64> = value
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<std::result::Result<_, _>>()
            .ok()?;

        match parts.as_slice() {
            [min_lat, max_lat, min_lon, max_lon]
                if min_lat < max_lat && min_lon < max_lon =>
            {
                Some(Self {
                    min_latitude: *min_lat,
                    max_latitude: *max_lat,
                    min_longitude: *min_lon,
                    max_longitude: *max_lon,
                })
            }
            _ => None,
        }
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::THAILAND
    }
}

/// Rejects (0,0), out-of-range and out-of-region coordinates
#[derive(Debug, Clone, Copy, Default)]
pub struct CoordinateValidator {
    bounds: BoundingBox,
}

impl CoordinateValidator {
    pub fn new(bounds: BoundingBox) -> Self {
        Self { bounds }
    }

    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    pub fn is_valid(&self, latitude: f64, longitude: f64) -> bool {
        if !latitude.is_finite() || !longitude.is_finite() {
            return false;
        }
        // Null island is what flaky hardware reports instead of an error
        if latitude == 0.0 && longitude == 0.0 {
            return false;
        }
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return false;
        }
        self.bounds.contains(latitude, longitude)
    }

    pub fn validate(&self, latitude: f64, longitude: f64) -> Result<()> {
        if self.is_valid(latitude, longitude) {
            Ok(())
        } else {
            Err(LocationError::InvalidCoordinate(latitude, longitude))
        }
    }
}
