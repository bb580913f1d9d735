//! Great-circle geometry for fleet positions.
//!
//! Every component that accepts raw coordinates guards them with
//! [`is_valid_coordinate`] before doing anything else. Out-of-range values are
//! rejected as [`GeoError::InvalidCoordinate`], never clamped.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mean Earth radius used by the haversine formula, in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Errors raised by coordinate validation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    #[error("Invalid coordinate: lat={lat}, lng={lng}")]
    InvalidCoordinate { lat: f64, lng: f64 },
}

/// Geographic point in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees (-90 to 90)
    pub lat: f64,
    /// Longitude in degrees (-180 to 180)
    pub lng: f64,
}

impl GeoPoint {
    /// Create a validated point
    ///
    /// # Returns
    /// * `Ok(GeoPoint)` - Valid coordinate
    /// * `Err(GeoError::InvalidCoordinate)` - Latitude or longitude out of range
    pub fn new(lat: f64, lng: f64) -> Result<Self, GeoError> {
        let point = Self { lat, lng };
        point.validate()?;
        Ok(point)
    }

    /// Check this point against the coordinate ranges
    pub fn validate(&self) -> Result<(), GeoError> {
        if is_valid_coordinate(self.lat, self.lng) {
            Ok(())
        } else {
            Err(GeoError::InvalidCoordinate {
                lat: self.lat,
                lng: self.lng,
            })
        }
    }

    /// Haversine distance to another point in meters
    pub fn distance_to(&self, other: &GeoPoint) -> Result<f64, GeoError> {
        distance_meters(self, other)
    }
}

/// Range check: `-90 <= lat <= 90` and `-180 <= lng <= 180`, bounds inclusive.
///
/// NaN fails both ranges and is therefore rejected.
pub fn is_valid_coordinate(lat: f64, lng: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng)
}

/// Great-circle distance between two points in meters.
///
/// Uses the haversine formula with [`EARTH_RADIUS_M`]. Both points are
/// validated first.
pub fn distance_meters(a: &GeoPoint, b: &GeoPoint) -> Result<f64, GeoError> {
    a.validate()?;
    b.validate()?;

    let lat1_rad = a.lat.to_radians();
    let lat2_rad = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);

    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    Ok(EARTH_RADIUS_M * c)
}
