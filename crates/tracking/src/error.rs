//! Tracking errors
//!
//! The closed set of failures callers can receive. Stale or duplicate
//! location updates are not errors and never appear here.

use fleetcore_core::GeoError;
use thiserror::Error;

/// Tracking engine error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackingError {
    /// Coordinate outside the valid latitude/longitude range
    #[error("Invalid coordinate: lat={lat}, lng={lng}")]
    InvalidCoordinate {
        /// Rejected latitude
        lat: f64,
        /// Rejected longitude
        lng: f64,
    },

    /// Location submitted for a bus without an active trip
    #[error("No active trip for bus {0}")]
    NoActiveTrip(String),

    /// Driver does not own the active trip of the bus
    #[error("Driver {driver_id} is not assigned to the active trip of bus {bus_id}")]
    Unauthorized {
        /// Bus identifier
        bus_id: String,
        /// Rejected driver
        driver_id: String,
    },

    /// A trip is already active for the bus
    #[error("Bus {bus_id} already has active trip {trip_id}")]
    TripAlreadyActive {
        /// Bus identifier
        bus_id: String,
        /// The trip that is still active
        trip_id: String,
    },

    /// Trip exists but is not active, or does not exist for delay reporting
    #[error("Trip {0} is not active")]
    TripNotActive(String),

    /// Unknown trip identifier
    #[error("Trip not found: {0}")]
    TripNotFound(String),

    /// Malformed argument (empty reason, empty identifier)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Unknown bus, route or stop
    #[error("Not found: {0}")]
    NotFound(String),

    /// Poisoned lock; details are logged, never returned to clients
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TrackingError {
    /// Stable machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            TrackingError::InvalidCoordinate { .. } => "InvalidCoordinate",
            TrackingError::NoActiveTrip(_) => "NoActiveTrip",
            TrackingError::Unauthorized { .. } => "Unauthorized",
            TrackingError::TripAlreadyActive { .. } => "TripAlreadyActive",
            TrackingError::TripNotActive(_) => "TripNotActive",
            TrackingError::TripNotFound(_) => "TripNotFound",
            TrackingError::InvalidArgument(_) => "InvalidArgument",
            TrackingError::NotFound(_) => "NotFound",
            TrackingError::Internal(_) => "Internal",
        }
    }
}

impl From<GeoError> for TrackingError {
    fn from(err: GeoError) -> Self {
        match err {
            GeoError::InvalidCoordinate { lat, lng } => TrackingError::InvalidCoordinate { lat, lng },
        }
    }
}

/// Result type for tracking operations
pub type Result<T> = std::result::Result<T, TrackingError>;
