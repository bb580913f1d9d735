//! Bus state as stored by the registry and served to readers

use fleetcore_core::{BusSpec, GeoPoint, TimestampMs};
use serde::{Deserialize, Serialize};

/// Operational status of a bus
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum BusStatus {
    /// No trip in progress
    #[default]
    Idle,
    /// Trip in progress
    Active,
    /// Trip in progress, delay reported
    Delayed,
    /// Trip in progress, breakdown reported
    Breakdown,
}

impl BusStatus {
    /// Wire name of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            BusStatus::Idle => "idle",
            BusStatus::Active => "active",
            BusStatus::Delayed => "delayed",
            BusStatus::Breakdown => "breakdown",
        }
    }
}

/// A position report with its client timestamp
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LocationFix {
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Longitude in decimal degrees
    pub lng: f64,
    /// Horizontal accuracy in meters, when the device reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    /// Client timestamp, epoch milliseconds
    pub timestamp: TimestampMs,
}

impl LocationFix {
    /// Create a fix without accuracy information
    pub fn new(lat: f64, lng: f64, timestamp: TimestampMs) -> Self {
        Self {
            lat,
            lng,
            accuracy: None,
            timestamp,
        }
    }

    /// Attach an accuracy radius
    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    /// The coordinate part of the fix
    pub fn point(&self) -> GeoPoint {
        GeoPoint {
            lat: self.lat,
            lng: self.lng,
        }
    }
}

/// Current state of one fleet vehicle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BusState {
    pub id: String,
    pub name: String,
    pub status: BusStatus,
    /// Absent until the first accepted fix
    pub location: Option<LocationFix>,
    pub capacity: u32,
    pub current_passengers: u32,
    pub driver_ref: Option<String>,
    pub route_ref: Option<String>,
    /// Trip during which `location` was reported
    pub trip_ref: Option<String>,
}

impl BusState {
    /// Idle bus with no location
    pub fn new(id: impl Into<String>, capacity: u32) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            status: BusStatus::Idle,
            location: None,
            capacity,
            current_passengers: 0,
            driver_ref: None,
            route_ref: None,
            trip_ref: None,
        }
    }

    /// Whether the passenger count exceeds capacity (soft limit: logged, not enforced)
    pub fn is_over_capacity(&self) -> bool {
        self.current_passengers > self.capacity
    }

    /// Age of the last fix relative to `now_ms`; clock skew counts as zero age
    pub fn location_age_ms(&self, now_ms: TimestampMs) -> Option<i64> {
        self.location
            .map(|fix| now_ms.saturating_sub(fix.timestamp).max(0))
    }
}

impl From<&BusSpec> for BusState {
    fn from(spec: &BusSpec) -> Self {
        Self {
            id: spec.id.clone(),
            name: spec.name.clone(),
            status: BusStatus::Idle,
            location: None,
            capacity: spec.capacity,
            current_passengers: 0,
            driver_ref: spec.driver_id.clone(),
            route_ref: spec.route_id.clone(),
            trip_ref: None,
        }
    }
}

/// Partial update applied atomically by the registry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BusPatch {
    pub location: Option<LocationFix>,
    /// Trip the new location belongs to; only meaningful with `location`
    pub trip_ref: Option<String>,
    pub status: Option<BusStatus>,
    pub current_passengers: Option<u32>,
    pub driver_ref: Option<String>,
}

impl BusPatch {
    pub fn status(status: BusStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn location(trip_id: impl Into<String>, fix: LocationFix) -> Self {
        Self {
            location: Some(fix),
            trip_ref: Some(trip_id.into()),
            ..Self::default()
        }
    }

    pub fn passengers(count: u32) -> Self {
        Self {
            current_passengers: Some(count),
            ..Self::default()
        }
    }

    pub fn with_driver(mut self, driver_id: impl Into<String>) -> Self {
        self.driver_ref = Some(driver_id.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.location.is_none()
            && self.status.is_none()
            && self.current_passengers.is_none()
            && self.driver_ref.is_none()
    }

    pub(crate) fn apply(self, state: &mut BusState) {
        if let Some(fix) = self.location {
            state.location = Some(fix);
            state.trip_ref = self.trip_ref;
        }
        if let Some(status) = self.status {
            state.status = status;
        }
        if let Some(count) = self.current_passengers {
            state.current_passengers = count;
        }
        if let Some(driver) = self.driver_ref {
            state.driver_ref = Some(driver);
        }
    }
}
