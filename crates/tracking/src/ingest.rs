//! Driver location ingestion.
//!
//! The only path that advances a bus's location. Checks run in order:
//! coordinate validity, active trip, driver ownership, timestamp freshness.
//! Fixes at or before the last accepted timestamp of the current trip are
//! dropped silently; retransmissions and reordering are normal on mobile links.

use std::sync::Arc;

use fleetcore_core::is_valid_coordinate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::bus::{BusPatch, BusState, LocationFix};
use crate::error::{Result, TrackingError};
use crate::registry::{Applied, BusRegistry};
use crate::trip::TripStateMachine;

/// Result of a location submission that passed validation
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// Fix stored; carries the new snapshot
    Accepted(BusState),
    /// Fix was stale or a duplicate; carries the unchanged snapshot
    Dropped(BusState),
}

impl IngestOutcome {
    /// Bus snapshot after the submission
    pub fn into_state(self) -> BusState {
        match self {
            IngestOutcome::Accepted(state) | IngestOutcome::Dropped(state) => state,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, IngestOutcome::Accepted(_))
    }
}

/// Location update as submitted by a driver client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocationSubmission {
    pub driver_id: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub accuracy: Option<f64>,
    /// Client timestamp, epoch milliseconds
    pub timestamp: i64,
}

impl LocationSubmission {
    pub fn fix(&self) -> LocationFix {
        LocationFix {
            lat: self.lat,
            lng: self.lng,
            accuracy: self.accuracy,
            timestamp: self.timestamp,
        }
    }
}

/// Validates driver fixes and applies them to the registry
#[derive(Debug, Clone)]
pub struct LocationIngestionService {
    registry: Arc<BusRegistry>,
    trips: Arc<TripStateMachine>,
}

impl LocationIngestionService {
    pub fn new(registry: Arc<BusRegistry>, trips: Arc<TripStateMachine>) -> Self {
        Self { registry, trips }
    }

    /// Apply a driver's fix to the bus.
    ///
    /// # Errors
    /// * `InvalidCoordinate` - latitude or longitude out of range
    /// * `NoActiveTrip` - the bus has no active trip
    /// * `Unauthorized` - `driver_id` does not own the active trip
    pub fn submit_location(
        &self,
        bus_id: &str,
        driver_id: &str,
        fix: LocationFix,
    ) -> Result<IngestOutcome> {
        if !is_valid_coordinate(fix.lat, fix.lng) {
            warn!(bus_id, driver_id, lat = fix.lat, lng = fix.lng, "rejected invalid coordinate");
            return Err(TrackingError::InvalidCoordinate {
                lat: fix.lat,
                lng: fix.lng,
            });
        }
        let fix = LocationFix {
            accuracy: fix.accuracy.filter(|a| a.is_finite() && *a >= 0.0),
            ..fix
        };

        let outcome = self.trips.with_active_trip(bus_id, |trip| {
            if trip.driver_id != driver_id {
                return Err(TrackingError::Unauthorized {
                    bus_id: bus_id.to_string(),
                    driver_id: driver_id.to_string(),
                });
            }

            self.registry.update_if(bus_id, |current| {
                match (current.location, current.trip_ref.as_deref()) {
                    (Some(last), Some(last_trip))
                        if last_trip == trip.id && fix.timestamp <= last.timestamp =>
                    {
                        debug!(
                            bus_id,
                            trip_id = %trip.id,
                            received = fix.timestamp,
                            last_accepted = last.timestamp,
                            "dropped stale fix"
                        );
                        None
                    }
                    _ => Some(BusPatch::location(trip.id.clone(), fix)),
                }
            })
        });

        match outcome {
            Ok(Applied::Updated(state)) => {
                debug!(bus_id, timestamp = fix.timestamp, "accepted fix");
                Ok(IngestOutcome::Accepted(state))
            }
            Ok(Applied::Unchanged(state)) => Ok(IngestOutcome::Dropped(state)),
            Err(err) => {
                warn!(bus_id, driver_id, error = %err, "location submission rejected");
                Err(err)
            }
        }
    }

    /// Convenience wrapper for wire submissions
    pub fn submit(&self, bus_id: &str, submission: &LocationSubmission) -> Result<IngestOutcome> {
        self.submit_location(bus_id, &submission.driver_id, submission.fix())
    }
}
