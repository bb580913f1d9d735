//! Trip lifecycle: `NoTrip -> Active -> Ended`.
//!
//! A bus has at most one `Active` trip. `Ended` is terminal; driving again
//! means starting a new trip. Delay and breakdown reports are informational
//! records and do not change the trip state, only the bus status.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use fleetcore_core::{now_ms, TimestampMs};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::bus::{BusPatch, BusStatus};
use crate::error::{Result, TrackingError};
use crate::registry::BusRegistry;

/// Trip identifier
pub type TripId = String;

/// Lifecycle state of a trip
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TripStatus {
    /// No trip exists for the bus
    NoTrip,
    /// Driver is authorized to push location
    Active,
    /// Terminal
    Ended,
}

/// One drive session of a driver on a bus
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: TripId,
    pub bus_id: String,
    pub driver_id: String,
    pub status: TripStatus,
    pub started_at: Option<TimestampMs>,
    pub ended_at: Option<TimestampMs>,
}

impl Trip {
    pub fn is_active(&self) -> bool {
        self.status == TripStatus::Active
    }
}

/// What a report describes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Delay,
    Breakdown,
}

/// Append-only delay or breakdown record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DelayReport {
    pub trip_id: TripId,
    pub bus_id: String,
    pub kind: ReportKind,
    pub reason: String,
    pub reported_at: TimestampMs,
}

#[derive(Debug, Default)]
struct TripBook {
    trips: HashMap<TripId, Trip>,
    /// Bus ID to its active trip
    active: HashMap<String, TripId>,
    reports: HashMap<TripId, Vec<DelayReport>>,
}

impl TripBook {
    fn active_trip_mut(&mut self, trip_id: &str) -> Result<&mut Trip> {
        match self.trips.get_mut(trip_id) {
            Some(trip) if trip.is_active() => Ok(trip),
            _ => Err(TrackingError::TripNotActive(trip_id.to_string())),
        }
    }
}

fn poisoned<T>(_: PoisonError<T>) -> TrackingError {
    TrackingError::Internal("trip book lock poisoned".to_string())
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(TrackingError::InvalidArgument(format!(
            "{} must not be empty",
            field
        )));
    }
    Ok(())
}

/// Owns trip creation and transitions, and the bus status they imply.
///
/// Lock order is trip book first, registry second. Location ingestion holds
/// the trip book read lock while it writes the registry, so a fix can never
/// land after the trip it belongs to has ended.
#[derive(Debug)]
pub struct TripStateMachine {
    registry: Arc<BusRegistry>,
    book: RwLock<TripBook>,
}

impl TripStateMachine {
    pub fn new(registry: Arc<BusRegistry>) -> Self {
        Self {
            registry,
            book: RwLock::new(TripBook::default()),
        }
    }

    /// Start a trip for `bus_id` driven by `driver_id` and mark the bus active.
    ///
    /// # Errors
    /// * `TripAlreadyActive` - the bus already has an active trip
    /// * `NotFound` - unknown bus
    /// * `InvalidArgument` - empty identifiers
    pub fn start_trip(&self, bus_id: &str, driver_id: &str) -> Result<TripId> {
        require_non_empty("bus id", bus_id)?;
        require_non_empty("driver id", driver_id)?;

        let mut book = self.book.write().map_err(poisoned)?;
        if let Some(trip_id) = book.active.get(bus_id) {
            warn!(bus_id, driver_id, trip_id = %trip_id, "start rejected: trip already active");
            return Err(TrackingError::TripAlreadyActive {
                bus_id: bus_id.to_string(),
                trip_id: trip_id.clone(),
            });
        }

        self.registry.update(
            bus_id,
            BusPatch::status(BusStatus::Active).with_driver(driver_id),
        )?;

        let trip = Trip {
            id: Uuid::new_v4().to_string(),
            bus_id: bus_id.to_string(),
            driver_id: driver_id.to_string(),
            status: TripStatus::Active,
            started_at: Some(now_ms()),
            ended_at: None,
        };
        let trip_id = trip.id.clone();

        book.active.insert(bus_id.to_string(), trip_id.clone());
        book.trips.insert(trip_id.clone(), trip);

        info!(bus_id, driver_id, trip_id = %trip_id, "trip started");
        Ok(trip_id)
    }

    /// End an active trip and return the bus to idle
    ///
    /// # Errors
    /// * `TripNotFound` - unknown trip
    /// * `TripNotActive` - trip already ended
    pub fn end_trip(&self, trip_id: &str) -> Result<Trip> {
        let mut book = self.book.write().map_err(poisoned)?;
        let trip = book
            .trips
            .get(trip_id)
            .ok_or_else(|| TrackingError::TripNotFound(trip_id.to_string()))?;
        if !trip.is_active() {
            return Err(TrackingError::TripNotActive(trip_id.to_string()));
        }
        let bus_id = trip.bus_id.clone();

        self.registry
            .update(&bus_id, BusPatch::status(BusStatus::Idle))?;

        book.active.remove(&bus_id);
        let trip = book.active_trip_mut(trip_id)?;
        trip.status = TripStatus::Ended;
        trip.ended_at = Some(now_ms());
        let ended = trip.clone();

        info!(bus_id = %ended.bus_id, driver_id = %ended.driver_id, trip_id, "trip ended");
        Ok(ended)
    }

    /// Record a delay and mark the bus delayed.
    ///
    /// The status stays `delayed` until [`TripStateMachine::resume`] or the end of the trip.
    pub fn report_delay(&self, trip_id: &str, reason: &str) -> Result<DelayReport> {
        self.report(trip_id, ReportKind::Delay, reason)
    }

    /// Record a breakdown and mark the bus broken down
    pub fn report_breakdown(&self, trip_id: &str, reason: &str) -> Result<DelayReport> {
        self.report(trip_id, ReportKind::Breakdown, reason)
    }

    fn report(&self, trip_id: &str, kind: ReportKind, reason: &str) -> Result<DelayReport> {
        let mut book = self.book.write().map_err(poisoned)?;
        let bus_id = book.active_trip_mut(trip_id)?.bus_id.clone();
        require_non_empty("reason", reason)?;

        let status = match kind {
            ReportKind::Delay => BusStatus::Delayed,
            ReportKind::Breakdown => BusStatus::Breakdown,
        };
        self.registry.update(&bus_id, BusPatch::status(status))?;

        let report = DelayReport {
            trip_id: trip_id.to_string(),
            bus_id: bus_id.clone(),
            kind,
            reason: reason.trim().to_string(),
            reported_at: now_ms(),
        };
        book.reports
            .entry(trip_id.to_string())
            .or_default()
            .push(report.clone());

        warn!(bus_id = %bus_id, trip_id, kind = ?kind, reason = %report.reason, "trip issue reported");
        Ok(report)
    }

    /// Clear a delay or breakdown: the bus goes back to `active`
    pub fn resume(&self, trip_id: &str) -> Result<Trip> {
        let mut book = self.book.write().map_err(poisoned)?;
        let trip = book.active_trip_mut(trip_id)?.clone();
        self.registry
            .update(&trip.bus_id, BusPatch::status(BusStatus::Active))?;
        info!(bus_id = %trip.bus_id, trip_id, "trip resumed");
        Ok(trip)
    }

    /// Look up a trip by identifier
    pub fn trip(&self, trip_id: &str) -> Result<Trip> {
        let book = self.book.read().map_err(poisoned)?;
        book.trips
            .get(trip_id)
            .cloned()
            .ok_or_else(|| TrackingError::TripNotFound(trip_id.to_string()))
    }

    /// The active trip of a bus, if any
    pub fn active_trip(&self, bus_id: &str) -> Result<Option<Trip>> {
        let book = self.book.read().map_err(poisoned)?;
        Ok(book
            .active
            .get(bus_id)
            .and_then(|trip_id| book.trips.get(trip_id))
            .cloned())
    }

    /// Lifecycle state of the bus's current trip
    pub fn trip_status(&self, bus_id: &str) -> Result<TripStatus> {
        Ok(match self.active_trip(bus_id)? {
            Some(_) => TripStatus::Active,
            None => TripStatus::NoTrip,
        })
    }

    /// Reports filed against a trip, oldest first
    pub fn delay_reports(&self, trip_id: &str) -> Result<Vec<DelayReport>> {
        let book = self.book.read().map_err(poisoned)?;
        if !book.trips.contains_key(trip_id) {
            return Err(TrackingError::TripNotFound(trip_id.to_string()));
        }
        Ok(book.reports.get(trip_id).cloned().unwrap_or_default())
    }

    /// Run `f` against the active trip of `bus_id` while transitions are held off
    pub(crate) fn with_active_trip<R>(
        &self,
        bus_id: &str,
        f: impl FnOnce(&Trip) -> Result<R>,
    ) -> Result<R> {
        let book = self.book.read().map_err(poisoned)?;
        let trip = book
            .active
            .get(bus_id)
            .and_then(|trip_id| book.trips.get(trip_id))
            .ok_or_else(|| TrackingError::NoActiveTrip(bus_id.to_string()))?;
        f(trip)
    }
}
