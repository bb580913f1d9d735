//! Read side for students and administrators.
//!
//! Last-value-wins: a read returns whatever the registry holds at that
//! instant. There is no queue and no history, and a read never waits for a
//! fresher value. Staleness is advisory and computed per read.

use std::collections::BTreeMap;
use std::sync::Arc;

use fleetcore_core::{now_ms, TimestampMs};
use serde::{Deserialize, Serialize};

use crate::bus::{BusState, BusStatus};
use crate::error::Result;
use crate::registry::BusRegistry;

/// Bus snapshot with read-time freshness
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BusView {
    #[serde(flatten)]
    pub bus: BusState,
    /// Last fix is older than the stale threshold
    pub stale: bool,
    /// Age of the last fix; absent until the bus reports
    pub age_ms: Option<i64>,
}

/// Fleet-wide counters for the admin dashboard
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FleetSummary {
    pub total_buses: usize,
    pub by_status: BTreeMap<String, usize>,
    pub reporting: usize,
    pub stale: usize,
    pub total_passengers: u64,
    pub total_capacity: u64,
}

/// Serves current bus state to any number of concurrent pollers
#[derive(Debug, Clone)]
pub struct LocationBroadcastService {
    registry: Arc<BusRegistry>,
    stale_after_ms: i64,
}

impl LocationBroadcastService {
    pub fn new(registry: Arc<BusRegistry>, stale_after_ms: i64) -> Self {
        Self {
            registry,
            stale_after_ms,
        }
    }

    pub fn stale_after_ms(&self) -> i64 {
        self.stale_after_ms
    }

    /// Latest state of one bus
    pub fn read(&self, bus_id: &str) -> Result<BusView> {
        self.read_at(bus_id, now_ms())
    }

    /// Latest state of one bus, freshness judged against `now`
    pub fn read_at(&self, bus_id: &str, now: TimestampMs) -> Result<BusView> {
        let bus = self.registry.get(bus_id)?;
        Ok(self.view(bus, now))
    }

    /// Latest state of every bus
    pub fn list(&self) -> Result<Vec<BusView>> {
        self.list_at(now_ms())
    }

    pub fn list_at(&self, now: TimestampMs) -> Result<Vec<BusView>> {
        Ok(self
            .registry
            .list()?
            .into_iter()
            .map(|bus| self.view(bus, now))
            .collect())
    }

    /// Counters over the whole fleet
    pub fn summary(&self) -> Result<FleetSummary> {
        self.summary_at(now_ms())
    }

    pub fn summary_at(&self, now: TimestampMs) -> Result<FleetSummary> {
        let views = self.list_at(now)?;

        let mut summary = FleetSummary {
            total_buses: views.len(),
            ..FleetSummary::default()
        };
        for status in [
            BusStatus::Idle,
            BusStatus::Active,
            BusStatus::Delayed,
            BusStatus::Breakdown,
        ] {
            summary.by_status.insert(status.as_str().to_string(), 0);
        }

        for view in &views {
            *summary
                .by_status
                .entry(view.bus.status.as_str().to_string())
                .or_default() += 1;
            if view.bus.location.is_some() {
                summary.reporting += 1;
            }
            if view.stale {
                summary.stale += 1;
            }
            summary.total_passengers += u64::from(view.bus.current_passengers);
            summary.total_capacity += u64::from(view.bus.capacity);
        }
        Ok(summary)
    }

    fn view(&self, bus: BusState, now: TimestampMs) -> BusView {
        let age_ms = bus.location_age_ms(now);
        BusView {
            stale: age_ms.is_some_and(|age| age > self.stale_after_ms),
            age_ms,
            bus,
        }
    }
}
