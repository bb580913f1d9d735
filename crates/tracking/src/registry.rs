//! Bus registry: the authoritative map from bus identifier to [`BusState`].
//!
//! Every mutation of bus state goes through [`BusRegistry::update`] or
//! [`BusRegistry::update_if`]. Each bus sits behind its own lock, so writers
//! to different buses never contend and readers of the same bus only wait for
//! an in-flight update of that bus. Readers always receive a copy.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use fleetcore_core::BusSpec;
use tracing::{debug, warn};

use crate::bus::{BusPatch, BusState, BusStatus};
use crate::error::{Result, TrackingError};

type Slot = Arc<RwLock<BusState>>;

fn poisoned<T>(_: PoisonError<T>) -> TrackingError {
    TrackingError::Internal("bus registry lock poisoned".to_string())
}

/// Outcome of a conditional update
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    /// The patch was applied; carries the new snapshot
    Updated(BusState),
    /// The guard declined; carries the unchanged snapshot
    Unchanged(BusState),
}

impl Applied {
    /// Snapshot after the call, whether or not it changed
    pub fn into_state(self) -> BusState {
        match self {
            Applied::Updated(state) | Applied::Unchanged(state) => state,
        }
    }

    pub fn is_updated(&self) -> bool {
        matches!(self, Applied::Updated(_))
    }
}

/// In-memory bus registry with per-bus locking
#[derive(Debug, Default)]
pub struct BusRegistry {
    /// Map of bus ID to its state slot
    buses: RwLock<HashMap<String, Slot>>,
}

impl BusRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from provisioned bus specs
    pub fn from_specs<'a>(specs: impl IntoIterator<Item = &'a BusSpec>) -> Result<Self> {
        let registry = Self::new();
        for spec in specs {
            registry.register(BusState::from(spec))?;
        }
        Ok(registry)
    }

    /// Register a bus. Re-registering an existing identifier is rejected.
    pub fn register(&self, state: BusState) -> Result<()> {
        if state.id.trim().is_empty() {
            return Err(TrackingError::InvalidArgument(
                "bus id must not be empty".to_string(),
            ));
        }
        let mut buses = self.buses.write().map_err(poisoned)?;
        if buses.contains_key(&state.id) {
            return Err(TrackingError::InvalidArgument(format!(
                "bus {} already registered",
                state.id
            )));
        }
        debug!(bus_id = %state.id, capacity = state.capacity, "registered bus");
        buses.insert(state.id.clone(), Arc::new(RwLock::new(state)));
        Ok(())
    }

    fn slot(&self, bus_id: &str) -> Result<Slot> {
        let buses = self.buses.read().map_err(poisoned)?;
        buses
            .get(bus_id)
            .cloned()
            .ok_or_else(|| TrackingError::NotFound(format!("bus {}", bus_id)))
    }

    /// Snapshot of one bus
    pub fn get(&self, bus_id: &str) -> Result<BusState> {
        let slot = self.slot(bus_id)?;
        let state = slot.read().map_err(poisoned)?;
        Ok(state.clone())
    }

    /// Apply a patch atomically and return the new snapshot
    pub fn update(&self, bus_id: &str, patch: BusPatch) -> Result<BusState> {
        self.update_if(bus_id, |_| Some(patch))
            .map(Applied::into_state)
    }

    /// Apply the patch returned by `guard`, evaluated under the bus lock.
    ///
    /// The guard sees the current state and returns `None` to leave it untouched.
    /// No other update of the same bus can interleave between the guard and the apply.
    pub fn update_if<F>(&self, bus_id: &str, guard: F) -> Result<Applied>
    where
        F: FnOnce(&BusState) -> Option<BusPatch>,
    {
        let slot = self.slot(bus_id)?;
        let mut state = slot.write().map_err(poisoned)?;

        let Some(patch) = guard(&state) else {
            return Ok(Applied::Unchanged(state.clone()));
        };

        patch.apply(&mut state);
        if state.is_over_capacity() {
            warn!(
                bus_id = %state.id,
                current_passengers = state.current_passengers,
                capacity = state.capacity,
                "passenger count exceeds capacity"
            );
        }
        Ok(Applied::Updated(state.clone()))
    }

    /// Set the passenger count; exceeding capacity is logged, not rejected
    pub fn update_passengers(&self, bus_id: &str, count: u32) -> Result<BusState> {
        self.update(bus_id, BusPatch::passengers(count))
    }

    /// Snapshot of all buses, ordered by identifier
    pub fn list(&self) -> Result<Vec<BusState>> {
        let slots: Vec<Slot> = {
            let buses = self.buses.read().map_err(poisoned)?;
            buses.values().cloned().collect()
        };

        let mut states = Vec::with_capacity(slots.len());
        for slot in slots {
            states.push(slot.read().map_err(poisoned)?.clone());
        }
        states.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(states)
    }

    /// Count of buses currently in `status`
    pub fn count_by_status(&self, status: BusStatus) -> Result<usize> {
        Ok(self
            .list()?
            .iter()
            .filter(|bus| bus.status == status)
            .count())
    }

    /// Total bus count
    pub fn total_count(&self) -> Result<usize> {
        Ok(self.buses.read().map_err(poisoned)?.len())
    }
}
