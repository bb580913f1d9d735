//! Wiring of the tracking services.
//!
//! A [`TrackingContext`] owns one registry and everything that operates on it.
//! Hosts build one at startup and share it behind an `Arc`; tests build as
//! many independent contexts as they like.

use std::sync::Arc;
use std::time::Duration;

use fleetcore_core::{FleetManifest, GeoPoint, TrackingConfig};
use tracing::info;

use crate::broadcast::{BusView, LocationBroadcastService};
use crate::error::{Result, TrackingError};
use crate::eta::{EtaEstimate, EtaEstimator};
use crate::geofence::{GeofenceEvaluator, GeofenceResult};
use crate::ingest::LocationIngestionService;
use crate::registry::BusRegistry;
use crate::route::RouteBook;
use crate::routing::RoutingProvider;
use crate::subscription::{self, PositionSource, Subscription};
use crate::trip::TripStateMachine;

/// Services sharing one bus registry
pub struct TrackingContext {
    config: TrackingConfig,
    registry: Arc<BusRegistry>,
    trips: Arc<TripStateMachine>,
    ingest: LocationIngestionService,
    broadcast: LocationBroadcastService,
    routes: RouteBook,
    estimator: EtaEstimator,
    geofence: GeofenceEvaluator,
    external: Option<Arc<dyn RoutingProvider>>,
}

impl TrackingContext {
    /// Build a context from validated configuration and manifest
    pub fn new(
        config: TrackingConfig,
        manifest: &FleetManifest,
        external: Option<Arc<dyn RoutingProvider>>,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|e| TrackingError::InvalidArgument(e.to_string()))?;
        manifest
            .validate()
            .map_err(|e| TrackingError::InvalidArgument(e.to_string()))?;

        let registry = Arc::new(BusRegistry::from_specs(&manifest.buses)?);
        let trips = Arc::new(TripStateMachine::new(Arc::clone(&registry)));
        let ingest = LocationIngestionService::new(Arc::clone(&registry), Arc::clone(&trips));
        let broadcast = LocationBroadcastService::new(Arc::clone(&registry), config.stale_after_ms);

        info!(
            buses = registry.total_count()?,
            routes = manifest.routes.len(),
            external_eta = ?external.as_ref().map(|p| p.name()),
            "tracking context ready"
        );

        Ok(Self {
            estimator: EtaEstimator::with_average_speed_kmh(config.average_speed_kmh),
            geofence: GeofenceEvaluator::new(config.geofence_radius_m),
            routes: RouteBook::from_specs(&manifest.routes),
            config,
            registry,
            trips,
            ingest,
            broadcast,
            external,
        })
    }

    /// Context over the built-in demo fleet with default tuning
    pub fn with_defaults() -> Result<Self> {
        Self::new(
            TrackingConfig::default(),
            &FleetManifest::default_manifest(),
            None,
        )
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<BusRegistry> {
        &self.registry
    }

    pub fn trips(&self) -> &Arc<TripStateMachine> {
        &self.trips
    }

    pub fn ingest(&self) -> &LocationIngestionService {
        &self.ingest
    }

    pub fn broadcast(&self) -> &LocationBroadcastService {
        &self.broadcast
    }

    pub fn routes(&self) -> &RouteBook {
        &self.routes
    }

    pub fn geofence(&self) -> &GeofenceEvaluator {
        &self.geofence
    }

    /// Estimate between two arbitrary points.
    ///
    /// May block on the external provider; async hosts should call this
    /// from a blocking task.
    pub fn estimate_eta(&self, origin: &GeoPoint, destination: &GeoPoint) -> Result<EtaEstimate> {
        self.estimator
            .estimate(origin, destination, self.external.as_deref())
    }

    /// Estimate from the bus's last reported location to a stop.
    ///
    /// # Errors
    /// * `NotFound` - unknown bus, unknown stop, or the bus has not reported yet
    pub fn eta_to_stop(&self, bus_id: &str, stop_id: &str) -> Result<EtaEstimate> {
        let origin = self.bus_position(bus_id)?;
        let stop = self.routes.stop(stop_id)?;
        self.estimate_eta(&origin, &stop.location)
    }

    /// Whether the bus is within the default radius of a stop
    pub fn stop_arrival(&self, bus_id: &str, stop_id: &str) -> Result<GeofenceResult> {
        let position = self.bus_position(bus_id)?;
        let stop = self.routes.stop(stop_id)?;
        self.geofence.evaluate_default(&position, &stop.location)
    }

    /// Whether the bus is within `radius_m` (or the default) of `center`
    pub fn bus_geofence(
        &self,
        bus_id: &str,
        center: &GeoPoint,
        radius_m: Option<f64>,
    ) -> Result<GeofenceResult> {
        let position = self.bus_position(bus_id)?;
        let radius = radius_m.unwrap_or(self.geofence.default_radius_m());
        GeofenceEvaluator::evaluate(&position, center, radius)
    }

    /// Poll one bus at the configured consumer cadence.
    ///
    /// Must be called from within a tokio runtime.
    pub fn poll_bus<F>(&self, bus_id: impl Into<String>, callback: F) -> Result<Subscription>
    where
        F: FnMut(Result<BusView>) + Send + 'static,
    {
        subscription::poll_bus(
            self.broadcast.clone(),
            bus_id,
            Duration::from_millis(self.config.consumer_poll_interval_ms),
            callback,
        )
    }

    /// Push the device position for a bus at the configured driver cadence.
    ///
    /// Must be called from within a tokio runtime.
    pub fn driver_uplink<S>(
        &self,
        bus_id: impl Into<String>,
        driver_id: impl Into<String>,
        source: Arc<S>,
    ) -> Result<Subscription>
    where
        S: PositionSource + ?Sized + 'static,
    {
        subscription::spawn_driver_uplink(
            self.ingest.clone(),
            bus_id,
            driver_id,
            source,
            Duration::from_millis(self.config.driver_push_interval_ms),
        )
    }

    fn bus_position(&self, bus_id: &str) -> Result<GeoPoint> {
        self.registry
            .get(bus_id)?
            .location
            .map(|fix| fix.point())
            .ok_or_else(|| TrackingError::NotFound(format!("location of bus {}", bus_id)))
    }
}

impl std::fmt::Debug for TrackingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingContext")
            .field("config", &self.config)
            .field("buses", &self.registry.total_count().ok())
            .field("routes", &self.routes.len())
            .field("external", &self.external.as_ref().map(|p| p.name()))
            .finish()
    }
}
