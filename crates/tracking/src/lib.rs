//! Fleetcore Tracking
//!
//! Real-time bus location and trip lifecycle engine.
//!
//! This crate provides:
//! - Bus registry with atomic per-bus updates
//! - Trip state machine (start, end, delay, breakdown, resume)
//! - Driver location ingestion with monotonic freshness per trip
//! - Last-value-wins location broadcast with staleness
//! - Circular geofences and ETA estimation with local fallback
//! - Cancellable polling and driver uplink loops

pub mod broadcast;
pub mod bus;
pub mod context;
pub mod error;
pub mod eta;
pub mod geofence;
pub mod ingest;
pub mod registry;
pub mod route;
pub mod routing;
pub mod subscription;
pub mod trip;

// Re-export key types for convenience
pub use broadcast::{BusView, FleetSummary, LocationBroadcastService};
pub use bus::{BusPatch, BusState, BusStatus, LocationFix};
pub use context::TrackingContext;
pub use error::{Result, TrackingError};
pub use eta::{format_distance, format_duration, EtaEstimate, EtaEstimator, EtaLabel, EtaSource};
pub use geofence::{GeofenceEvaluator, GeofenceResult};
pub use ingest::{IngestOutcome, LocationIngestionService, LocationSubmission};
pub use registry::{Applied, BusRegistry};
pub use route::{Route, RouteBook, Stop};
pub use routing::{
    ExternalProvider, HttpClient, LocalFallbackProvider, ReqwestClient, RouteLeg, RoutingError,
    RoutingProvider,
};
pub use subscription::{
    poll_bus, spawn_driver_uplink, watch_position, PositionError, PositionSource, Subscription,
};
pub use trip::{DelayReport, ReportKind, Trip, TripId, TripStateMachine, TripStatus};
