//! Core functionality for the fleetcore bus tracking system.
//!
//! This crate provides the fundamental types and utilities shared across
//! the workspace: great-circle geometry, configuration documents, logging
//! setup and time helpers.

pub mod config;
pub mod error;
pub mod geo;
pub mod logging;
pub mod types;

pub use config::{BusSpec, FleetManifest, RouteSpec, StopSpec, TrackingConfig};
pub use error::{CoreError, Result};
pub use geo::{distance_meters, is_valid_coordinate, GeoError, GeoPoint, EARTH_RADIUS_M};
pub use types::{now_ms, TimestampMs};
