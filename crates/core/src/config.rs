//! Configuration management for fleetcore.
//!
//! Two documents are read at startup: [`TrackingConfig`] carries the tuning
//! parameters of the tracking engine, [`FleetManifest`] lists the provisioned
//! buses and their routes. Both are TOML.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
#[cfg(feature = "toml")]
use std::path::Path;

use crate::error::{CoreError, Result};
use crate::geo::GeoPoint;

/// Tuning parameters of the tracking engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// A bus whose last fix is older than this is reported as stale
    pub stale_after_ms: i64,
    /// Assumed average speed for the local ETA fallback
    pub average_speed_kmh: f64,
    /// Default stop geofence radius in meters
    pub geofence_radius_m: f64,
    /// Driver client push cadence
    pub driver_push_interval_ms: u64,
    /// Student/admin client poll cadence
    pub consumer_poll_interval_ms: u64,
    /// Request timeout for the external routing provider
    pub external_eta_timeout_ms: u64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            stale_after_ms: 30_000,
            average_speed_kmh: 20.0,
            geofence_radius_m: 200.0,
            driver_push_interval_ms: 5_000,
            consumer_poll_interval_ms: 5_000,
            external_eta_timeout_ms: 3_000,
        }
    }
}

impl TrackingConfig {
    #[cfg(feature = "toml")]
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| CoreError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Fallback speed in meters per minute
    pub fn average_speed_m_per_min(&self) -> f64 {
        self.average_speed_kmh * 1000.0 / 60.0
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.average_speed_kmh.is_finite() && self.average_speed_kmh > 0.0) {
            return Err(CoreError::InvalidConfig(format!(
                "average_speed_kmh must be positive, got {}",
                self.average_speed_kmh
            )));
        }
        if !(self.geofence_radius_m.is_finite() && self.geofence_radius_m >= 0.0) {
            return Err(CoreError::InvalidConfig(format!(
                "geofence_radius_m must be non-negative, got {}",
                self.geofence_radius_m
            )));
        }
        if self.stale_after_ms <= 0 {
            return Err(CoreError::InvalidConfig(
                "stale_after_ms must be positive".to_string(),
            ));
        }
        if self.driver_push_interval_ms == 0 || self.consumer_poll_interval_ms == 0 {
            return Err(CoreError::InvalidConfig(
                "client intervals must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// One provisioned bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusSpec {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub route_id: Option<String>,
    pub capacity: u32,
    #[serde(default)]
    pub driver_id: Option<String>,
}

/// One stop on a route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopSpec {
    pub id: String,
    pub name: String,
    pub location: GeoPoint,
}

/// An ordered route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSpec {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub stops: Vec<StopSpec>,
}

/// Fleet provisioning input: buses and the routes they serve
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetManifest {
    #[serde(default)]
    pub buses: Vec<BusSpec>,
    #[serde(default)]
    pub routes: Vec<RouteSpec>,
}

impl FleetManifest {
    #[cfg(feature = "toml")]
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let manifest: Self =
            toml::from_str(content).map_err(|e| CoreError::Parse(e.to_string()))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Reject duplicate identifiers, dangling route references and invalid stop coordinates
    pub fn validate(&self) -> Result<()> {
        let mut bus_ids = HashSet::new();
        for bus in &self.buses {
            if bus.id.trim().is_empty() {
                return Err(CoreError::InvalidConfig("bus id must not be empty".to_string()));
            }
            if !bus_ids.insert(bus.id.as_str()) {
                return Err(CoreError::InvalidConfig(format!("duplicate bus id {}", bus.id)));
            }
        }

        let mut route_ids = HashSet::new();
        for route in &self.routes {
            if !route_ids.insert(route.id.as_str()) {
                return Err(CoreError::InvalidConfig(format!(
                    "duplicate route id {}",
                    route.id
                )));
            }
            let mut stop_ids = HashSet::new();
            for stop in &route.stops {
                stop.location.validate()?;
                if !stop_ids.insert(stop.id.as_str()) {
                    return Err(CoreError::InvalidConfig(format!(
                        "duplicate stop id {} on route {}",
                        stop.id, route.id
                    )));
                }
            }
        }

        for bus in &self.buses {
            if let Some(route_id) = &bus.route_id {
                if !route_ids.contains(route_id.as_str()) {
                    return Err(CoreError::InvalidConfig(format!(
                        "bus {} references unknown route {}",
                        bus.id, route_id
                    )));
                }
            }
        }

        Ok(())
    }

    /// Small demo fleet around New Delhi, used when no manifest file is given
    pub fn default_manifest() -> Self {
        let stop = |id: &str, name: &str, lat: f64, lng: f64| StopSpec {
            id: id.to_string(),
            name: name.to_string(),
            location: GeoPoint { lat, lng },
        };

        Self {
            buses: vec![
                BusSpec {
                    id: "BUS001".to_string(),
                    name: "Route A - Main Campus".to_string(),
                    route_id: Some("ROUTE001".to_string()),
                    capacity: 40,
                    driver_id: None,
                },
                BusSpec {
                    id: "BUS002".to_string(),
                    name: "Route B - North Campus".to_string(),
                    route_id: None,
                    capacity: 40,
                    driver_id: None,
                },
                BusSpec {
                    id: "BUS003".to_string(),
                    name: "Route C - South Campus".to_string(),
                    route_id: None,
                    capacity: 35,
                    driver_id: None,
                },
            ],
            routes: vec![RouteSpec {
                id: "ROUTE001".to_string(),
                name: "Route A".to_string(),
                stops: vec![
                    stop("STOP001", "Main Gate", 28.6139, 77.2090),
                    stop("STOP002", "Library", 28.6189, 77.2140),
                    stop("STOP003", "Hostel Block", 28.6239, 77.2190),
                ],
            }],
        }
    }
}
