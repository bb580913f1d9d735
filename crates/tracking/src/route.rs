//! Routes and stops, read-only after load

use std::collections::HashMap;

use fleetcore_core::{distance_meters, GeoPoint, RouteSpec};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackingError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Stop {
    pub id: String,
    pub name: String,
    pub location: GeoPoint,
}

/// Ordered sequence of stops
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Route {
    pub id: String,
    pub name: String,
    pub stops: Vec<Stop>,
}

impl Route {
    pub fn stop(&self, stop_id: &str) -> Option<&Stop> {
        self.stops.iter().find(|stop| stop.id == stop_id)
    }

    /// Closest stop to `point` and its distance in meters
    pub fn nearest_stop(&self, point: &GeoPoint) -> Result<Option<(&Stop, f64)>> {
        let mut best: Option<(&Stop, f64)> = None;
        for stop in &self.stops {
            let distance = distance_meters(point, &stop.location)?;
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((stop, distance));
            }
        }
        Ok(best)
    }
}

impl From<&RouteSpec> for Route {
    fn from(spec: &RouteSpec) -> Self {
        Self {
            id: spec.id.clone(),
            name: spec.name.clone(),
            stops: spec
                .stops
                .iter()
                .map(|s| Stop {
                    id: s.id.clone(),
                    name: s.name.clone(),
                    location: s.location,
                })
                .collect(),
        }
    }
}

/// Lookup of routes by identifier
#[derive(Debug, Clone, Default)]
pub struct RouteBook {
    routes: HashMap<String, Route>,
}

impl RouteBook {
    pub fn new(routes: impl IntoIterator<Item = Route>) -> Self {
        Self {
            routes: routes.into_iter().map(|r| (r.id.clone(), r)).collect(),
        }
    }

    pub fn from_specs<'a>(specs: impl IntoIterator<Item = &'a RouteSpec>) -> Self {
        Self::new(specs.into_iter().map(Route::from))
    }

    pub fn route(&self, route_id: &str) -> Result<&Route> {
        self.routes
            .get(route_id)
            .ok_or_else(|| TrackingError::NotFound(format!("route {}", route_id)))
    }

    /// Find a stop on any route
    pub fn stop(&self, stop_id: &str) -> Result<&Stop> {
        self.routes
            .values()
            .find_map(|route| route.stop(stop_id))
            .ok_or_else(|| TrackingError::NotFound(format!("stop {}", stop_id)))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
