//! Routing providers for ETA estimation.
//!
//! [`RoutingProvider`] is the capability the estimator depends on. Two
//! implementations exist: [`LocalFallbackProvider`] (straight-line distance at
//! an assumed average speed, never fails on valid input) and
//! [`ExternalProvider`] (a distance-matrix HTTP service).

use std::time::Duration;

use fleetcore_core::{distance_meters, GeoPoint};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Routing provider errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoutingError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("No route found: {0}")]
    NoRoute(String),

    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("Invalid routing URL: {0}")]
    InvalidUrl(String),
}

/// Distance and travel time between two points
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteLeg {
    pub distance_meters: f64,
    pub duration_minutes: f64,
}

impl RouteLeg {
    /// Finite, non-negative values only
    pub fn is_plausible(&self) -> bool {
        self.distance_meters.is_finite()
            && self.distance_meters >= 0.0
            && self.duration_minutes.is_finite()
            && self.duration_minutes >= 0.0
    }
}

/// Something that can estimate a leg between two points
pub trait RoutingProvider: Send + Sync {
    /// Short name used in logs and responses
    fn name(&self) -> &str;

    fn route(&self, origin: &GeoPoint, destination: &GeoPoint) -> Result<RouteLeg, RoutingError>;
}

/// Straight-line estimate at a fixed average speed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalFallbackProvider {
    speed_m_per_min: f64,
}

impl LocalFallbackProvider {
    pub fn new(speed_m_per_min: f64) -> Self {
        Self { speed_m_per_min }
    }

    /// Provider for a speed given in km/h
    pub fn from_kmh(speed_kmh: f64) -> Self {
        Self::new(speed_kmh * 1000.0 / 60.0)
    }

    pub fn speed_m_per_min(&self) -> f64 {
        self.speed_m_per_min
    }
}

impl Default for LocalFallbackProvider {
    fn default() -> Self {
        Self::from_kmh(20.0)
    }
}

impl RoutingProvider for LocalFallbackProvider {
    fn name(&self) -> &str {
        "local"
    }

    fn route(&self, origin: &GeoPoint, destination: &GeoPoint) -> Result<RouteLeg, RoutingError> {
        let distance = distance_meters(origin, destination)
            .map_err(|e| RoutingError::InvalidCoordinate(e.to_string()))?;
        Ok(RouteLeg {
            distance_meters: distance,
            duration_minutes: distance / self.speed_m_per_min,
        })
    }
}

/// Trait for HTTP client operations, so the external provider can be tested offline
pub trait HttpClient: Send + Sync {
    /// GET `url` and return the body.
    ///
    /// Errors must not echo the URL: its query may carry credentials.
    fn get(&self, url: &Url) -> Result<Vec<u8>, RoutingError>;
}

/// Blocking reqwest client with a request timeout
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    pub fn with_timeout(timeout: Duration) -> Result<Self, RoutingError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RoutingError::Http(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &Url) -> Result<Vec<u8>, RoutingError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| RoutingError::Http(format!("Request failed: {}", e.without_url())))?;

        if !response.status().is_success() {
            return Err(RoutingError::Http(format!(
                "HTTP {} from routing service",
                response.status()
            )));
        }

        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| {
                RoutingError::Http(format!("Failed to read response: {}", e.without_url()))
            })
    }
}

#[derive(Debug, Deserialize)]
struct MatrixResponse {
    status: String,
    #[serde(default)]
    rows: Vec<MatrixRow>,
}

#[derive(Debug, Deserialize)]
struct MatrixRow {
    #[serde(default)]
    elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
struct MatrixElement {
    status: String,
    distance: Option<MatrixValue>,
    duration: Option<MatrixValue>,
}

#[derive(Debug, Deserialize)]
struct MatrixValue {
    value: f64,
}

/// Distance-matrix HTTP service (Google Distance Matrix response shape).
///
/// Requests `{base_url}?origins=lat,lng&destinations=lat,lng&mode=driving&units=metric&key=...`
/// and reads meters and seconds from the first element.
pub struct ExternalProvider<C: HttpClient> {
    http_client: C,
    base_url: String,
    api_key: Option<String>,
}

impl<C: HttpClient> ExternalProvider<C> {
    pub fn new(http_client: C, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
            api_key,
        }
    }

    pub fn http_client(&self) -> &C {
        &self.http_client
    }

    fn request_url(&self, origin: &GeoPoint, destination: &GeoPoint) -> Result<Url, RoutingError> {
        let origins = format!("{},{}", origin.lat, origin.lng);
        let destinations = format!("{},{}", destination.lat, destination.lng);
        let mut params = vec![
            ("origins", origins.as_str()),
            ("destinations", destinations.as_str()),
            ("mode", "driving"),
            ("units", "metric"),
        ];
        if let Some(key) = &self.api_key {
            params.push(("key", key.as_str()));
        }
        Url::parse_with_params(&self.base_url, &params)
            .map_err(|e| RoutingError::InvalidUrl(e.to_string()))
    }

    fn parse(body: &[u8]) -> Result<RouteLeg, RoutingError> {
        let response: MatrixResponse =
            serde_json::from_slice(body).map_err(|e| RoutingError::Decode(e.to_string()))?;
        if response.status != "OK" {
            return Err(RoutingError::NoRoute(format!(
                "matrix status {}",
                response.status
            )));
        }

        let element = response
            .rows
            .into_iter()
            .next()
            .and_then(|row| row.elements.into_iter().next())
            .ok_or_else(|| RoutingError::Decode("empty matrix".to_string()))?;
        if element.status != "OK" {
            return Err(RoutingError::NoRoute(format!(
                "element status {}",
                element.status
            )));
        }

        match (element.distance, element.duration) {
            (Some(distance), Some(duration)) => Ok(RouteLeg {
                distance_meters: distance.value,
                duration_minutes: duration.value / 60.0,
            }),
            _ => Err(RoutingError::Decode(
                "element without distance or duration".to_string(),
            )),
        }
    }
}

impl<C: HttpClient> RoutingProvider for ExternalProvider<C> {
    fn name(&self) -> &str {
        "external"
    }

    fn route(&self, origin: &GeoPoint, destination: &GeoPoint) -> Result<RouteLeg, RoutingError> {
        let url = self.request_url(origin, destination)?;
        let body = self.http_client.get(&url)?;
        Self::parse(&body)
    }
}
