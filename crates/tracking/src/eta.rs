//! ETA estimation and arrival labels.
//!
//! The estimator consults an external routing provider when one is given
//! and falls back to the local straight-line estimate on any failure. The
//! caller only ever sees an error for invalid input coordinates.

use std::fmt;

use fleetcore_core::GeoPoint;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, TrackingError};
use crate::routing::{LocalFallbackProvider, RouteLeg, RoutingProvider};

/// Qualitative arrival bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EtaLabel {
    /// Under 5 minutes
    #[serde(rename = "Arriving Soon")]
    ArrivingSoon,
    /// 5 to under 15 minutes
    #[serde(rename = "On Time")]
    OnTime,
    /// 15 to under 30 minutes
    #[serde(rename = "En Route")]
    EnRoute,
    /// 30 minutes or more
    #[serde(rename = "Delayed")]
    Delayed,
}

impl EtaLabel {
    /// Bucket a duration; lower bounds inclusive, upper bounds exclusive
    pub fn classify(duration_minutes: f64) -> Self {
        if duration_minutes < 5.0 {
            EtaLabel::ArrivingSoon
        } else if duration_minutes < 15.0 {
            EtaLabel::OnTime
        } else if duration_minutes < 30.0 {
            EtaLabel::EnRoute
        } else {
            EtaLabel::Delayed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EtaLabel::ArrivingSoon => "Arriving Soon",
            EtaLabel::OnTime => "On Time",
            EtaLabel::EnRoute => "En Route",
            EtaLabel::Delayed => "Delayed",
        }
    }
}

impl fmt::Display for EtaLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which provider produced an estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EtaSource {
    External,
    Local,
}

/// Distance, duration and label between two points
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EtaEstimate {
    pub distance_meters: f64,
    pub duration_minutes: f64,
    pub label: EtaLabel,
    pub source: EtaSource,
    /// "12 min", "1 hr 5 min"
    pub duration_text: String,
    /// "850 m", "4.2 km"
    pub distance_text: String,
}

impl EtaEstimate {
    fn from_leg(leg: RouteLeg, source: EtaSource) -> Self {
        Self {
            distance_meters: leg.distance_meters,
            duration_minutes: leg.duration_minutes,
            label: EtaLabel::classify(leg.duration_minutes),
            source,
            duration_text: format_duration(leg.duration_minutes),
            distance_text: format_distance(leg.distance_meters),
        }
    }
}

/// Human-readable duration
pub fn format_duration(minutes: f64) -> String {
    if minutes < 1.0 {
        return "Less than a minute".to_string();
    }
    let total = minutes.round();
    if total < 60.0 {
        return format!("{} min", total);
    }

    let hours = (total / 60.0).floor();
    let mins = total % 60.0;
    if mins == 0.0 {
        format!("{} hr", hours)
    } else {
        format!("{} hr {} min", hours, mins)
    }
}

/// Human-readable distance
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{} m", meters.round())
    } else {
        format!("{:.1} km", meters / 1000.0)
    }
}

/// Estimates travel between two points
#[derive(Debug, Clone, Copy)]
pub struct EtaEstimator {
    fallback: LocalFallbackProvider,
}

impl EtaEstimator {
    pub fn new(fallback: LocalFallbackProvider) -> Self {
        Self { fallback }
    }

    /// Estimator whose fallback assumes `speed_kmh`
    pub fn with_average_speed_kmh(speed_kmh: f64) -> Self {
        Self::new(LocalFallbackProvider::from_kmh(speed_kmh))
    }

    /// Estimate from `origin` to `destination`.
    ///
    /// External failures and implausible external results are logged and
    /// replaced by the local estimate.
    pub fn estimate(
        &self,
        origin: &GeoPoint,
        destination: &GeoPoint,
        external: Option<&dyn RoutingProvider>,
    ) -> Result<EtaEstimate> {
        origin.validate()?;
        destination.validate()?;

        if let Some(provider) = external {
            match provider.route(origin, destination) {
                Ok(leg) if leg.is_plausible() => {
                    return Ok(EtaEstimate::from_leg(leg, EtaSource::External));
                }
                Ok(leg) => {
                    warn!(provider = provider.name(), ?leg, "implausible route leg, using local estimate");
                }
                Err(err) => {
                    warn!(provider = provider.name(), error = %err, "routing provider failed, using local estimate");
                }
            }
        }

        let leg = self.local_leg(origin, destination)?;
        Ok(EtaEstimate::from_leg(leg, EtaSource::Local))
    }

    fn local_leg(&self, origin: &GeoPoint, destination: &GeoPoint) -> Result<RouteLeg> {
        // Inputs are validated above; the local provider only fails on invalid coordinates
        self.fallback
            .route(origin, destination)
            .map_err(|e| TrackingError::Internal(e.to_string()))
    }
}

impl Default for EtaEstimator {
    fn default() -> Self {
        Self::new(LocalFallbackProvider::default())
    }
}
