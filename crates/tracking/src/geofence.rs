//! Circular geofences

use fleetcore_core::{distance_meters, GeoPoint};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackingError};

/// Containment of a point in a circular fence
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceResult {
    pub is_inside: bool,
    /// Distance from the fence center in meters
    pub distance: f64,
}

/// Decides containment; `inside` means `distance <= radius`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeofenceEvaluator {
    default_radius_m: f64,
}

impl GeofenceEvaluator {
    pub fn new(default_radius_m: f64) -> Self {
        Self { default_radius_m }
    }

    pub fn default_radius_m(&self) -> f64 {
        self.default_radius_m
    }

    /// Evaluate `point` against a fence of `radius_m` around `center`
    ///
    /// # Errors
    /// * `InvalidArgument` - `radius_m` is negative or not finite
    /// * `InvalidCoordinate` - either point is out of range
    pub fn evaluate(point: &GeoPoint, center: &GeoPoint, radius_m: f64) -> Result<GeofenceResult> {
        if !(radius_m.is_finite() && radius_m >= 0.0) {
            return Err(TrackingError::InvalidArgument(format!(
                "geofence radius must be non-negative, got {}",
                radius_m
            )));
        }
        let distance = distance_meters(point, center)?;
        Ok(GeofenceResult {
            is_inside: distance <= radius_m,
            distance,
        })
    }

    /// Evaluate with the configured default radius
    pub fn evaluate_default(&self, point: &GeoPoint, center: &GeoPoint) -> Result<GeofenceResult> {
        Self::evaluate(point, center, self.default_radius_m)
    }
}

impl Default for GeofenceEvaluator {
    fn default() -> Self {
        Self::new(200.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const GATE: GeoPoint = GeoPoint {
        lat: 28.6139,
        lng: 77.2090,
    };

    #[test]
    fn test_center_is_inside() {
        let result = GeofenceEvaluator::evaluate(&GATE, &GATE, 0.0).unwrap();
        assert!(result.is_inside);
        assert_eq!(result.distance, 0.0);
    }

    #[test]
    fn test_boundary_is_inside() {
        let point = GeoPoint {
            lat: 28.6149,
            lng: 77.2090,
        };
        let distance = distance_meters(&point, &GATE).unwrap();

        assert!(GeofenceEvaluator::evaluate(&point, &GATE, distance).unwrap().is_inside);
        assert!(!GeofenceEvaluator::evaluate(&point, &GATE, distance - 0.01).unwrap().is_inside);
    }

    #[test]
    fn test_default_radius() {
        let evaluator = GeofenceEvaluator::default();
        // ~111 m north of the gate
        let near = GeoPoint {
            lat: 28.6149,
            lng: 77.2090,
        };
        // ~556 m north of the gate
        let far = GeoPoint {
            lat: 28.6189,
            lng: 77.2090,
        };

        assert!(evaluator.evaluate_default(&near, &GATE).unwrap().is_inside);
        let result = evaluator.evaluate_default(&far, &GATE).unwrap();
        assert!(!result.is_inside);
        assert!((result.distance - 556.0).abs() < 5.0);
    }

    #[test]
    fn test_invalid_point() {
        let bad = GeoPoint {
            lat: -91.0,
            lng: 0.0,
        };
        let err = GeofenceEvaluator::evaluate(&bad, &GATE, 100.0).unwrap_err();
        assert_eq!(err.kind(), "InvalidCoordinate");
    }

    #[test]
    fn test_invalid_radius_rejected() {
        for radius in [-1.0, f64::NAN, f64::INFINITY] {
            let err = GeofenceEvaluator::evaluate(&GATE, &GATE, radius).unwrap_err();
            assert_eq!(err.kind(), "InvalidArgument");
        }
    }

    proptest! {
        #[test]
        fn prop_inside_matches_distance(
            lat in -89.0f64..89.0,
            lng in -179.0f64..179.0,
            dlat in -0.05f64..0.05,
            dlng in -0.05f64..0.05,
            radius in 0.0f64..10_000.0,
        ) {
            let center = GeoPoint { lat, lng };
            let point = GeoPoint { lat: lat + dlat, lng: lng + dlng };
            let result = GeofenceEvaluator::evaluate(&point, &center, radius).unwrap();
            prop_assert_eq!(result.distance, distance_meters(&point, &center).unwrap());
            prop_assert_eq!(result.is_inside, result.distance <= radius);
        }
    }
}
