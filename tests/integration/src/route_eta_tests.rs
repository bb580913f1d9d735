//! Routes, geofences and ETA from manifest data
//!
//! # Test Scenarios
//!
//! 1. A bus approaching its next stop: nearest stop, arrival and ETA agree
//! 2. Manifest errors surface before a context is built

use fleetcore_core::{FleetManifest, GeoPoint, TrackingConfig};
use fleetcore_tracking::{EtaLabel, EtaSource, TrackingContext};

use crate::test_utils::{campus_context, fix, CAMPUS_MANIFEST};

#[test]
fn test_bus_approaching_library() {
    let ctx = campus_context();
    ctx.trips().start_trip("B1", "D1").unwrap();
    // ~60 m short of the library
    ctx.ingest()
        .submit_location("B1", "D1", fix(28.6184, 77.2136, 1_000))
        .unwrap();

    let route = ctx.routes().route("LOOP").unwrap();
    let position = GeoPoint {
        lat: 28.6184,
        lng: 77.2136,
    };
    let (nearest, distance) = route.nearest_stop(&position).unwrap().unwrap();
    assert_eq!(nearest.id, "LIB");
    assert!(distance < 100.0);

    assert!(ctx.stop_arrival("B1", "LIB").unwrap().is_inside);
    assert!(!ctx.stop_arrival("B1", "GATE").unwrap().is_inside);

    let eta = ctx.eta_to_stop("B1", "LIB").unwrap();
    assert_eq!(eta.source, EtaSource::Local);
    assert_eq!(eta.label, EtaLabel::ArrivingSoon);
    assert!(eta.distance_text.ends_with(" m"));

    let far = ctx.eta_to_stop("B1", "GATE").unwrap();
    assert!(far.distance_meters > eta.distance_meters);
}

#[test]
fn test_slower_fleet_changes_label() {
    let config = TrackingConfig {
        average_speed_kmh: 2.0,
        ..TrackingConfig::default()
    };
    let manifest = FleetManifest::from_toml_str(CAMPUS_MANIFEST).unwrap();
    let ctx = TrackingContext::new(config, &manifest, None).unwrap();
    ctx.trips().start_trip("B1", "D1").unwrap();
    ctx.ingest()
        .submit_location("B1", "D1", fix(28.6139, 77.2090, 1))
        .unwrap();

    // ~1.5 km at 2 km/h
    let eta = ctx.eta_to_stop("B1", "HOSTEL").unwrap();
    assert_eq!(eta.label, EtaLabel::Delayed);
    assert!(eta.duration_minutes > 40.0 && eta.duration_minutes < 50.0);
}

#[test]
fn test_manifest_errors() {
    let dangling = r#"
[[buses]]
id = "B1"
name = "Orphan"
route_id = "NOWHERE"
capacity = 10
"#;
    assert!(FleetManifest::from_toml_str(dangling).is_err());

    let bad_stop = r#"
[[routes]]
id = "R"
name = "R"

[[routes.stops]]
id = "S"
name = "Off the map"
location = { lat = 95.0, lng = 0.0 }
"#;
    assert!(FleetManifest::from_toml_str(bad_stop).is_err());
}
