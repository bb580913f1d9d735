//! Test utilities for integration tests

use std::sync::Once;

use fleetcore_core::{FleetManifest, TrackingConfig};
use fleetcore_tracking::{LocationFix, TrackingContext};

static LOGGING: Once = Once::new();

/// Route test logs through the test harness; `RUST_LOG` applies
pub fn init_logging() {
    LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Manifest with buses `B1`..`B3` on a three-stop campus loop
pub const CAMPUS_MANIFEST: &str = r#"
[[buses]]
id = "B1"
name = "Campus Loop 1"
route_id = "LOOP"
capacity = 40

[[buses]]
id = "B2"
name = "Campus Loop 2"
route_id = "LOOP"
capacity = 40

[[buses]]
id = "B3"
name = "Shuttle"
capacity = 12

[[routes]]
id = "LOOP"
name = "Campus Loop"

[[routes.stops]]
id = "GATE"
name = "Main Gate"
location = { lat = 28.6139, lng = 77.2090 }

[[routes.stops]]
id = "LIB"
name = "Library"
location = { lat = 28.6189, lng = 77.2140 }

[[routes.stops]]
id = "HOSTEL"
name = "Hostel Block"
location = { lat = 28.6239, lng = 77.2190 }
"#;

pub fn campus_manifest() -> FleetManifest {
    FleetManifest::from_toml_str(CAMPUS_MANIFEST).unwrap()
}

/// Context over the campus manifest with default tuning
pub fn campus_context() -> TrackingContext {
    init_logging();
    TrackingContext::new(TrackingConfig::default(), &campus_manifest(), None).unwrap()
}

pub fn fix(lat: f64, lng: f64, timestamp: i64) -> LocationFix {
    LocationFix::new(lat, lng, timestamp)
}
