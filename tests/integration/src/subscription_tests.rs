//! Polling consumers and driver uplinks against a shared context
//!
//! # Test Scenarios
//!
//! 1. A driver uplink feeds many student pollers
//! 2. Ending the trip stops the uplink; pollers keep seeing the last fix
//! 3. Invalid device fixes never reach the registry

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fleetcore_tracking::{
    poll_bus, spawn_driver_uplink, BusStatus, LocationFix, PositionError, PositionSource,
};

use crate::test_utils::campus_context;

/// Drives north from the main gate, one step per sample
struct Odometer {
    step: AtomicI64,
}

impl Odometer {
    fn new() -> Self {
        Self {
            step: AtomicI64::new(0),
        }
    }
}

impl PositionSource for Odometer {
    fn current_position(&self) -> Result<LocationFix, PositionError> {
        let n = self.step.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(LocationFix::new(28.6139 + n as f64 * 0.0001, 77.2090, n * 5_000).with_accuracy(8.0))
    }
}

/// Always reports an out-of-range latitude
struct Glitchy;

impl PositionSource for Glitchy {
    fn current_position(&self) -> Result<LocationFix, PositionError> {
        Ok(LocationFix::new(180.0, 77.2090, 1))
    }
}

#[tokio::test]
async fn test_uplink_feeds_many_pollers() {
    let ctx = Arc::new(campus_context());
    let trip_id = ctx.trips().start_trip("B1", "D1").unwrap();

    let uplink = spawn_driver_uplink(
        ctx.ingest().clone(),
        "B1",
        "D1",
        Arc::new(Odometer::new()),
        Duration::from_millis(5),
    )
    .unwrap();

    let seen: Vec<Arc<Mutex<Vec<i64>>>> = (0..5).map(|_| Arc::new(Mutex::new(Vec::new()))).collect();
    let pollers: Vec<_> = seen
        .iter()
        .map(|log| {
            let log = Arc::clone(log);
            poll_bus(ctx.broadcast().clone(), "B1", Duration::from_millis(3), move |view| {
                if let Some(location) = view.unwrap().bus.location {
                    log.lock().unwrap().push(location.timestamp);
                }
            })
            .unwrap()
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(80)).await;
    ctx.trips().end_trip(&trip_id).unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(uplink.is_cancelled());

    let last = ctx.broadcast().read("B1").unwrap();
    assert_eq!(last.bus.status, BusStatus::Idle);
    let last_ts = last.bus.location.unwrap().timestamp;

    for poller in &pollers {
        poller.cancel();
    }
    for log in &seen {
        let log = log.lock().unwrap();
        assert!(!log.is_empty());
        // Each poller sees a non-decreasing sequence that ends at the last fix
        assert!(log.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*log.last().unwrap(), last_ts);
    }
}

#[tokio::test]
async fn test_invalid_device_fixes_filtered() {
    let ctx = Arc::new(campus_context());
    ctx.trips().start_trip("B2", "D2").unwrap();

    let uplink = spawn_driver_uplink(
        ctx.ingest().clone(),
        "B2",
        "D2",
        Arc::new(Glitchy),
        Duration::from_millis(5),
    )
    .unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;

    // Device errors do not stop the uplink
    assert!(!uplink.is_cancelled());
    assert!(ctx.broadcast().read("B2").unwrap().bus.location.is_none());
    uplink.cancel();
}
