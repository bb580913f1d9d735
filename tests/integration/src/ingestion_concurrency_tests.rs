//! Location ingestion under concurrent drivers and readers
//!
//! # Test Scenarios
//!
//! 1. Out-of-order and duplicate delivery leave the newest fix in place
//! 2. Racing submissions for one bus converge on the highest timestamp
//! 3. Readers never observe a location going backwards
//! 4. Buses are independent: traffic on one never blocks or alters another
//! 5. No fix lands after its trip has ended

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use fleetcore_tracking::{BusStatus, TrackingError};

use crate::test_utils::{campus_context, fix};

#[test]
fn test_out_of_order_and_duplicates() {
    let ctx = campus_context();
    ctx.trips().start_trip("B1", "D1").unwrap();

    ctx.ingest()
        .submit_location("B1", "D1", fix(28.61, 77.20, 100))
        .unwrap();
    let once = ctx.broadcast().read("B1").unwrap().bus;

    let late = ctx
        .ingest()
        .submit_location("B1", "D1", fix(28.70, 77.30, 90))
        .unwrap();
    assert!(!late.is_accepted());

    let duplicate = ctx
        .ingest()
        .submit_location("B1", "D1", fix(28.61, 77.20, 100))
        .unwrap();
    assert!(!duplicate.is_accepted());

    assert_eq!(ctx.broadcast().read("B1").unwrap().bus, once);
}

#[test]
fn test_racing_submissions_converge() {
    let ctx = Arc::new(campus_context());
    ctx.trips().start_trip("B1", "D1").unwrap();

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let ctx = Arc::clone(&ctx);
            thread::spawn(move || {
                for i in 0..250_i64 {
                    let ts = i * 8 + worker;
                    ctx.ingest()
                        .submit_location("B1", "D1", fix(28.6, 77.2, ts))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let location = ctx.broadcast().read("B1").unwrap().bus.location.unwrap();
    assert_eq!(location.timestamp, 1_999);
}

#[test]
fn test_readers_see_monotonic_locations() {
    let ctx = Arc::new(campus_context());
    ctx.trips().start_trip("B1", "D1").unwrap();
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let ctx = Arc::clone(&ctx);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut last = i64::MIN;
                while !done.load(Ordering::SeqCst) {
                    let view = ctx.broadcast().read("B1").unwrap();
                    if let Some(location) = view.bus.location {
                        assert!(location.timestamp >= last);
                        // lat and timestamp are written together
                        assert_eq!(location.lat, 28.0 + location.timestamp as f64 / 10_000.0);
                        last = location.timestamp;
                    }
                }
            })
        })
        .collect();

    for ts in 1..=2_000_i64 {
        ctx.ingest()
            .submit_location("B1", "D1", fix(28.0 + ts as f64 / 10_000.0, 77.2, ts))
            .unwrap();
    }
    done.store(true, Ordering::SeqCst);
    for reader in readers {
        reader.join().unwrap();
    }
}

#[test]
fn test_buses_are_independent() {
    let ctx = Arc::new(campus_context());
    ctx.trips().start_trip("B1", "D1").unwrap();
    ctx.trips().start_trip("B2", "D2").unwrap();

    let b1 = {
        let ctx = Arc::clone(&ctx);
        thread::spawn(move || {
            for ts in 1..=500 {
                ctx.ingest()
                    .submit_location("B1", "D1", fix(28.61, 77.20, ts))
                    .unwrap();
            }
        })
    };
    let b2 = {
        let ctx = Arc::clone(&ctx);
        thread::spawn(move || {
            for ts in 1..=300 {
                ctx.ingest()
                    .submit_location("B2", "D2", fix(28.62, 77.21, ts * 10))
                    .unwrap();
            }
        })
    };
    b1.join().unwrap();
    b2.join().unwrap();

    let b1 = ctx.broadcast().read("B1").unwrap().bus.location.unwrap();
    let b2 = ctx.broadcast().read("B2").unwrap().bus.location.unwrap();
    assert_eq!((b1.lat, b1.timestamp), (28.61, 500));
    assert_eq!((b2.lat, b2.timestamp), (28.62, 3_000));
    assert!(ctx.broadcast().read("B3").unwrap().bus.location.is_none());
}

#[test]
fn test_no_fix_after_trip_end() {
    let ctx = Arc::new(campus_context());
    let trip_id = ctx.trips().start_trip("B1", "D1").unwrap();

    let driver = {
        let ctx = Arc::clone(&ctx);
        thread::spawn(move || {
            for ts in 1..=5_000_i64 {
                match ctx
                    .ingest()
                    .submit_location("B1", "D1", fix(28.61, 77.20, ts))
                {
                    Ok(_) => {}
                    Err(TrackingError::NoActiveTrip(_)) => return ts,
                    Err(other) => panic!("unexpected error: {}", other),
                }
            }
            i64::MAX
        })
    };

    thread::yield_now();
    let ended = ctx.trips().end_trip(&trip_id).unwrap();
    let frozen = ctx.broadcast().read("B1").unwrap().bus;
    let rejected_at = driver.join().unwrap();

    // Everything sent after the end was rejected, so the stored location is
    // exactly what was there when the trip ended
    assert_eq!(ctx.broadcast().read("B1").unwrap().bus, frozen);
    assert_eq!(frozen.status, BusStatus::Idle);
    if let Some(location) = frozen.location {
        assert!(location.timestamp < rejected_at);
    }
    assert!(ended.ended_at.is_some());
}
