//! Trip lifecycle as seen through the tracking context
//!
//! # Test Scenarios
//!
//! 1. Start, locate, delay and end a trip and watch the bus status follow
//! 2. Precondition failures of the trip state machine
//! 3. Breakdown and resume
//! 4. A restarted trip accepts timestamps older than the previous trip's

use fleetcore_tracking::{BusStatus, TrackingError, TripStatus};

use crate::test_utils::{campus_context, fix};

#[test]
fn test_end_to_end_trip() {
    let ctx = campus_context();
    let trip_id = ctx.trips().start_trip("B1", "D1").unwrap();

    ctx.ingest()
        .submit_location("B1", "D1", fix(28.61, 77.20, 1000))
        .unwrap();
    let view = ctx.broadcast().read("B1").unwrap();
    let location = view.bus.location.unwrap();
    assert_eq!((location.lat, location.lng, location.timestamp), (28.61, 77.20, 1000));
    assert_eq!(view.bus.status, BusStatus::Active);

    ctx.trips().report_delay(&trip_id, "traffic").unwrap();
    assert_eq!(ctx.broadcast().read("B1").unwrap().bus.status, BusStatus::Delayed);

    ctx.trips().end_trip(&trip_id).unwrap();
    assert_eq!(ctx.broadcast().read("B1").unwrap().bus.status, BusStatus::Idle);
    assert_eq!(ctx.trips().trip_status("B1").unwrap(), TripStatus::NoTrip);
    assert_eq!(ctx.trips().trip(&trip_id).unwrap().status, TripStatus::Ended);
}

#[test]
fn test_precondition_failures() {
    let ctx = campus_context();
    let trips = ctx.trips();

    // Delay before any trip
    assert!(matches!(
        trips.report_delay("no-such-trip", "traffic"),
        Err(TrackingError::TripNotActive(_))
    ));
    assert!(matches!(
        trips.end_trip("no-such-trip"),
        Err(TrackingError::TripNotFound(_))
    ));

    let trip_id = trips.start_trip("B1", "D1").unwrap();
    assert!(matches!(
        trips.start_trip("B1", "D1"),
        Err(TrackingError::TripAlreadyActive { .. })
    ));
    assert!(matches!(
        trips.start_trip("B404", "D1"),
        Err(TrackingError::NotFound(_))
    ));

    trips.end_trip(&trip_id).unwrap();
    assert!(matches!(
        trips.end_trip(&trip_id),
        Err(TrackingError::TripNotActive(_))
    ));
    assert!(matches!(
        trips.report_delay(&trip_id, "traffic"),
        Err(TrackingError::TripNotActive(_))
    ));
    assert!(matches!(
        ctx.ingest().submit_location("B1", "D1", fix(1.0, 1.0, 5_000)),
        Err(TrackingError::NoActiveTrip(_))
    ));
}

#[test]
fn test_breakdown_then_resume() {
    let ctx = campus_context();
    let trip_id = ctx.trips().start_trip("B2", "D2").unwrap();

    ctx.trips().report_breakdown(&trip_id, "engine").unwrap();
    assert_eq!(ctx.broadcast().read("B2").unwrap().bus.status, BusStatus::Breakdown);

    // Location updates do not clear the status
    ctx.ingest()
        .submit_location("B2", "D2", fix(28.62, 77.21, 10))
        .unwrap();
    assert_eq!(ctx.broadcast().read("B2").unwrap().bus.status, BusStatus::Breakdown);

    ctx.trips().resume(&trip_id).unwrap();
    assert_eq!(ctx.broadcast().read("B2").unwrap().bus.status, BusStatus::Active);

    let reports = ctx.trips().delay_reports(&trip_id).unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].reason, "engine");
}

#[test]
fn test_restarted_trip_resets_freshness() {
    let ctx = campus_context();
    let first = ctx.trips().start_trip("B1", "D1").unwrap();
    ctx.ingest()
        .submit_location("B1", "D1", fix(28.61, 77.20, 50_000))
        .unwrap();
    ctx.trips().end_trip(&first).unwrap();

    ctx.trips().start_trip("B1", "D2").unwrap();
    let outcome = ctx
        .ingest()
        .submit_location("B1", "D2", fix(28.62, 77.21, 1_000))
        .unwrap();
    assert!(outcome.is_accepted());
    assert_eq!(
        ctx.broadcast().read("B1").unwrap().bus.location.unwrap().timestamp,
        1_000
    );
}

#[test]
fn test_summary_tracks_lifecycle() {
    let ctx = campus_context();
    let trip_id = ctx.trips().start_trip("B1", "D1").unwrap();
    ctx.trips().report_delay(&trip_id, "traffic").unwrap();
    ctx.trips().start_trip("B2", "D2").unwrap();

    let summary = ctx.broadcast().summary().unwrap();
    assert_eq!(summary.total_buses, 3);
    assert_eq!(summary.by_status["delayed"], 1);
    assert_eq!(summary.by_status["active"], 1);
    assert_eq!(summary.by_status["idle"], 1);
    assert_eq!(summary.total_capacity, 92);
}
