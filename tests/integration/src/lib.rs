//! Integration tests for the fleetcore tracking engine
//!
//! This test suite validates:
//! - The full trip lifecycle as seen by drivers, students and admins
//! - Ordering and idempotence of location ingestion under concurrency
//! - Polling and driver uplink subscriptions against a live context
//! - Routes, geofences and ETA estimation from manifest data

pub mod test_utils;

#[cfg(test)]
mod trip_lifecycle_tests;

#[cfg(test)]
mod ingestion_concurrency_tests;

#[cfg(test)]
mod subscription_tests;

#[cfg(test)]
mod route_eta_tests;
