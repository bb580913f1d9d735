//! Periodic client loops with cancellable handles.
//!
//! Student and admin clients poll the broadcast service on a fixed cadence,
//! and driver clients push their device position. Each loop runs as a tokio
//! task and is controlled by a [`Subscription`]. Once [`Subscription::cancel`]
//! returns, the loop's callback is never invoked again.

use std::ops::ControlFlow;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fleetcore_core::is_valid_coordinate;
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::broadcast::{BusView, LocationBroadcastService};
use crate::bus::LocationFix;
use crate::error::{Result, TrackingError};
use crate::ingest::{IngestOutcome, LocationIngestionService};

/// Handle to a running loop; dropping it cancels the loop
#[must_use = "dropping a Subscription cancels it"]
#[derive(Debug)]
pub struct Subscription {
    token: CancellationToken,
    // Held by the loop while a callback runs
    live: Arc<Mutex<bool>>,
}

impl Subscription {
    /// Stop the loop. Idempotent.
    ///
    /// Blocks until an in-flight callback finishes, so it must not be called
    /// from inside that callback.
    pub fn cancel(&self) {
        match self.live.lock() {
            Ok(mut live) => *live = false,
            Err(poisoned) => *poisoned.into_inner() = false,
        }
        self.token.cancel();
    }

    /// True after [`cancel`](Self::cancel) or once the loop has stopped on its own
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Run `tick` every `interval` until cancelled or `tick` breaks.
/// The first tick fires immediately.
fn spawn_loop<F>(name: &'static str, interval: Duration, mut tick: F) -> Result<Subscription>
where
    F: FnMut() -> ControlFlow<()> + Send + 'static,
{
    if interval.is_zero() {
        return Err(TrackingError::InvalidArgument(
            "interval must be non-zero".to_string(),
        ));
    }
    let runtime = tokio::runtime::Handle::try_current()
        .map_err(|e| TrackingError::Internal(format!("no tokio runtime: {}", e)))?;

    let token = CancellationToken::new();
    let live = Arc::new(Mutex::new(true));
    let task_token = token.clone();
    let task_live = Arc::clone(&live);

    runtime.spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = task_token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match run_tick(&task_live, &mut tick) {
                Some(ControlFlow::Continue(())) => {}
                Some(ControlFlow::Break(())) => {
                    task_token.cancel();
                    break;
                }
                None => break,
            }
        }
        debug!(name, "subscription loop stopped");
    });

    Ok(Subscription { token, live })
}

/// Invoke `tick` under the live lock; `None` once cancelled
fn run_tick<F>(live: &Mutex<bool>, tick: &mut F) -> Option<ControlFlow<()>>
where
    F: FnMut() -> ControlFlow<()>,
{
    let live = live.lock().ok()?;
    if !*live {
        return None;
    }
    Some(tick())
}

/// Poll one bus every `interval`, passing each read to `callback`.
///
/// Read errors (unknown bus) are delivered to the callback and polling
/// continues.
pub fn poll_bus<F>(
    broadcast: LocationBroadcastService,
    bus_id: impl Into<String>,
    interval: Duration,
    mut callback: F,
) -> Result<Subscription>
where
    F: FnMut(Result<BusView>) + Send + 'static,
{
    let bus_id = bus_id.into();
    spawn_loop("poll_bus", interval, move || {
        callback(broadcast.read(&bus_id));
        ControlFlow::Continue(())
    })
}

/// Device position failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PositionError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Position unavailable: {0}")]
    Unavailable(String),

    #[error("Position request timed out")]
    Timeout,

    /// Device produced a fix outside the valid coordinate range
    #[error("Invalid fix: lat={lat}, lng={lng}")]
    InvalidFix { lat: f64, lng: f64 },
}

/// Something that knows where the device is
pub trait PositionSource: Send + Sync {
    fn current_position(&self) -> std::result::Result<LocationFix, PositionError>;
}

/// Sample `source` every `interval`.
///
/// Fixes with out-of-range coordinates never reach `on_fix`; they are
/// reported to `on_error` as [`PositionError::InvalidFix`].
pub fn watch_position<S, F, E>(
    source: Arc<S>,
    interval: Duration,
    mut on_fix: F,
    mut on_error: E,
) -> Result<Subscription>
where
    S: PositionSource + ?Sized + 'static,
    F: FnMut(LocationFix) + Send + 'static,
    E: FnMut(PositionError) + Send + 'static,
{
    spawn_loop("watch_position", interval, move || {
        match sample(source.as_ref()) {
            Ok(fix) => on_fix(fix),
            Err(err) => on_error(err),
        }
        ControlFlow::Continue(())
    })
}

fn sample<S: PositionSource + ?Sized>(source: &S) -> std::result::Result<LocationFix, PositionError> {
    let fix = source.current_position()?;
    if !is_valid_coordinate(fix.lat, fix.lng) {
        return Err(PositionError::InvalidFix {
            lat: fix.lat,
            lng: fix.lng,
        });
    }
    Ok(fix)
}

/// Push the device position for `bus_id` every `interval`.
///
/// Stops on its own once the trip is gone or the driver no longer owns it.
/// Device errors and rejected fixes are logged and the loop keeps going.
pub fn spawn_driver_uplink<S>(
    ingest: LocationIngestionService,
    bus_id: impl Into<String>,
    driver_id: impl Into<String>,
    source: Arc<S>,
    interval: Duration,
) -> Result<Subscription>
where
    S: PositionSource + ?Sized + 'static,
{
    let bus_id = bus_id.into();
    let driver_id = driver_id.into();
    info!(bus_id = %bus_id, driver_id = %driver_id, ?interval, "driver uplink started");

    spawn_loop("driver_uplink", interval, move || {
        let fix = match sample(source.as_ref()) {
            Ok(fix) => fix,
            Err(err) => {
                warn!(bus_id = %bus_id, error = %err, "no device position");
                return ControlFlow::Continue(());
            }
        };

        match ingest.submit_location(&bus_id, &driver_id, fix) {
            Ok(IngestOutcome::Accepted(_)) | Ok(IngestOutcome::Dropped(_)) => {
                ControlFlow::Continue(())
            }
            Err(TrackingError::NoActiveTrip(_)) | Err(TrackingError::Unauthorized { .. }) => {
                info!(bus_id = %bus_id, driver_id = %driver_id, "trip over, driver uplink stopping");
                ControlFlow::Break(())
            }
            Err(_) => ControlFlow::Continue(()),
        }
    })
}
