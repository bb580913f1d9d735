//! Shared primitive types

use chrono::Utc;

/// Epoch timestamp in milliseconds, the wire and storage unit for time
pub type TimestampMs = i64;

/// Current wall-clock time in epoch milliseconds
pub fn now_ms() -> TimestampMs {
    Utc::now().timestamp_millis()
}
