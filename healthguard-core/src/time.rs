//! Timestamp conversion and calendar fractions
//!
//! Telemetry carries integer milliseconds since the Unix epoch. All calendar
//! fields are taken in UTC so the same export produces the same features on
//! every host.

use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::constants::{DAYS_PER_MONTH, HOURS_PER_DAY};

/// Calendar timestamp used throughout the pipeline
pub type Timestamp = DateTime<Utc>;

/// Convert epoch milliseconds to a UTC timestamp.
///
/// Returns `None` when the value is outside chrono's representable range.
pub fn from_epoch_millis(millis: i64) -> Option<Timestamp> {
    DateTime::from_timestamp_millis(millis)
}

/// Hour of day as a linear fraction, `hour / 24`.
///
/// Deliberately not cyclic: 23:00 and 00:00 are far apart.
pub fn hour_fraction(ts: &Timestamp) -> f32 {
    ts.hour() as f32 / HOURS_PER_DAY
}

/// Day of month as a linear fraction, `day / 31`.
pub fn day_fraction(ts: &Timestamp) -> f32 {
    ts.day() as f32 / DAYS_PER_MONTH
}
