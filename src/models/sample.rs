use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One decoded position reading, stamped with the time it was received.
///
/// `x` and `y` are millimetre offsets in the sensor's fixed frame. The
/// transport carries no timestamp, so `captured_at` is always receipt time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub x: i64,
    pub y: i64,
    pub captured_at: DateTime<Utc>,
}

impl Sample {
    pub fn new(x: i64, y: i64, captured_at: DateTime<Utc>) -> Self {
        Self { x, y, captured_at }
    }

    pub fn position(&self) -> (i64, i64) {
        (self.x, self.y)
    }

    /// Receipt time as fractional seconds since the Unix epoch.
    pub fn epoch_secs(&self) -> f64 {
        self.captured_at.timestamp_micros() as f64 / 1_000_000.0
    }
}
