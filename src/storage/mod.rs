//! Durable per-session CSV log.
//!
//! Columns are `X_mm,Y_mm,Timestamp`, header first, timestamp in epoch
//! seconds. The writer appends, the aggregator reads it back in full.

mod reader;
mod writer;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

pub use reader::read_session_log;
pub use writer::SessionLogWriter;

pub const LOG_HEADER: [&str; 3] = ["X_mm", "Y_mm", "Timestamp"];

/// One persisted sample.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LogRow {
    #[serde(rename = "X_mm")]
    pub x: i64,
    #[serde(rename = "Y_mm")]
    pub y: i64,
    #[serde(rename = "Timestamp")]
    pub timestamp: f64,
}

/// `<dir>/sensor_session_<YYYYmmdd_HHMMSS>.csv`
pub fn session_log_path(dir: &Path, started_at: DateTime<Local>) -> PathBuf {
    dir.join(format!(
        "sensor_session_{}.csv",
        started_at.format("%Y%m%d_%H%M%S")
    ))
}
