//! Session-related data models.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::buffer::LiveBuffer;

use super::ReportOutcome;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    NotStarted,
    Active,
    Closed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::NotStarted => "NotStarted",
            SessionStatus::Active => "Active",
            SessionStatus::Closed => "Closed",
        }
    }
}

impl Default for SessionStatus {
    fn default() -> Self {
        SessionStatus::NotStarted
    }
}

/// One continuous ingestion run.
///
/// Cloning is cheap: the live buffer is shared, so a clone handed to the
/// renderer observes the same window the ingestion worker writes to.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub log_path: PathBuf,
    pub buffer: LiveBuffer,
}

/// What a clean session end reports back to the caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub stopped_at: DateTime<Utc>,
    pub accepted: u64,
    pub rejected: u64,
    pub log_path: PathBuf,
    pub outcome: ReportOutcome,
}
