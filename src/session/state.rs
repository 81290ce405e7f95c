use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::SessionStatus;

/// `NotStarted -> Active -> Closed`, each edge taken at most once.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub status: SessionStatus,
    pub session_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ensure_can_begin(&self) -> Result<()> {
        match self.status {
            SessionStatus::NotStarted => Ok(()),
            SessionStatus::Active => bail!("a session is already active"),
            SessionStatus::Closed => bail!("session already closed; sessions cannot be restarted"),
        }
    }

    pub fn begin(&mut self, session_id: String, started_at: DateTime<Utc>) -> Result<()> {
        self.ensure_can_begin()?;
        *self = Self {
            status: SessionStatus::Active,
            session_id: Some(session_id),
            started_at: Some(started_at),
            stopped_at: None,
        };
        Ok(())
    }

    pub fn close(&mut self, stopped_at: DateTime<Utc>) -> Result<()> {
        match self.status {
            SessionStatus::Active => {
                self.status = SessionStatus::Closed;
                self.stopped_at = Some(stopped_at);
                Ok(())
            }
            SessionStatus::NotStarted => bail!("no active session to close"),
            SessionStatus::Closed => bail!("session already closed"),
        }
    }

    /// A start that failed part-way still uses up the process's one session.
    pub fn abandon(&mut self, at: DateTime<Utc>) {
        if self.status == SessionStatus::NotStarted {
            self.status = SessionStatus::Closed;
            self.stopped_at = Some(at);
        }
    }
}
