use std::{
    fs::{File, OpenOptions},
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use log::info;

use crate::models::Sample;

use super::{LogRow, LOG_HEADER};

/// Append-only writer for one session's log file.
///
/// Every row is pushed through to the file as soon as it is appended;
/// [`flush_and_close`](Self::flush_and_close) additionally syncs to disk.
pub struct SessionLogWriter {
    path: PathBuf,
    writer: Option<csv::Writer<File>>,
    rows: u64,
}

impl SessionLogWriter {
    /// Creates the file and writes the header row. Never overwrites an
    /// existing log.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .with_context(|| format!("failed to create session log {}", path.display()))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer
            .write_record(LOG_HEADER)
            .and_then(|_| writer.flush().map_err(csv::Error::from))
            .with_context(|| format!("failed to write header to {}", path.display()))?;

        info!("Session log opened at {}", path.display());

        Ok(Self {
            path,
            writer: Some(writer),
            rows: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn is_closed(&self) -> bool {
        self.writer.is_none()
    }

    pub fn append(&mut self, sample: &Sample) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| anyhow!("session log {} is already closed", self.path.display()))?;

        let row = LogRow {
            x: sample.x,
            y: sample.y,
            timestamp: sample.epoch_secs(),
        };
        writer
            .serialize(row)
            .with_context(|| format!("failed to append to {}", self.path.display()))?;
        // Hand the row to the OS now rather than holding it in csv's buffer.
        writer
            .flush()
            .with_context(|| format!("failed to write to {}", self.path.display()))?;

        self.rows += 1;
        Ok(())
    }

    /// Flushes, syncs and releases the file. Later calls are no-ops.
    pub fn flush_and_close(&mut self) -> Result<u64> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(self.rows);
        };

        writer
            .flush()
            .with_context(|| format!("failed to flush {}", self.path.display()))?;
        let file = writer
            .into_inner()
            .map_err(|err| anyhow!("failed to release {}: {}", self.path.display(), err.error()))?;
        file.sync_all()
            .with_context(|| format!("failed to sync {}", self.path.display()))?;

        info!(
            "Session log closed at {} ({} rows)",
            self.path.display(),
            self.rows
        );
        Ok(self.rows)
    }
}
