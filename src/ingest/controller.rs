use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use anyhow::Error;
use log::warn;

use crate::buffer::LiveBuffer;
use crate::models::Sample;
use crate::storage::SessionLogWriter;

use super::codec::{decode, DecodeError};

/// What became of one inbound payload.
#[derive(Debug)]
pub enum MessageOutcome {
    Accepted(Sample),
    Rejected(DecodeError),
    /// The sample reached the live window but could not be logged. The
    /// session cannot continue.
    StorageFailed(Error),
}

/// Counters shared with whoever watches the session.
#[derive(Debug, Clone, Default)]
pub struct IngestionStats {
    accepted: Arc<AtomicU64>,
    rejected: Arc<AtomicU64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub accepted: u64,
    pub rejected: u64,
}

impl IngestionStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            accepted: self.accepted.load(Ordering::Acquire),
            rejected: self.rejected.load(Ordering::Acquire),
        }
    }

    fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::AcqRel);
    }

    fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::AcqRel);
    }
}

/// Feeds decoded samples into the live window and the session log.
///
/// Owned by the ingestion worker, so appends are sequential by construction.
pub struct IngestionController {
    buffer: LiveBuffer,
    writer: SessionLogWriter,
    stats: IngestionStats,
}

impl IngestionController {
    pub fn new(buffer: LiveBuffer, writer: SessionLogWriter, stats: IngestionStats) -> Self {
        Self {
            buffer,
            writer,
            stats,
        }
    }

    pub fn stats(&self) -> &IngestionStats {
        &self.stats
    }

    pub fn on_message(&mut self, payload: &[u8]) -> MessageOutcome {
        let sample = match decode(payload) {
            Ok(sample) => sample,
            Err(reason) => {
                self.stats.record_rejected();
                warn!(
                    "Parsing error: {reason} (payload {:?})",
                    String::from_utf8_lossy(payload)
                );
                return MessageOutcome::Rejected(reason);
            }
        };

        self.buffer.push(sample);
        if let Err(err) = self.writer.append(&sample) {
            return MessageOutcome::StorageFailed(err);
        }

        self.stats.record_accepted();
        MessageOutcome::Accepted(sample)
    }

    /// Releases the log writer once no more messages will arrive.
    pub fn into_writer(self) -> SessionLogWriter {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::read_session_log;

    #[test]
    fn accepted_samples_reach_buffer_and_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.csv");
        let buffer = LiveBuffer::new(2);
        let writer = SessionLogWriter::create(&path).unwrap();
        let mut controller = IngestionController::new(buffer.clone(), writer, IngestionStats::default());

        for payload in ["10,20", "30,40", "bad", "50,60"] {
            controller.on_message(payload.as_bytes());
        }

        assert_eq!(
            controller.stats().snapshot(),
            StatsSnapshot {
                accepted: 3,
                rejected: 1
            }
        );
        let window: Vec<_> = buffer.snapshot().iter().map(|s| s.position()).collect();
        assert_eq!(window, vec![(30, 40), (50, 60)]);

        controller.into_writer().flush_and_close().unwrap();
        let rows: Vec<_> = read_session_log(&path)
            .unwrap()
            .iter()
            .map(|row| (row.x, row.y))
            .collect();
        assert_eq!(rows, vec![(10, 20), (30, 40), (50, 60)]);
    }

    #[test]
    fn rejected_payload_has_no_side_effects() {
        let dir = tempfile::tempdir().unwrap();
        let buffer = LiveBuffer::new(4);
        let writer = SessionLogWriter::create(dir.path().join("s.csv")).unwrap();
        let mut controller = IngestionController::new(buffer.clone(), writer, IngestionStats::default());

        let outcome = controller.on_message(b"1,2,3");
        assert!(matches!(outcome, MessageOutcome::Rejected(DecodeError::WrongFieldCount(3))));
        assert!(buffer.is_empty());
        assert_eq!(controller.into_writer().rows(), 0);
    }

    #[test]
    fn closed_log_reports_storage_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = SessionLogWriter::create(dir.path().join("s.csv")).unwrap();
        writer.flush_and_close().unwrap();
        let mut controller =
            IngestionController::new(LiveBuffer::new(4), writer, IngestionStats::default());

        assert!(matches!(controller.on_message(b"1,2"), MessageOutcome::StorageFailed(_)));
        assert_eq!(controller.stats().snapshot().accepted, 0);
    }
}
