use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local, Utc};
use log::{info, warn};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    buffer::LiveBuffer,
    ingest::{ingestion_loop, IngestionController, IngestionStats, StatsSnapshot},
    models::{Session, SessionStatus, SessionSummary},
    report::ReportGenerator,
    settings::Settings,
    storage::{session_log_path, SessionLogWriter},
    transport::Transport,
};

use super::SessionState;

type IngestionResult = std::result::Result<Result<IngestionController>, JoinError>;

struct ActiveSession {
    session: Session,
    stats: IngestionStats,
    cancel_token: CancellationToken,
    handle: JoinHandle<Result<IngestionController>>,
}

/// Owns the process's single session from subscribe to report.
pub struct SessionController<T: Transport> {
    transport: T,
    topic: String,
    capacity: usize,
    results_dir: PathBuf,
    reports: ReportGenerator,
    state: SessionState,
    active: Option<ActiveSession>,
}

impl<T: Transport> SessionController<T> {
    /// Fails on settings that could not carry a session, before anything is
    /// opened or subscribed.
    pub fn new(transport: T, settings: &Settings) -> Result<Self> {
        settings.validate().context("invalid session settings")?;
        Ok(Self {
            transport,
            topic: settings.topic.clone(),
            capacity: settings.live.capacity,
            results_dir: settings.results_dir.clone(),
            reports: ReportGenerator::new(settings.results_dir.clone(), settings.report.clone()),
            state: SessionState::new(),
            active: None,
        })
    }

    pub fn status(&self) -> SessionStatus {
        self.state.status
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn session(&self) -> Option<&Session> {
        self.active.as_ref().map(|active| &active.session)
    }

    /// Read-only view for the renderer while the session is active.
    pub fn live_buffer(&self) -> Option<LiveBuffer> {
        self.session().map(|session| session.buffer.clone())
    }

    pub fn stats(&self) -> Option<StatsSnapshot> {
        self.active.as_ref().map(|active| active.stats.snapshot())
    }

    /// `NotStarted -> Active`: opens the log, then subscribes.
    pub async fn start(&mut self) -> Result<Session> {
        self.state.ensure_can_begin()?;

        let started_local = Local::now();
        let started_at = started_local.with_timezone(&Utc);
        let session_id = Uuid::new_v4().to_string();

        let writer = match self.open_log(started_local) {
            Ok(writer) => writer,
            Err(err) => {
                self.state.abandon(Utc::now());
                return Err(err);
            }
        };
        let log_path = writer.path().to_path_buf();

        let subscription = match self.transport.subscribe(&self.topic).await {
            Ok(subscription) => subscription,
            Err(err) => {
                self.state.abandon(Utc::now());
                let mut writer = writer;
                if let Err(close_err) = writer.flush_and_close() {
                    warn!("failed to close unused session log: {close_err:#}");
                }
                return Err(err.context("transport failure"));
            }
        };

        let buffer = LiveBuffer::new(self.capacity);
        let stats = IngestionStats::default();
        let controller = IngestionController::new(buffer.clone(), writer, stats.clone());
        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(ingestion_loop(
            controller,
            subscription,
            cancel_token.clone(),
        ));

        self.state.begin(session_id.clone(), started_at)?;

        let session = Session {
            id: session_id,
            started_at,
            log_path,
            buffer,
        };
        info!(
            "Session {} started on topic {}; logging to {}",
            session.id,
            self.topic,
            session.log_path.display()
        );

        self.active = Some(ActiveSession {
            session: session.clone(),
            stats,
            cancel_token,
            handle,
        });
        Ok(session)
    }

    /// Runs until `shutdown` fires or ingestion ends on its own (transport
    /// closed the stream, or the log failed), then closes the session.
    pub async fn run_until(&mut self, shutdown: CancellationToken) -> Result<SessionSummary> {
        let joined = {
            let active = self
                .active
                .as_mut()
                .ok_or_else(|| anyhow!("no active session to run"))?;
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Termination signal received; ending session");
                    None
                }
                joined = &mut active.handle => Some(joined),
            }
        };

        self.finish(joined).await
    }

    /// `Active -> Closed`: stops delivery, unsubscribes, closes the log and
    /// builds the report.
    pub async fn stop(&mut self) -> Result<SessionSummary> {
        self.finish(None).await
    }

    async fn finish(&mut self, joined: Option<IngestionResult>) -> Result<SessionSummary> {
        let active = self
            .active
            .take()
            .ok_or_else(|| anyhow!("no active session to stop"))?;

        active.cancel_token.cancel();
        let joined = match joined {
            Some(joined) => joined,
            None => active.handle.await,
        };

        // No further on_message can run past this point.
        if let Err(err) = self.transport.unsubscribe().await {
            warn!("transport unsubscribe failed: {err:#}");
        }

        let stopped_at = Utc::now();
        self.state.close(stopped_at)?;

        let controller = joined.context("ingestion worker failed to join")??;
        let mut writer = controller.into_writer();
        writer.flush_and_close()?;

        let stats = active.stats.snapshot();
        let session = active.session;
        info!(
            "Session {} closed: {} samples accepted, {} rejected",
            session.id, stats.accepted, stats.rejected
        );

        let reports = self.reports.clone();
        let log_path = session.log_path.clone();
        let outcome = tokio::task::spawn_blocking(move || reports.generate(&log_path))
            .await
            .context("report worker join failed")??;

        Ok(SessionSummary {
            session_id: session.id,
            started_at: session.started_at,
            stopped_at,
            accepted: stats.accepted,
            rejected: stats.rejected,
            log_path: session.log_path,
            outcome,
        })
    }

    fn open_log(&self, started_local: DateTime<Local>) -> Result<SessionLogWriter> {
        std::fs::create_dir_all(&self.results_dir).with_context(|| {
            format!(
                "failed to create results directory {}",
                self.results_dir.display()
            )
        })?;
        SessionLogWriter::create(session_log_path(&self.results_dir, started_local))
    }
}

impl<T: Transport> Drop for SessionController<T> {
    fn drop(&mut self) {
        if let Some(active) = &self.active {
            active.cancel_token.cancel();
        }
    }
}
