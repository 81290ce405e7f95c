//! Periodic redraw of the live window.
//!
//! The redraw task only ever takes snapshots, so it never holds the buffer
//! lock for longer than a copy and never waits on ingestion.

use std::time::Duration;

use log::{debug, info};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::buffer::LiveBuffer;
use crate::models::{BoundingBox, Sample};

pub trait LiveRenderer: Send + 'static {
    fn draw(&mut self, frame: &[Sample]);
}

pub async fn redraw_loop<R: LiveRenderer>(
    buffer: LiveBuffer,
    mut renderer: R,
    interval: Duration,
    cancel_token: CancellationToken,
) -> R {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let frame = buffer.snapshot();
                renderer.draw(&frame);
            }
            _ = cancel_token.cancelled() => {
                debug!("redraw loop shutting down");
                break;
            }
        }
    }

    renderer
}

/// Logs the auto-scaled extent of the live window every `every_frames`
/// redraws, skipping frames that show nothing new.
pub struct LogRenderer {
    every_frames: u32,
    frames: u32,
    last_reported: Option<Sample>,
}

impl LogRenderer {
    pub fn new(every_frames: u32) -> Self {
        Self {
            every_frames: every_frames.max(1),
            frames: 0,
            last_reported: None,
        }
    }

    pub fn frames(&self) -> u32 {
        self.frames
    }
}

impl LiveRenderer for LogRenderer {
    fn draw(&mut self, frame: &[Sample]) {
        self.frames = self.frames.wrapping_add(1);
        if self.frames % self.every_frames != 0 {
            return;
        }

        let Some(latest) = frame.last().copied() else {
            return;
        };
        if self.last_reported == Some(latest) {
            return;
        }
        self.last_reported = Some(latest);

        if let Some(view) = BoundingBox::enclosing(frame.iter().map(Sample::position)) {
            info!(
                "live window: {} points, latest ({}, {}) mm, x {}..{}, y {}..{}",
                frame.len(),
                latest.x,
                latest.y,
                view.x_min,
                view.x_max,
                view.y_min,
                view.y_max
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::Utc;

    use super::*;

    struct Recording(Arc<Mutex<Vec<usize>>>);

    impl LiveRenderer for Recording {
        fn draw(&mut self, frame: &[Sample]) {
            self.0.lock().unwrap().push(frame.len());
        }
    }

    #[tokio::test]
    async fn redraws_until_cancelled() {
        let buffer = LiveBuffer::new(4);
        buffer.push(Sample::new(1, 2, Utc::now()));

        let frames = Arc::new(Mutex::new(Vec::new()));
        let cancel_token = CancellationToken::new();
        let task = tokio::spawn(redraw_loop(
            buffer.clone(),
            Recording(Arc::clone(&frames)),
            Duration::from_millis(5),
            cancel_token.clone(),
        ));

        tokio::time::sleep(Duration::from_millis(40)).await;
        cancel_token.cancel();
        task.await.unwrap();

        let frames = frames.lock().unwrap();
        assert!(!frames.is_empty());
        assert!(frames.iter().all(|&len| len == 1));
    }

    #[test]
    fn log_renderer_counts_frames() {
        let mut renderer = LogRenderer::new(2);
        let frame = [Sample::new(1, 2, Utc::now())];
        renderer.draw(&frame);
        renderer.draw(&frame);
        renderer.draw(&[]);
        assert_eq!(renderer.frames(), 3);
    }
}
