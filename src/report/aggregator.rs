use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use log::info;

use crate::models::{BoundingBox, Report, ReportOutcome};
use crate::settings::ReportSettings;
use crate::storage::read_session_log;

use super::render::render_scatter;

/// Each axis is widened by this share of its span on both sides.
pub const PADDING_RATIO: f64 = 0.05;

/// `<dir>/final_report_<YYYYmmdd-HHMMSS>.png`
pub fn report_image_path(dir: &Path, generated_at: DateTime<Local>) -> PathBuf {
    dir.join(format!(
        "final_report_{}.png",
        generated_at.format("%Y%m%d-%H%M%S")
    ))
}

/// Turns a closed session log into the final scatter report.
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    output_dir: PathBuf,
    settings: ReportSettings,
}

impl ReportGenerator {
    pub fn new(output_dir: impl Into<PathBuf>, settings: ReportSettings) -> Self {
        Self {
            output_dir: output_dir.into(),
            settings,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn generate(&self, log_path: &Path) -> Result<ReportOutcome> {
        self.generate_at(log_path, Local::now())
    }

    pub fn generate_at(&self, log_path: &Path, generated_at: DateTime<Local>) -> Result<ReportOutcome> {
        let rows = read_session_log(log_path)?;
        let points: Vec<(i64, i64)> = rows.iter().map(|row| (row.x, row.y)).collect();

        let Some(tight) = BoundingBox::enclosing(points.iter().copied()) else {
            info!("No rows in {}; skipping report", log_path.display());
            return Ok(ReportOutcome::NoData);
        };
        let bounding_box = tight.padded(PADDING_RATIO);

        info!(
            "Generating final report for {} points from {}",
            points.len(),
            log_path.display()
        );

        std::fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("failed to create report directory {}", self.output_dir.display())
        })?;
        let image_path = report_image_path(&self.output_dir, generated_at);

        render_scatter(&points, &bounding_box, &self.settings)?
            .save(&image_path)
            .with_context(|| format!("failed to write report image {}", image_path.display()))?;

        info!("Report written to {}", image_path.display());

        Ok(ReportOutcome::Generated(Report {
            point_count: points.len(),
            bounding_box,
            image_path,
            generated_at,
        }))
    }
}
