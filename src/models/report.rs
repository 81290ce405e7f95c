use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::Serialize;

/// Axis-aligned region in sensor millimetres.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl BoundingBox {
    /// Tight bounds over a set of positions, `None` when there are none.
    pub fn enclosing<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (i64, i64)>,
    {
        let mut points = points.into_iter();
        let (x, y) = points.next()?;
        let (mut x_min, mut x_max, mut y_min, mut y_max) = (x, x, y, y);
        for (x, y) in points {
            x_min = x_min.min(x);
            x_max = x_max.max(x);
            y_min = y_min.min(y);
            y_max = y_max.max(y);
        }

        Some(Self {
            x_min: x_min as f64,
            x_max: x_max as f64,
            y_min: y_min as f64,
            y_max: y_max as f64,
        })
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Grows each axis by `ratio` of its own span on both sides.
    ///
    /// A zero-span axis stays zero-span: its padding is `0 * ratio`.
    pub fn padded(&self, ratio: f64) -> Self {
        let pad_x = self.width() * ratio;
        let pad_y = self.height() * ratio;
        Self {
            x_min: self.x_min - pad_x,
            x_max: self.x_max + pad_x,
            y_min: self.y_min - pad_y,
            y_max: self.y_max + pad_y,
        }
    }
}

/// Final artifact of a closed session that collected data.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub point_count: usize,
    pub bounding_box: BoundingBox,
    pub image_path: PathBuf,
    pub generated_at: DateTime<Local>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum ReportOutcome {
    Generated(Report),
    NoData,
}

impl ReportOutcome {
    pub fn report(&self) -> Option<&Report> {
        match self {
            ReportOutcome::Generated(report) => Some(report),
            ReportOutcome::NoData => None,
        }
    }
}
