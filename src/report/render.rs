use std::ops::Range;

use anyhow::{anyhow, Result};
use image::RgbImage;
use plotters::prelude::*;

use crate::models::BoundingBox;
use crate::settings::ReportSettings;

const FONT: &str = "sans-serif";
const POINT_ALPHA: f64 = 0.7;

pub fn report_title(point_count: usize) -> String {
    format!("Final Session Map - Total Points: {point_count}")
}

/// Margins and font sizes scaled to the canvas.
#[derive(Debug, Clone, Copy)]
struct Layout {
    margin: u32,
    title_px: u32,
    label_px: u32,
    x_label_area: u32,
    y_label_area: u32,
}

impl Layout {
    fn for_canvas(width: u32, height: u32) -> Self {
        let unit = width.min(height);
        Self {
            margin: (unit / 60).max(2),
            title_px: (unit / 30).max(8),
            label_px: (unit / 50).max(6),
            x_label_area: (height / 12).max(12),
            y_label_area: (width / 12).max(16),
        }
    }
}

/// Axis ranges sharing one scale, centred on `bounds` and sized to a
/// `plot_w x plot_h` pixel area. The narrower axis is widened. A zero span
/// borrows the other axis's scale; with both spans zero the window is 2 mm
/// across its short side.
fn equal_aspect_ranges(
    bounds: &BoundingBox,
    plot_w: u32,
    plot_h: u32,
) -> (Range<f64>, Range<f64>) {
    let (w, h) = (plot_w.max(1) as f64, plot_h.max(1) as f64);
    let (span_x, span_y) = (bounds.width(), bounds.height());

    let mm_per_px = match (span_x > 0.0, span_y > 0.0) {
        (true, true) => (span_x / w).max(span_y / h),
        (true, false) => span_x / w,
        (false, true) => span_y / h,
        (false, false) => 2.0 / w.min(h),
    };

    let center_x = (bounds.x_min + bounds.x_max) / 2.0;
    let center_y = (bounds.y_min + bounds.y_max) / 2.0;
    let half_w = w * mm_per_px / 2.0;
    let half_h = h * mm_per_px / 2.0;

    (
        center_x - half_w..center_x + half_w,
        center_y - half_h..center_y + half_h,
    )
}

/// Full-resolution scatter of `points` within `bounds`, equal aspect.
pub fn render_scatter(
    points: &[(i64, i64)],
    bounds: &BoundingBox,
    settings: &ReportSettings,
) -> Result<RgbImage> {
    let (width, height) = (settings.width_px, settings.height_px);
    let layout = Layout::for_canvas(width, height);
    let mut pixels = vec![255u8; width as usize * height as usize * 3];

    {
        let root = BitMapBackend::with_buffer(&mut pixels, (width, height)).into_drawing_area();
        root.fill(&WHITE)?;

        let area = root.titled(&report_title(points.len()), (FONT, layout.title_px))?;
        let (area_w, area_h) = area.dim_in_pixel();
        let plot_w = area_w.saturating_sub(2 * layout.margin + layout.y_label_area);
        let plot_h = area_h.saturating_sub(2 * layout.margin + layout.x_label_area);
        let (x_range, y_range) = equal_aspect_ranges(bounds, plot_w, plot_h);

        let mut chart = ChartBuilder::on(&area)
            .margin(layout.margin)
            .x_label_area_size(layout.x_label_area)
            .y_label_area_size(layout.y_label_area)
            .build_cartesian_2d(x_range, y_range)?;

        chart
            .configure_mesh()
            .x_desc("X (mm)")
            .y_desc("Y (mm)")
            .x_label_formatter(&|v| format!("{v:.0}"))
            .y_label_formatter(&|v| format!("{v:.0}"))
            .label_style((FONT, layout.label_px))
            .axis_desc_style((FONT, layout.label_px))
            .bold_line_style(BLACK.mix(0.12))
            .light_line_style(BLACK.mix(0.04))
            .draw()?;

        let style = BLUE.mix(POINT_ALPHA).filled();
        chart.draw_series(points.iter().map(|&(x, y)| {
            Circle::new((x as f64, y as f64), settings.point_radius_px, style)
        }))?;

        root.present()?;
    }

    RgbImage::from_raw(width, height, pixels)
        .ok_or_else(|| anyhow!("report canvas does not match {width}x{height}"))
}
