pub mod aggregator;
pub mod render;

pub use aggregator::{report_image_path, ReportGenerator, PADDING_RATIO};
