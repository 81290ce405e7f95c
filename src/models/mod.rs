mod report;
mod sample;
mod session;

pub use report::{BoundingBox, Report, ReportOutcome};
pub use sample::Sample;
pub use session::{Session, SessionStatus, SessionSummary};
