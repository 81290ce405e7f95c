use std::path::Path;

use anyhow::{Context, Result};

use super::LogRow;

/// Reads every row of a session log. A missing file reads as empty, since a
/// session whose log never opened has nothing to report.
pub fn read_session_log(path: &Path) -> Result<Vec<LogRow>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open session log {}", path.display()))?;

    reader
        .deserialize()
        .enumerate()
        .map(|(index, row)| {
            row.with_context(|| format!("malformed row {} in {}", index + 1, path.display()))
        })
        .collect()
}
