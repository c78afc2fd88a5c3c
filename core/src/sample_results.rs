//! Output table of the sampling run.

use std::path::Path;

use serde::Serialize;

use crate::clone::CloneOutcome;
use crate::error::CensusErr;
use crate::error::Result;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SampleRow<'a> {
    identifier: String,
    status: &'static str,
    line_count: u64,
    elapsed_seconds: f64,
    log_path: Option<&'a Path>,
}

impl<'a> From<&'a CloneOutcome> for SampleRow<'a> {
    fn from(outcome: &'a CloneOutcome) -> Self {
        Self {
            identifier: outcome.identifier.to_string(),
            status: outcome.status.as_str(),
            line_count: outcome.line_count,
            elapsed_seconds: round_to_centis(outcome.elapsed_seconds),
            log_path: outcome.log_path.as_deref(),
        }
    }
}

fn round_to_centis(seconds: f64) -> f64 {
    (seconds * 100.0).round() / 100.0
}

/// Write one row per outcome, in the order given, replacing `path`.
///
/// The header is written even when `outcomes` is empty.
pub fn write_sample_results(path: &Path, outcomes: &[CloneOutcome]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path).map_err(|source| CensusErr::csv(path, source))?;
    if outcomes.is_empty() {
        writer
            .write_record(["identifier", "status", "lineCount", "elapsedSeconds", "logPath"])
            .map_err(|source| CensusErr::csv(path, source))?;
    }
    for outcome in outcomes {
        writer
            .serialize(SampleRow::from(outcome))
            .map_err(|source| CensusErr::csv(path, source))?;
    }
    writer.flush()?;
    Ok(())
}
