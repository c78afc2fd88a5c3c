use std::path::PathBuf;

use crate::clone::CloneOutcome;
use crate::repository::RepositoryId;

/// Milestones of a pipeline run, in the order they happen.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    SampleStarted {
        source_path: PathBuf,
        sample_size: usize,
    },
    RetryStarted {
        repositories: usize,
        timeout_seconds: u64,
        workers: usize,
    },
    CloneStarted {
        identifier: RepositoryId,
        destination: PathBuf,
    },
    CloneFinished(CloneOutcome),
    SampleFinished {
        result_path: PathBuf,
        log_dir: PathBuf,
    },
    RetryFinished {
        added: usize,
        processed_path: PathBuf,
        failures: Vec<CloneOutcome>,
    },
}

/// Receives [`PipelineEvent`]s as a run proceeds.
///
/// Called from worker tasks in the retry pipeline, so implementations must be
/// thread-safe.
pub trait ProgressReporter: Send + Sync {
    fn on_event(&self, event: &PipelineEvent);
}

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {
    fn on_event(&self, _event: &PipelineEvent) {}
}
