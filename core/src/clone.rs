//! Clone one repository into a scratch directory, classify the result and
//! optionally measure it.
//!
//! Every call to [`CloneWorker::clone_and_measure`] yields exactly one
//! [`CloneOutcome`], and the scratch directory is gone by the time it
//! returns, whichever way the clone ended.

use std::ffi::OsStr;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use census_line_count::count_lines;
use census_popularity::PopularityLookup;
use census_utils_string::lossy_prefix;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::clone_log;
use crate::config::Config;
use crate::progress::PipelineEvent;
use crate::progress::ProgressReporter;
use crate::repository::RepositoryId;
use crate::spawn::CapturedOutput;
use crate::spawn::CommandResult;
use crate::spawn::run_with_timeout;

const TEMP_DIR_PREFIX: &str = "repo_clone_";

/// Terminal classification of one clone attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloneStatus {
    Success,
    /// The clone command exited with a non-zero status.
    CloneFailed,
    Timeout,
    /// Anything else went wrong: the command could not be spawned, the
    /// scratch directory could not be created, measuring panicked.
    Exception,
}

impl CloneStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "ok",
            Self::CloneFailed => "clone_failed",
            Self::Timeout => "timeout",
            Self::Exception => "exception",
        }
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl fmt::Display for CloneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CloneOutcome {
    pub identifier: RepositoryId,
    pub status: CloneStatus,
    /// Zero unless `status` is `Success` and measuring was requested.
    pub line_count: u64,
    pub elapsed_seconds: f64,
    /// Set only when enrichment was requested.
    pub popularity: Option<u64>,
    /// Set only when running with a log directory.
    pub log_path: Option<PathBuf>,
    /// Set whenever `status` is not `Success`.
    pub failure_reason: Option<String>,
    pub exit_code: Option<i32>,
}

impl CloneOutcome {
    fn new(identifier: &RepositoryId, status: CloneStatus, elapsed_seconds: f64) -> Self {
        Self {
            identifier: identifier.clone(),
            status,
            line_count: 0,
            elapsed_seconds,
            popularity: None,
            log_path: None,
            failure_reason: None,
            exit_code: None,
        }
    }

    pub(crate) fn exception(
        identifier: &RepositoryId,
        elapsed_seconds: f64,
        message: &str,
    ) -> Self {
        let mut outcome = Self::new(identifier, CloneStatus::Exception, elapsed_seconds);
        outcome.failure_reason = Some(format!("exception: {message}"));
        outcome
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneOptions {
    pub timeout: Duration,
    /// Count lines of the checkout on success.
    pub measure: bool,
    /// Look up popularity on success.
    pub enrich: bool,
    /// Write a per-repository log of the clone output under this directory.
    pub log_dir: Option<PathBuf>,
}

pub struct CloneWorker {
    command: Vec<String>,
    ssh_host: String,
    failure_reason_max_bytes: usize,
    lookup: Arc<dyn PopularityLookup>,
    reporter: Arc<dyn ProgressReporter>,
}

impl CloneWorker {
    pub fn new(
        config: &Config,
        lookup: Arc<dyn PopularityLookup>,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            command: config.clone_command.clone(),
            ssh_host: config.ssh_host.clone(),
            failure_reason_max_bytes: config.failure_reason_max_bytes,
            lookup,
            reporter,
        }
    }

    pub async fn clone_and_measure(
        &self,
        identifier: &RepositoryId,
        options: &CloneOptions,
    ) -> CloneOutcome {
        let started = Instant::now();
        let log_path = options
            .log_dir
            .as_deref()
            .map(|dir| clone_log::log_path_for(dir, identifier));

        // The TempDir guard removes the directory when dropped, which also
        // covers panics and cancellation of this future.
        let mut outcome = match tempfile::Builder::new().prefix(TEMP_DIR_PREFIX).tempdir() {
            Ok(workdir) => {
                let outcome = self
                    .clone_into(identifier, workdir.path(), options, log_path.as_deref(), started)
                    .await;
                let workdir_path = workdir.path().to_path_buf();
                if let Err(err) = workdir.close() {
                    warn!(
                        repository = %identifier,
                        path = %workdir_path.display(),
                        error = %err,
                        "failed to remove clone directory"
                    );
                }
                outcome
            }
            Err(err) => {
                self.exception(identifier, started, &err.to_string(), log_path.as_deref())
                    .await
            }
        };

        if options.enrich && outcome.popularity.is_none() {
            outcome.popularity = Some(0);
        }
        outcome.log_path = log_path;
        info!(
            repository = %identifier,
            status = %outcome.status,
            lines = outcome.line_count,
            elapsed = outcome.elapsed_seconds,
            "clone finished"
        );
        outcome
    }

    async fn clone_into(
        &self,
        identifier: &RepositoryId,
        destination: &Path,
        options: &CloneOptions,
        log_path: Option<&Path>,
        started: Instant,
    ) -> CloneOutcome {
        let url = identifier.ssh_url(&self.ssh_host);
        self.reporter.on_event(&PipelineEvent::CloneStarted {
            identifier: identifier.clone(),
            destination: destination.to_path_buf(),
        });
        debug!(repository = %identifier, %url, destination = %destination.display(), "cloning");

        let result = run_with_timeout(
            &self.command,
            &[OsStr::new(&url), destination.as_os_str()],
            options.timeout,
        )
        .await;

        match result {
            Err(err) => {
                self.exception(identifier, started, &err.to_string(), log_path)
                    .await
            }
            Ok(CommandResult::TimedOut { output }) => {
                if let Some(path) = log_path {
                    write_log(path, &output).await;
                    append_log_marker(path, clone_log::TIMEOUT_SENTINEL).await;
                }
                let mut outcome = CloneOutcome::new(
                    identifier,
                    CloneStatus::Timeout,
                    options.timeout.as_secs_f64(),
                );
                outcome.failure_reason =
                    Some(format!("timeout_after_{}", format_timeout(options.timeout)));
                outcome
            }
            Ok(CommandResult::Exited { code, output }) => {
                let elapsed = started.elapsed().as_secs_f64();
                if let Some(path) = log_path {
                    write_log(path, &output).await;
                }
                if code != Some(0) {
                    let mut outcome =
                        CloneOutcome::new(identifier, CloneStatus::CloneFailed, elapsed);
                    outcome.exit_code = code;
                    outcome.failure_reason = Some(self.clone_failure_reason(&output));
                    return outcome;
                }

                let mut outcome = CloneOutcome::new(identifier, CloneStatus::Success, elapsed);
                outcome.exit_code = code;
                if options.measure {
                    let root = destination.to_path_buf();
                    match tokio::task::spawn_blocking(move || count_lines(&root)).await {
                        Ok(lines) => outcome.line_count = lines,
                        Err(err) => {
                            let message = format!("line count failed: {err}");
                            return self
                                .exception(identifier, started, &message, log_path)
                                .await;
                        }
                    }
                }
                if options.enrich {
                    let popularity = self
                        .lookup
                        .fetch_popularity(&identifier.to_string())
                        .await;
                    outcome.popularity = Some(popularity);
                }
                outcome
            }
        }
    }

    fn clone_failure_reason(&self, output: &CapturedOutput) -> String {
        let source = if output.stderr.is_empty() {
            &output.stdout
        } else {
            &output.stderr
        };
        let text = lossy_prefix(source.trim_ascii(), self.failure_reason_max_bytes);
        format!("clone_failed: {text}")
    }

    async fn exception(
        &self,
        identifier: &RepositoryId,
        started: Instant,
        message: &str,
        log_path: Option<&Path>,
    ) -> CloneOutcome {
        warn!(repository = %identifier, error = message, "clone raised an exception");
        if let Some(path) = log_path {
            let marker = format!("{}: {message}", clone_log::EXCEPTION_SENTINEL);
            append_log_marker(path, &marker).await;
        }
        CloneOutcome::exception(identifier, started.elapsed().as_secs_f64(), message)
    }
}

async fn write_log(path: &Path, output: &CapturedOutput) {
    if let Err(err) = clone_log::write_output(path, output).await {
        warn!(path = %path.display(), error = %err, "failed to write clone log");
    }
}

async fn append_log_marker(path: &Path, marker: &str) {
    if let Err(err) = clone_log::append_marker(path, marker).await {
        warn!(path = %path.display(), error = %err, "failed to append to clone log");
    }
}

fn format_timeout(timeout: Duration) -> String {
    if timeout.subsec_nanos() == 0 {
        format!("{}s", timeout.as_secs())
    } else {
        format!("{}ms", timeout.as_millis())
    }
}
