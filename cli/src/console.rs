//! Human-readable progress on stdout.

use std::path::Path;

use census_core::CloneOutcome;
use census_core::CloneStatus;
use census_core::PipelineEvent;
use census_core::ProgressReporter;
use owo_colors::OwoColorize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Sample,
    Retry,
}

pub struct ConsoleReporter {
    kind: RunKind,
    with_ansi: bool,
}

impl ConsoleReporter {
    pub fn new(kind: RunKind, with_ansi: bool) -> Self {
        Self { kind, with_ansi }
    }

    fn ok(&self, text: &str) -> String {
        if self.with_ansi {
            text.green().to_string()
        } else {
            text.to_string()
        }
    }

    fn fail(&self, text: &str) -> String {
        if self.with_ansi {
            text.red().to_string()
        } else {
            text.to_string()
        }
    }

    /// Render `event` as the lines printed for it, if any.
    pub fn render(&self, event: &PipelineEvent) -> Vec<String> {
        match event {
            PipelineEvent::SampleStarted { .. } => Vec::new(),
            PipelineEvent::RetryStarted {
                repositories,
                timeout_seconds,
                workers,
            } => vec![format!(
                "Retrying {repositories} repos with timeout={timeout_seconds}s and workers={workers}..."
            )],
            PipelineEvent::CloneStarted {
                identifier,
                destination,
            } => match self.kind {
                RunKind::Sample => vec![format!("Cloning {identifier} -> {}", destination.display())],
                RunKind::Retry => Vec::new(),
            },
            PipelineEvent::CloneFinished(outcome) => match self.kind {
                RunKind::Sample => vec![self.sample_line(outcome)],
                RunKind::Retry => vec![self.retry_line(outcome)],
            },
            PipelineEvent::SampleFinished {
                result_path,
                log_dir,
            } => vec![format!(
                "Done. Results saved to {}. Logs in {}/",
                result_path.display(),
                display_dir(log_dir)
            )],
            PipelineEvent::RetryFinished {
                added,
                processed_path,
                failures,
            } => {
                let mut lines = vec![format!(
                    "Done. Added {added} repos to {}.",
                    processed_path.display()
                )];
                if !failures.is_empty() {
                    lines.push(self.fail("Failures:"));
                    lines.extend(failures.iter().map(|failure| {
                        format!("- {}: {}", failure.identifier, failure_reason(failure))
                    }));
                }
                lines
            }
        }
    }

    fn sample_line(&self, outcome: &CloneOutcome) -> String {
        let id = &outcome.identifier;
        match outcome.status {
            CloneStatus::Success => format!(
                "Cloned {id} {}: lines={} time={:.2}s",
                self.ok("OK"),
                outcome.line_count,
                outcome.elapsed_seconds
            ),
            CloneStatus::CloneFailed => {
                let exit = match outcome.exit_code {
                    Some(code) => code.to_string(),
                    None => "signal".to_string(),
                };
                let log = outcome
                    .log_path
                    .as_deref()
                    .map_or_else(|| "log".to_string(), |path| path.display().to_string());
                format!("{} for {id} (exit={exit}). See {log}", self.fail("Clone failed"))
            }
            CloneStatus::Timeout => format!(
                "{} for {id} after {}",
                self.fail("Clone timed out"),
                format_seconds(outcome.elapsed_seconds)
            ),
            CloneStatus::Exception => format!(
                "{} for {id}: {}",
                self.fail("Exception"),
                exception_message(outcome)
            ),
        }
    }

    fn retry_line(&self, outcome: &CloneOutcome) -> String {
        if outcome.status.is_success() {
            format!(
                "{}: {} lines={} popularity={}",
                self.ok("OK"),
                outcome.identifier,
                outcome.line_count,
                outcome.popularity.unwrap_or(0)
            )
        } else {
            format!(
                "{}: {} reason={}",
                self.fail("FAIL"),
                outcome.identifier,
                failure_reason(outcome)
            )
        }
    }
}

impl ProgressReporter for ConsoleReporter {
    #[allow(clippy::print_stdout)]
    fn on_event(&self, event: &PipelineEvent) {
        for line in self.render(event) {
            println!("{line}");
        }
    }
}

fn failure_reason(outcome: &CloneOutcome) -> &str {
    outcome.failure_reason.as_deref().unwrap_or(outcome.status.as_str())
}

fn exception_message(outcome: &CloneOutcome) -> &str {
    let reason = failure_reason(outcome);
    reason.strip_prefix("exception: ").unwrap_or(reason)
}

fn format_seconds(seconds: f64) -> String {
    if seconds.fract() == 0.0 {
        format!("{seconds:.0}s")
    } else {
        format!("{seconds}s")
    }
}

/// Display form of `path` with a trailing separator trimmed.
fn display_dir(path: &Path) -> String {
    let shown = path.display().to_string();
    shown.trim_end_matches('/').to_string()
}
