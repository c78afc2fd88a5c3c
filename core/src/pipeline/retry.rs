use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use census_popularity::PopularityLookup;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::info;
use tracing::warn;

use crate::clone::CloneOptions;
use crate::clone::CloneOutcome;
use crate::clone::CloneWorker;
use crate::config::Config;
use crate::error::CensusErr;
use crate::error::Result;
use crate::progress::PipelineEvent;
use crate::progress::ProgressReporter;
use crate::repository::RepositoryId;
use crate::result_set::PersistedResultSet;
use crate::result_set::ResultRecord;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryReport {
    /// Every outcome, in completion order.
    pub outcomes: Vec<CloneOutcome>,
    /// Records newly merged into the persisted set.
    pub added: usize,
    /// Outcomes that were not persisted, in completion order.
    pub failures: Vec<CloneOutcome>,
    pub processed_path: PathBuf,
}

pub struct RetryPipeline {
    config: Config,
    worker: Arc<CloneWorker>,
    reporter: Arc<dyn ProgressReporter>,
}

impl RetryPipeline {
    pub fn new(
        config: Config,
        lookup: Arc<dyn PopularityLookup>,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Self {
        let worker = Arc::new(CloneWorker::new(&config, lookup, Arc::clone(&reporter)));
        Self {
            config,
            worker,
            reporter,
        }
    }

    /// Clone every repository in `repositories` with at most `max_workers`
    /// in flight, then merge the successes into the persisted set.
    ///
    /// The persisted set is written only after every clone has finished.
    /// Identifiers already present are left as they are.
    pub async fn run(&self, repositories: Vec<RepositoryId>) -> Result<RetryReport> {
        if repositories.is_empty() {
            return Err(CensusErr::EmptyRetryList);
        }
        let config = &self.config;
        let processed_path = config.processed_path.clone();
        let mut result_set = PersistedResultSet::load(&processed_path)?;

        self.reporter.on_event(&PipelineEvent::RetryStarted {
            repositories: repositories.len(),
            timeout_seconds: config.retry_timeout_seconds,
            workers: config.max_workers,
        });
        info!(
            repositories = repositories.len(),
            workers = config.max_workers,
            already_recorded = result_set.len(),
            "retrying repositories"
        );

        let outcomes = self.dispatch_all(repositories).await;

        let mut added = 0;
        let mut failures = Vec::new();
        for outcome in &outcomes {
            if !outcome.status.is_success() {
                failures.push(outcome.clone());
                continue;
            }
            let identifier = outcome.identifier.to_string();
            let record = ResultRecord {
                url: outcome.identifier.web_url(&config.web_base_url),
                popularity: outcome.popularity.unwrap_or(0),
                line_count: outcome.line_count,
                identifier,
            };
            if result_set.insert(record) {
                added += 1;
            } else {
                info!(repository = %outcome.identifier, "already recorded, keeping existing row");
            }
        }

        result_set.write(&processed_path)?;
        self.reporter.on_event(&PipelineEvent::RetryFinished {
            added,
            processed_path: processed_path.clone(),
            failures: failures.clone(),
        });

        Ok(RetryReport {
            outcomes,
            added,
            failures,
            processed_path,
        })
    }

    async fn dispatch_all(&self, repositories: Vec<RepositoryId>) -> Vec<CloneOutcome> {
        let permits = Arc::new(Semaphore::new(self.config.max_workers.max(1)));
        let options = Arc::new(CloneOptions {
            timeout: self.config.retry_timeout(),
            measure: true,
            enrich: true,
            log_dir: None,
        });

        let mut pending = HashMap::with_capacity(repositories.len());
        let mut join_set = JoinSet::new();
        for (index, identifier) in repositories.into_iter().enumerate() {
            pending.insert(index, identifier.clone());
            let permits = Arc::clone(&permits);
            let worker = Arc::clone(&self.worker);
            let options = Arc::clone(&options);
            let reporter = Arc::clone(&self.reporter);
            join_set.spawn(async move {
                let outcome = match permits.acquire_owned().await {
                    Ok(_permit) => {
                        let outcome = worker.clone_and_measure(&identifier, &options).await;
                        reporter.on_event(&PipelineEvent::CloneFinished(outcome.clone()));
                        outcome
                    }
                    Err(err) => CloneOutcome::exception(&identifier, 0.0, &err.to_string()),
                };
                (index, outcome)
            });
        }

        let mut outcomes = Vec::with_capacity(pending.len());
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, outcome)) => {
                    pending.remove(&index);
                    outcomes.push(outcome);
                }
                Err(err) => warn!(error = %err, "clone task did not complete"),
            }
        }

        // Whatever is still pending belongs to a task that panicked.
        let mut lost: Vec<_> = pending.into_iter().collect();
        lost.sort_by_key(|(index, _)| *index);
        for (_, identifier) in lost {
            let outcome = CloneOutcome::exception(&identifier, 0.0, "clone task panicked");
            self.reporter
                .on_event(&PipelineEvent::CloneFinished(outcome.clone()));
            outcomes.push(outcome);
        }
        outcomes
    }
}
