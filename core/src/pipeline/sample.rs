use std::path::PathBuf;
use std::sync::Arc;

use census_popularity::PopularityLookup;
use tracing::info;

use crate::clone::CloneOptions;
use crate::clone::CloneOutcome;
use crate::clone::CloneWorker;
use crate::config::Config;
use crate::error::Result;
use crate::progress::PipelineEvent;
use crate::progress::ProgressReporter;
use crate::sample_results::write_sample_results;
use crate::sources::read_repositories;
use crate::sources::resolve_source_path;

#[derive(Debug, Clone, PartialEq)]
pub struct SampleReport {
    /// One outcome per sampled repository, in source order.
    pub outcomes: Vec<CloneOutcome>,
    pub source_path: PathBuf,
    pub result_path: PathBuf,
    pub log_dir: PathBuf,
}

pub struct SamplePipeline {
    config: Config,
    worker: CloneWorker,
    reporter: Arc<dyn ProgressReporter>,
}

impl SamplePipeline {
    pub fn new(
        config: Config,
        lookup: Arc<dyn PopularityLookup>,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Self {
        let worker = CloneWorker::new(&config, lookup, Arc::clone(&reporter));
        Self {
            config,
            worker,
            reporter,
        }
    }

    /// Clone and measure up to `sample_size` repositories, one at a time.
    ///
    /// Fails only when the source cannot be found or read, or the results
    /// table cannot be written. Per-repository failures are outcomes.
    pub async fn run(&self) -> Result<SampleReport> {
        let config = &self.config;
        let source_path = resolve_source_path(&config.source_path, &config.source_fallback_paths)?;
        self.reporter.on_event(&PipelineEvent::SampleStarted {
            source_path: source_path.clone(),
            sample_size: config.sample_size,
        });
        let records =
            read_repositories(&source_path, config.sample_size, &config.identifier_columns)?;
        info!(
            source = %source_path.display(),
            repositories = records.len(),
            "sampling repositories"
        );

        tokio::fs::create_dir_all(&config.log_dir).await?;
        let options = CloneOptions {
            timeout: config.clone_timeout(),
            measure: true,
            enrich: false,
            log_dir: Some(config.log_dir.clone()),
        };

        let mut outcomes = Vec::with_capacity(records.len());
        for record in &records {
            let outcome = self
                .worker
                .clone_and_measure(&record.identifier, &options)
                .await;
            self.reporter
                .on_event(&PipelineEvent::CloneFinished(outcome.clone()));
            outcomes.push(outcome);
        }

        write_sample_results(&config.result_path, &outcomes)?;
        self.reporter.on_event(&PipelineEvent::SampleFinished {
            result_path: config.result_path.clone(),
            log_dir: config.log_dir.clone(),
        });

        Ok(SampleReport {
            outcomes,
            source_path,
            result_path: config.result_path.clone(),
            log_dir: config.log_dir.clone(),
        })
    }
}
