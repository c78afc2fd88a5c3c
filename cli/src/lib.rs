mod cli;
mod console;
mod retry_list;

use std::sync::Arc;

use anyhow::Context;
use census_core::Config;
use census_core::ConfigOverrides;
use census_core::RetryPipeline;
use census_core::SamplePipeline;
use census_popularity::GitHubPopularity;
use census_popularity::PopularityLookup;
use census_popularity::credential_from_env;
use supports_color::Stream;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

pub use cli::Cli;
pub use cli::Color;
pub use cli::Command;
pub use cli::RetryArgs;
pub use cli::SampleArgs;
pub use console::ConsoleReporter;
pub use console::RunKind;

/// Default filter when `RUST_LOG` is unset. Diagnostics go to stderr; stdout
/// carries only progress lines.
const DEFAULT_LOG_LEVEL: &str = "warn";

pub async fn run_main(cli: Cli) -> anyhow::Result<()> {
    let Cli {
        config: config_path,
        color,
        command,
    } = cli;

    let (stdout_with_ansi, stderr_with_ansi) = match color {
        Color::Always => (true, true),
        Color::Never => (false, false),
        Color::Auto => (
            supports_color::on_cached(Stream::Stdout).is_some(),
            supports_color::on_cached(Stream::Stderr).is_some(),
        ),
    };
    init_tracing(stderr_with_ansi);

    let overrides = match &command {
        Command::Sample(args) => sample_overrides(args),
        Command::Retry(args) => retry_overrides(args)?,
    };
    let config = Config::load(config_path.as_deref(), overrides)?;
    debug!(?config, "resolved configuration");

    let lookup: Arc<dyn PopularityLookup> = Arc::new(GitHubPopularity::new(
        config.api_base_url.clone(),
        credential_from_env(),
    ));

    match command {
        Command::Sample(_) => {
            let reporter = Arc::new(ConsoleReporter::new(RunKind::Sample, stdout_with_ansi));
            SamplePipeline::new(config, lookup, reporter).run().await?;
        }
        Command::Retry(_) => {
            let repositories = retry_list::parse_identifiers(&config.retry_list)?;
            let reporter = Arc::new(ConsoleReporter::new(RunKind::Retry, stdout_with_ansi));
            RetryPipeline::new(config, lookup, reporter)
                .run(repositories)
                .await?;
        }
    }
    Ok(())
}

fn init_tracing(with_ansi: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_LEVEL))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_ansi(with_ansi)
        .with_writer(std::io::stderr)
        .with_filter(env_filter);

    let _ = tracing_subscriber::registry().with(fmt_layer).try_init();
}

fn sample_overrides(args: &SampleArgs) -> ConfigOverrides {
    ConfigOverrides {
        sample_size: args.sample_size,
        clone_timeout_seconds: args.timeout,
        source_path: args.source.clone(),
        result_path: args.results.clone(),
        log_dir: args.log_dir.clone(),
        ..Default::default()
    }
}

fn retry_overrides(args: &RetryArgs) -> anyhow::Result<ConfigOverrides> {
    let retry_list = if !args.identifiers.is_empty() {
        Some(args.identifiers.clone())
    } else if let Some(path) = &args.list {
        Some(retry_list::read_list_file(path).context("while resolving repositories to retry")?)
    } else {
        None
    };
    Ok(ConfigOverrides {
        retry_timeout_seconds: args.timeout,
        max_workers: args.workers,
        processed_path: args.processed.clone(),
        retry_list,
        ..Default::default()
    })
}
