use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

/// Clone repositories from a candidate list and measure their size.
#[derive(Debug, Parser)]
#[command(name = "repo-census", version)]
pub struct Cli {
    /// Read configuration from this file instead of `./census.toml`.
    #[arg(long = "config", short = 'c', value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Specifies color settings for use in the output.
    #[arg(long = "color", value_enum, default_value_t = Color::Auto, global = true)]
    pub color: Color,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Clone a small sample from the source table, one at a time, and write
    /// a results table plus one log per repository.
    Sample(SampleArgs),

    /// Clone a fixed list concurrently and add the successes to the
    /// persisted result set.
    Retry(RetryArgs),
}

#[derive(Debug, Args)]
pub struct SampleArgs {
    /// Maximum number of repositories taken from the source.
    #[arg(long = "sample-size", short = 'n', value_name = "N")]
    pub sample_size: Option<usize>,

    /// Per-clone timeout in seconds.
    #[arg(long = "timeout", value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Source table with an identifier column.
    #[arg(long = "source", value_name = "FILE")]
    pub source: Option<PathBuf>,

    /// Where to write the results table.
    #[arg(long = "results", value_name = "FILE")]
    pub results: Option<PathBuf>,

    /// Directory for per-repository clone logs.
    #[arg(long = "log-dir", value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RetryArgs {
    /// Number of clones running at once.
    #[arg(long = "workers", short = 'j', value_name = "N")]
    pub workers: Option<usize>,

    /// Per-clone timeout in seconds.
    #[arg(long = "timeout", value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Persisted result set to merge into.
    #[arg(long = "processed", value_name = "FILE")]
    pub processed: Option<PathBuf>,

    /// Newline-separated list of `owner/name` identifiers.
    #[arg(long = "list", value_name = "FILE", conflicts_with = "identifiers")]
    pub list: Option<PathBuf>,

    /// Identifiers to retry. Overrides `retry_list` from the config file.
    #[arg(value_name = "IDENTIFIER")]
    pub identifiers: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum Color {
    Always,
    Never,
    #[default]
    Auto,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_retry_identifiers_and_globals() {
        let cli = Cli::parse_from([
            "repo-census",
            "retry",
            "--workers",
            "4",
            "grafana/k6",
            "grafana/xk6",
            "--color",
            "never",
        ]);

        assert_eq!(cli.color, Color::Never);
        let Command::Retry(args) = cli.command else {
            panic!("expected retry");
        };
        assert_eq!(args.workers, Some(4));
        assert_eq!(args.identifiers, vec!["grafana/k6", "grafana/xk6"]);
    }

    #[test]
    fn list_conflicts_with_positional_identifiers() {
        let result = Cli::try_parse_from(["repo-census", "retry", "--list", "f.txt", "a/b"]);
        assert!(result.is_err());
    }

    #[test]
    fn sample_defaults_are_left_to_config() {
        let cli = Cli::parse_from(["repo-census", "sample"]);
        let Command::Sample(args) = cli.command else {
            panic!("expected sample");
        };
        assert_eq!(args.sample_size, None);
        assert_eq!(args.timeout, None);
    }
}
