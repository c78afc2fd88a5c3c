//! Run configuration.
//!
//! Values are layered: built-in defaults, then an optional `census.toml`,
//! then command-line overrides. The resolved [`Config`] is handed to the
//! pipeline drivers at construction; nothing reads global state after that.

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::CensusErr;
use crate::error::Result;

/// Config file looked up in the working directory when none is given.
pub const CONFIG_FILE_NAME: &str = "census.toml";

pub const DEFAULT_SAMPLE_SIZE: usize = 3;
pub const DEFAULT_CLONE_TIMEOUT_SECONDS: u64 = 5 * 60;
pub const DEFAULT_RETRY_TIMEOUT_SECONDS: u64 = 10 * 60;
pub const DEFAULT_MAX_WORKERS: usize = 2;
pub const DEFAULT_FAILURE_REASON_MAX_BYTES: usize = 400;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Upper bound on repositories taken from the source by the sampling run.
    pub sample_size: usize,
    /// Wall-clock budget for one clone in the sampling run.
    pub clone_timeout_seconds: u64,
    /// Wall-clock budget for one clone in the retry run.
    pub retry_timeout_seconds: u64,
    /// Concurrent clones in the retry run. Always at least one.
    pub max_workers: usize,
    pub source_path: PathBuf,
    /// Tried in order when `source_path` does not exist.
    pub source_fallback_paths: Vec<PathBuf>,
    /// Output table of the sampling run. Overwritten on every run.
    pub result_path: PathBuf,
    /// Persisted result set of the retry run.
    pub processed_path: PathBuf,
    pub log_dir: PathBuf,
    /// Accepted names for the identifier column, most preferred first.
    pub identifier_columns: Vec<String>,
    /// Program and leading arguments; the URL and destination are appended.
    pub clone_command: Vec<String>,
    pub ssh_host: String,
    pub web_base_url: String,
    pub api_base_url: String,
    pub retry_list: Vec<String>,
    pub failure_reason_max_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_size: DEFAULT_SAMPLE_SIZE,
            clone_timeout_seconds: DEFAULT_CLONE_TIMEOUT_SECONDS,
            retry_timeout_seconds: DEFAULT_RETRY_TIMEOUT_SECONDS,
            max_workers: DEFAULT_MAX_WORKERS,
            source_path: PathBuf::from("repositorios_k6.csv"),
            source_fallback_paths: vec![PathBuf::from("scripts/repositorios_k6.csv")],
            result_path: PathBuf::from("clone_test_results.csv"),
            processed_path: PathBuf::from("scripts/processed_k6_repos.csv"),
            log_dir: PathBuf::from("clone_logs"),
            identifier_columns: vec!["repositório".to_string(), "repository".to_string()],
            clone_command: ["git", "clone", "--depth", "1"]
                .into_iter()
                .map(String::from)
                .collect(),
            ssh_host: "git@github.com".to_string(),
            web_base_url: "https://github.com".to_string(),
            api_base_url: census_popularity::DEFAULT_API_BASE_URL.to_string(),
            retry_list: Vec::new(),
            failure_reason_max_bytes: DEFAULT_FAILURE_REASON_MAX_BYTES,
        }
    }
}

/// Contents of `census.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigToml {
    pub sample_size: Option<usize>,
    pub clone_timeout_seconds: Option<u64>,
    pub retry_timeout_seconds: Option<u64>,
    pub max_workers: Option<usize>,
    pub source_path: Option<PathBuf>,
    pub source_fallback_paths: Option<Vec<PathBuf>>,
    pub result_path: Option<PathBuf>,
    pub processed_path: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub identifier_columns: Option<Vec<String>>,
    pub clone_command: Option<Vec<String>>,
    pub ssh_host: Option<String>,
    pub web_base_url: Option<String>,
    pub api_base_url: Option<String>,
    pub retry_list: Option<Vec<String>>,
    pub failure_reason_max_bytes: Option<usize>,
}

/// Values supplied on the command line. These win over the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub sample_size: Option<usize>,
    pub clone_timeout_seconds: Option<u64>,
    pub retry_timeout_seconds: Option<u64>,
    pub max_workers: Option<usize>,
    pub source_path: Option<PathBuf>,
    pub result_path: Option<PathBuf>,
    pub processed_path: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub retry_list: Option<Vec<String>>,
}

impl Config {
    /// Resolve the configuration.
    ///
    /// An explicit `config_path` must exist. Without one, [`CONFIG_FILE_NAME`]
    /// in the working directory is used when present.
    pub fn load(config_path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self> {
        let toml = match config_path {
            Some(path) => load_config_toml(path)?,
            None => {
                let default_path = Path::new(CONFIG_FILE_NAME);
                if default_path.exists() {
                    load_config_toml(default_path)?
                } else {
                    ConfigToml::default()
                }
            }
        };
        Ok(Self::from_layers(toml, overrides))
    }

    pub fn from_layers(toml: ConfigToml, overrides: ConfigOverrides) -> Self {
        let defaults = Self::default();
        let max_workers = overrides
            .max_workers
            .or(toml.max_workers)
            .unwrap_or(defaults.max_workers)
            .max(1);
        let clone_command = toml
            .clone_command
            .filter(|command| !command.is_empty())
            .unwrap_or(defaults.clone_command);

        Self {
            sample_size: overrides
                .sample_size
                .or(toml.sample_size)
                .unwrap_or(defaults.sample_size),
            clone_timeout_seconds: overrides
                .clone_timeout_seconds
                .or(toml.clone_timeout_seconds)
                .unwrap_or(defaults.clone_timeout_seconds),
            retry_timeout_seconds: overrides
                .retry_timeout_seconds
                .or(toml.retry_timeout_seconds)
                .unwrap_or(defaults.retry_timeout_seconds),
            max_workers,
            source_path: overrides
                .source_path
                .or(toml.source_path)
                .unwrap_or(defaults.source_path),
            source_fallback_paths: toml
                .source_fallback_paths
                .unwrap_or(defaults.source_fallback_paths),
            result_path: overrides
                .result_path
                .or(toml.result_path)
                .unwrap_or(defaults.result_path),
            processed_path: overrides
                .processed_path
                .or(toml.processed_path)
                .unwrap_or(defaults.processed_path),
            log_dir: overrides
                .log_dir
                .or(toml.log_dir)
                .unwrap_or(defaults.log_dir),
            identifier_columns: toml
                .identifier_columns
                .filter(|columns| !columns.is_empty())
                .unwrap_or(defaults.identifier_columns),
            clone_command,
            ssh_host: toml.ssh_host.unwrap_or(defaults.ssh_host),
            web_base_url: toml.web_base_url.unwrap_or(defaults.web_base_url),
            api_base_url: toml.api_base_url.unwrap_or(defaults.api_base_url),
            retry_list: overrides
                .retry_list
                .or(toml.retry_list)
                .unwrap_or(defaults.retry_list),
            failure_reason_max_bytes: toml
                .failure_reason_max_bytes
                .unwrap_or(defaults.failure_reason_max_bytes),
        }
    }

    pub fn clone_timeout(&self) -> Duration {
        Duration::from_secs(self.clone_timeout_seconds)
    }

    pub fn retry_timeout(&self) -> Duration {
        Duration::from_secs(self.retry_timeout_seconds)
    }
}

fn load_config_toml(path: &Path) -> Result<ConfigToml> {
    let contents = std::fs::read_to_string(path)?;
    toml::from_str(&contents).map_err(|source| CensusErr::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}
