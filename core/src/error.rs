use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CensusErr>;

/// Errors that abort a whole run.
///
/// Per-repository failures are never reported through this type; they are
/// recorded as a [`crate::CloneStatus`] on the repository's outcome.
#[derive(Debug, Error)]
pub enum CensusErr {
    /// The candidate list is mandatory.
    #[error("repository source not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid repository identifier {0:?}: expected owner/name")]
    InvalidIdentifier(String),

    #[error("no repositories to retry")]
    EmptyRetryList,

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl CensusErr {
    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}
