//! The persisted set of successfully measured repositories.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::warn;

use crate::error::CensusErr;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    #[serde(alias = "repo")]
    pub identifier: String,
    pub url: String,
    #[serde(alias = "stars", default, deserialize_with = "zero_when_unparsable")]
    pub popularity: u64,
    #[serde(
        alias = "loc",
        alias = "line_count",
        default,
        deserialize_with = "zero_when_unparsable"
    )]
    pub line_count: u64,
}

/// Blank or non-numeric counts in a hand-edited file read as `0` rather than
/// failing the whole load.
fn zero_when_unparsable<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    csv::invalid_option(deserializer).map(|value: Option<u64>| value.unwrap_or(0))
}

/// Ordered records with unique identifiers.
///
/// Insertion order is preserved on write. Inserting an identifier that is
/// already present leaves the existing record untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedResultSet {
    records: Vec<ResultRecord>,
    identifiers: HashSet<String>,
}

impl PersistedResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the set stored at `path`. A missing file is an empty set.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no persisted results yet");
            return Ok(Self::new());
        }
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|source| CensusErr::csv(path, source))?;

        let mut set = Self::new();
        for row in reader.deserialize::<ResultRecord>() {
            let record = row.map_err(|source| CensusErr::csv(path, source))?;
            let identifier = record.identifier.clone();
            if !set.insert(record) {
                warn!(
                    path = %path.display(),
                    identifier,
                    "dropping duplicate persisted result"
                );
            }
        }
        debug!(path = %path.display(), records = set.len(), "loaded persisted results");
        Ok(set)
    }

    /// Returns `true` when the record was added.
    pub fn insert(&mut self, record: ResultRecord) -> bool {
        if !self.identifiers.insert(record.identifier.clone()) {
            return false;
        }
        self.records.push(record);
        true
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.identifiers.contains(identifier)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ResultRecord] {
        &self.records
    }

    /// Replace the file at `path` with the full set.
    ///
    /// The rows go to a sibling temporary file first, which is then renamed
    /// over `path`, so a failed write leaves the previous contents intact.
    pub fn write(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)?;

        let staging = tempfile::NamedTempFile::new_in(parent)?;
        let mut writer = csv::Writer::from_writer(staging.as_file());
        if self.records.is_empty() {
            writer
                .write_record(["identifier", "url", "popularity", "lineCount"])
                .map_err(|source| CensusErr::csv(path, source))?;
        }
        for record in &self.records {
            writer
                .serialize(record)
                .map_err(|source| CensusErr::csv(path, source))?;
        }
        writer.flush()?;
        drop(writer);

        staging
            .persist(path)
            .map_err(|err| CensusErr::Io(err.error))?;
        Ok(())
    }
}
