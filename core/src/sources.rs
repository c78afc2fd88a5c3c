//! Reading the candidate repository list.

use std::io;
use std::path::Path;
use std::path::PathBuf;

use tracing::debug;
use tracing::warn;

use crate::error::CensusErr;
use crate::error::Result;
use crate::repository::RepositoryId;
use crate::repository::RepositoryRecord;

/// Pick the first existing path among `primary` and its fallbacks.
pub fn resolve_source_path(primary: &Path, fallbacks: &[PathBuf]) -> Result<PathBuf> {
    if primary.exists() {
        return Ok(primary.to_path_buf());
    }
    if let Some(found) = fallbacks.iter().find(|candidate| candidate.exists()) {
        debug!(primary = %primary.display(), fallback = %found.display(), "using fallback source");
        return Ok(found.clone());
    }
    Err(CensusErr::SourceNotFound {
        path: primary.to_path_buf(),
    })
}

/// Read up to `max_count` repositories from the CSV at `path`, in file order.
///
/// The identifier is taken from the first of `identifier_columns` present in
/// the header. Rows without an identifier, or with one that is not
/// `owner/name`, are skipped with a warning. Reading stops as soon as
/// `max_count` records have been collected.
pub fn read_repositories(
    path: &Path,
    max_count: usize,
    identifier_columns: &[String],
) -> Result<Vec<RepositoryRecord>> {
    if !path.exists() {
        return Err(CensusErr::SourceNotFound {
            path: path.to_path_buf(),
        });
    }
    let file = std::fs::File::open(path)?;
    read_from(file, max_count, identifier_columns).map_err(|source| CensusErr::csv(path, source))
}

fn read_from<R: io::Read>(
    reader: R,
    max_count: usize,
    identifier_columns: &[String],
) -> std::result::Result<Vec<RepositoryRecord>, csv::Error> {
    let mut records = Vec::new();
    if max_count == 0 {
        return Ok(records);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(index, header)| {
            let header = if index == 0 {
                header.trim_start_matches('\u{feff}')
            } else {
                header
            };
            header.trim().to_string()
        })
        .collect();
    let column = resolve_identifier_column(&headers, identifier_columns);
    if column.is_none() {
        warn!(
            accepted = ?identifier_columns,
            found = ?headers,
            "source has no identifier column"
        );
    }

    for (index, row) in reader.records().enumerate() {
        // Header is line 1.
        let line = index + 2;
        let row = match row {
            Ok(row) => row,
            Err(err) if matches!(err.kind(), csv::ErrorKind::Io(_)) => {
                return Err(err);
            }
            Err(err) => {
                warn!(line, error = %err, "skipping source row: unreadable");
                continue;
            }
        };

        let raw = column
            .and_then(|column| row.get(column))
            .map(str::trim)
            .filter(|value| !value.is_empty());
        let Some(raw) = raw else {
            warn!(line, "skipping source row: missing identifier");
            continue;
        };
        match RepositoryId::parse(raw) {
            Ok(identifier) => records.push(RepositoryRecord { identifier }),
            Err(err) => {
                warn!(line, error = %err, "skipping source row: malformed identifier");
                continue;
            }
        }

        if records.len() >= max_count {
            break;
        }
    }

    Ok(records)
}

fn resolve_identifier_column(headers: &[String], aliases: &[String]) -> Option<usize> {
    aliases
        .iter()
        .find_map(|alias| headers.iter().position(|header| header == alias))
}
