use std::path::Path;

use anyhow::Context;
use census_core::RepositoryId;

/// Identifiers from a list file: one per line, blank lines and `#` comments
/// ignored.
pub fn read_list_file(path: &Path) -> anyhow::Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read retry list {}", path.display()))?;
    Ok(parse_list(&contents))
}

fn parse_list(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(|line| line.split_once('#').map_or(line, |(before, _)| before))
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Parse every entry, failing on the first malformed one.
pub fn parse_identifiers(raw: &[String]) -> anyhow::Result<Vec<RepositoryId>> {
    raw.iter()
        .map(|entry| RepositoryId::parse(entry).map_err(anyhow::Error::from))
        .collect()
}
