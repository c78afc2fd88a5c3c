use std::fmt;
use std::str::FromStr;

use crate::error::CensusErr;

/// An `owner/name` pair naming a repository on its hosting service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepositoryId {
    owner: String,
    name: String,
}

impl RepositoryId {
    /// Parse `owner/name`, trimming surrounding whitespace.
    ///
    /// Exactly one `/` is accepted and neither half may be empty.
    pub fn parse(raw: &str) -> Result<Self, CensusErr> {
        let trimmed = raw.trim();
        let invalid = || CensusErr::InvalidIdentifier(raw.to_string());
        let (owner, name) = trimmed.split_once('/').ok_or_else(invalid)?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(invalid());
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(invalid());
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// SSH remote of the form `host:owner/name.git`.
    pub fn ssh_url(&self, ssh_host: &str) -> String {
        format!("{ssh_host}:{}/{}.git", self.owner, self.name)
    }

    /// Browser URL of the form `base/owner/name`.
    pub fn web_url(&self, web_base_url: &str) -> String {
        let base = web_base_url.trim_end_matches('/');
        format!("{base}/{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepositoryId {
    type Err = CensusErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// One row of the candidate source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRecord {
    pub identifier: RepositoryId,
}
