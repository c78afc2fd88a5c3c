mod client;
mod credential;
mod github;

pub use credential::credential_from_env;
pub use github::DEFAULT_API_BASE_URL;
pub use github::GitHubPopularity;
pub use github::LOOKUP_TIMEOUT;

use async_trait::async_trait;

/// Source of a repository's popularity count.
///
/// Implementations never fail: a lookup that cannot produce an answer
/// returns `0`.
#[async_trait]
pub trait PopularityLookup: Send + Sync {
    /// `identifier` is an `owner/name` pair.
    async fn fetch_popularity(&self, identifier: &str) -> u64;
}
