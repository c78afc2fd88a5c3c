use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::PopularityLookup;
use crate::client::ApiClient;
use crate::client::ApiError;

pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

/// Upper bound for a single popularity request.
pub const LOOKUP_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
enum LookupError {
    #[error("identifier {0:?} is not of the form owner/name")]
    InvalidIdentifier(String),
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Deserialize)]
struct RepositoryResponse {
    #[serde(default)]
    stargazers_count: Option<u64>,
}

/// Star counts from the GitHub REST API.
///
/// Without a credential no request is ever made and every lookup is `0`.
#[derive(Clone)]
pub struct GitHubPopularity {
    client: ApiClient,
    token: Option<String>,
}

impl GitHubPopularity {
    pub fn new(api_base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: ApiClient::new(api_base_url, LOOKUP_TIMEOUT),
            token,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client.set_timeout(timeout);
        self
    }

    async fn try_fetch(&self, token: &str, identifier: &str) -> Result<u64, LookupError> {
        let (owner, name) = identifier
            .split_once('/')
            .filter(|(owner, name)| !owner.is_empty() && !name.is_empty() && !name.contains('/'))
            .ok_or_else(|| LookupError::InvalidIdentifier(identifier.to_string()))?;
        let body: RepositoryResponse = self
            .client
            .get_json(token, &format!("repos/{owner}/{name}"))
            .await?;
        Ok(body.stargazers_count.unwrap_or_default())
    }
}

impl fmt::Debug for GitHubPopularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubPopularity")
            .field("api_base_url", &self.client.base_url())
            .field("has_credential", &self.token.is_some())
            .field("timeout", &self.client.timeout())
            .finish()
    }
}

#[async_trait]
impl PopularityLookup for GitHubPopularity {
    async fn fetch_popularity(&self, identifier: &str) -> u64 {
        let Some(token) = self.token.as_deref() else {
            return 0;
        };
        match self.try_fetch(token, identifier).await {
            Ok(count) => count,
            Err(err) => {
                debug!(repository = identifier, error = %err, "popularity lookup failed");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::Mock;
    use wiremock::MockServer;
    use wiremock::ResponseTemplate;
    use wiremock::matchers::header;
    use wiremock::matchers::method;
    use wiremock::matchers::path;

    fn lookup(server: &MockServer) -> GitHubPopularity {
        GitHubPopularity::new(server.uri(), Some("secret".to_string()))
    }

    #[tokio::test]
    async fn returns_star_count_on_ok() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/grafana/k6"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "stargazers_count": 27000 })),
            )
            .expect(1)
            .mount(&server)
            .await;

        assert_eq!(lookup(&server).fetch_popularity("grafana/k6").await, 27000);
    }

    #[tokio::test]
    async fn missing_field_defaults_to_zero() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/a/b"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 1 })))
            .mount(&server)
            .await;

        assert_eq!(lookup(&server).fetch_popularity("a/b").await, 0);
    }

    #[tokio::test]
    async fn non_ok_status_is_zero() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/a/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert_eq!(lookup(&server).fetch_popularity("a/gone").await, 0);
    }

    #[tokio::test]
    async fn undecodable_body_is_zero() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/a/b"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&server)
            .await;

        assert_eq!(lookup(&server).fetch_popularity("a/b").await, 0);
    }

    #[tokio::test]
    async fn slow_response_times_out_to_zero() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/a/b"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "stargazers_count": 5 }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let lookup = lookup(&server).with_timeout(Duration::from_millis(100));
        assert_eq!(lookup.fetch_popularity("a/b").await, 0);
    }

    #[tokio::test]
    async fn no_credential_makes_no_request() {
        let server = MockServer::start().await;
        let lookup = GitHubPopularity::new(server.uri(), None);

        assert_eq!(lookup.fetch_popularity("a/b").await, 0);
        let requests = server.received_requests().await.unwrap_or_default();
        assert!(requests.is_empty(), "unexpected requests: {requests:?}");
    }

    #[tokio::test]
    async fn malformed_identifier_makes_no_request() {
        let server = MockServer::start().await;

        assert_eq!(lookup(&server).fetch_popularity("no-separator").await, 0);
        assert_eq!(lookup(&server).fetch_popularity("a/b/c").await, 0);
        let requests = server.received_requests().await.unwrap_or_default();
        assert!(requests.is_empty(), "unexpected requests: {requests:?}");
    }

    #[test]
    fn debug_output_hides_token() {
        let lookup = GitHubPopularity::new(DEFAULT_API_BASE_URL, Some("secret".to_string()));
        let rendered = format!("{lookup:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("has_credential: true"));
    }
}
