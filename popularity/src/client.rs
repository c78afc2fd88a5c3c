//! Authenticated JSON reads from the GitHub REST API.

use std::time::Duration;
use std::time::Instant;

use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use reqwest::header::USER_AGENT;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

const GITHUB_JSON: &str = "application/vnd.github+json";
const CENSUS_USER_AGENT: &str = concat!("repo-census/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub(crate) enum ApiError {
    #[error("unexpected status {0}")]
    Status(StatusCode),
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// Every request carries the bearer credential, the GitHub media type and a
/// `repo-census` user agent, and is bounded by `timeout`.
#[derive(Clone, Debug)]
pub(crate) struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl ApiClient {
    pub(crate) fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            timeout,
        }
    }

    pub(crate) fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET `{base_url}/{path}` and decode a `200 OK` body as `T`.
    ///
    /// Any other status is [`ApiError::Status`], even 2xx ones.
    pub(crate) async fn get_json<T>(&self, token: &str, path: &str) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let started = Instant::now();
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .header(ACCEPT, GITHUB_JSON)
            .header(USER_AGENT, CENSUS_USER_AGENT)
            .timeout(self.timeout)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(err) => {
                debug!(
                    %url,
                    elapsed_ms = started.elapsed().as_millis(),
                    error = %err,
                    "GitHub request failed"
                );
                return Err(err.into());
            }
        };
        let status = response.status();
        debug!(
            %url,
            %status,
            elapsed_ms = started.elapsed().as_millis(),
            "GitHub request completed"
        );
        if status != StatusCode::OK {
            return Err(ApiError::Status(status));
        }
        Ok(response.json().await?)
    }
}
