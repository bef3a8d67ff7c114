//! The HTTP request client.
//!
//! Every call is a single JSON-body `POST` with bearer authentication. A call
//! succeeds with the raw response body on `2xx` and fails with a typed
//! [`ApiError`] otherwise.

use std::future::Future;
use std::time::Duration;

use relay::{ApiError, ApiResponse, RetryPolicy};
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Serialize;
use thiserror::Error;

/// Base URL of the public GitHub REST API.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Media type GitHub expects in `Accept`.
pub const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";

/// REST API version sent in `X-GitHub-Api-Version`.
pub const API_VERSION: &str = "2022-11-28";

const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";

/// Transport settings for [`GithubClient`].
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// API base URL, without a trailing path. GitHub Enterprise Server uses
    /// `https://<host>/api/v3`.
    pub api_url: String,
    /// Value of the `User-Agent` header. GitHub rejects requests without one.
    pub user_agent: String,
    /// Deadline for a whole request, including reading the body.
    pub request_timeout: Duration,
    /// Deadline for establishing the connection.
    pub connect_timeout: Duration,
    /// How many times a request is resent after a connection failure.
    pub transport_retries: u32,
    /// Fixed delay between those attempts.
    pub retry_delay: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            user_agent: concat!("workflow-relay/", env!("CARGO_PKG_VERSION")).to_owned(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            transport_retries: 2,
            retry_delay: Duration::from_secs(2),
        }
    }
}

/// Errors constructing a [`GithubClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The API URL is not an `http(s)://` URL.
    #[error("invalid API URL '{url}': expected an http:// or https:// URL")]
    InvalidApiUrl {
        /// The rejected URL.
        url: String,
    },

    /// The underlying HTTP client could not be initialised (e.g. TLS backend).
    #[error("failed to build HTTP client")]
    Build(#[source] reqwest::Error),
}

/// GitHub REST API client.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    settings: ClientSettings,
}

impl GithubClient {
    pub fn new(settings: ClientSettings) -> Result<Self, ClientError> {
        if !(settings.api_url.starts_with("https://") || settings.api_url.starts_with("http://")) {
            return Err(ClientError::InvalidApiUrl {
                url: settings.api_url,
            });
        }

        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(ClientError::Build)?;

        Ok(Self { http, settings })
    }

    /// Sends `body` as JSON to `path`, resending only after failures that
    /// happened before the request left this process.
    pub(crate) async fn post_json<B>(
        &self,
        path: &str,
        token: &str,
        body: &B,
    ) -> Result<ApiResponse, ApiError>
    where
        B: Serialize + ?Sized + Sync,
    {
        retry_transport_failures(
            self.settings.transport_retries,
            self.settings.retry_delay,
            || self.post_json_once(path, token, body),
        )
        .await
    }

    async fn post_json_once<B>(
        &self,
        path: &str,
        token: &str,
        body: &B,
    ) -> Result<ApiResponse, ApiError>
    where
        B: Serialize + ?Sized + Sync,
    {
        let url = format!("{}{}", self.settings.api_url.trim_end_matches('/'), path);
        tracing::debug!(%url, "POST");

        let response = self
            .http
            .post(&url)
            .header(USER_AGENT, &self.settings.user_agent)
            .header(ACCEPT, GITHUB_MEDIA_TYPE)
            .header(API_VERSION_HEADER, API_VERSION)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, %url, "request failed");
                transport_error(e)
            })?;

        let status = response.status();
        tracing::info!(status = status.as_u16(), "received status code");

        if !status.is_success() {
            // Best effort; the status is reported either way.
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = status.as_u16(),
                %body,
                "bad status code, expected 2xx"
            );
            return Err(ApiError::Protocol {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await.map_err(|e| {
            tracing::error!(error = %e, "failed to read response body");
            transport_error(e)
        })?;

        let response = ApiResponse {
            status: status.as_u16(),
            body: body.to_vec(),
        };
        if !response.body.is_empty() {
            match response.json() {
                Some(data) => tracing::info!(%data, "received data"),
                None => tracing::debug!(
                    bytes = response.body.len(),
                    "received non-JSON response body"
                ),
            }
        }
        Ok(response)
    }
}

/// Runs `attempt` once, then again up to `retries` more times while it fails
/// with a retryable error, sleeping `delay` between tries.
async fn retry_transport_failures<F, Fut>(
    retries: u32,
    delay: Duration,
    mut attempt: F,
) -> Result<ApiResponse, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<ApiResponse, ApiError>>,
{
    let mut retried = 0;
    loop {
        match attempt().await {
            Err(err) if retried < retries && err.retry_policy() == RetryPolicy::Retryable => {
                retried += 1;
                tracing::warn!(
                    attempt = retried,
                    max = retries,
                    error = %err,
                    "connection failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            result => return result,
        }
    }
}

/// Connection failures never reached the server and are safe to resend.
fn transport_error(err: reqwest::Error) -> ApiError {
    let retryable = err.is_connect();
    ApiError::Transport {
        source: Box::new(err),
        retryable,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn refused() -> ApiError {
        ApiError::Transport {
            source: "connection refused".into(),
            retryable: true,
        }
    }

    /// Runs the retry loop over an attempt that fails `failures` times with
    /// `error` and then succeeds. Returns the outcome and the attempt count.
    async fn run_attempts(
        retries: u32,
        failures: u32,
        error: fn() -> ApiError,
    ) -> (Result<ApiResponse, ApiError>, u32) {
        let calls = AtomicU32::new(0);
        let result = retry_transport_failures(retries, Duration::ZERO, || {
            let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if call <= failures {
                    Err(error())
                } else {
                    Ok(ApiResponse {
                        status: 204,
                        body: Vec::new(),
                    })
                }
            }
        })
        .await;
        (result, calls.load(Ordering::SeqCst))
    }

    #[test]
    fn default_settings_target_the_public_api() {
        let settings = ClientSettings::default();

        assert_eq!(settings.api_url, "https://api.github.com");
        assert!(settings.user_agent.starts_with("workflow-relay/"));
        assert!(settings.request_timeout > Duration::ZERO);
    }

    #[test]
    fn rejects_api_urls_without_a_scheme() {
        let err = GithubClient::new(ClientSettings {
            api_url: "api.github.com".to_owned(),
            ..ClientSettings::default()
        })
        .unwrap_err();

        assert!(matches!(err, ClientError::InvalidApiUrl { .. }));
    }

    #[tokio::test]
    async fn connection_failures_are_attempted_retries_plus_one_times() {
        let (result, calls) = run_attempts(2, u32::MAX, refused).await;

        assert!(matches!(result, Err(ApiError::Transport { .. })));
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn zero_retries_means_a_single_attempt() {
        let (result, calls) = run_attempts(0, u32::MAX, refused).await;

        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn a_later_attempt_can_succeed() {
        let (result, calls) = run_attempts(2, 1, refused).await;

        assert_eq!(result.unwrap().status, 204);
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn non_retryable_failures_are_not_resent() {
        let timeout = || ApiError::Transport {
            source: "timed out".into(),
            retryable: false,
        };
        let not_found = || ApiError::Protocol {
            status: 404,
            body: String::new(),
        };

        for error in [timeout as fn() -> ApiError, not_found] {
            let (result, calls) = run_attempts(2, u32::MAX, error).await;
            assert!(result.is_err());
            assert_eq!(calls, 1);
        }
    }
}
