//! HTTP client wrapper.
//!
//! Provides a wrapper around reqwest with:
//! - A shared user agent and default timeout
//! - Per-call deadlines that surface as [`StackError::Timeout`]
//! - Document fetches where 404 is a value, not an error

use crate::config::{AppConfig, NetworkConfig};
use crate::{Result, StackError};
use reqwest::{Client, Response, StatusCode};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// HTTP client used for all release traffic.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    /// Default timeout for requests.
    default_timeout: Duration,
}

impl HttpClient {
    /// Create a new HTTP client with default configuration.
    pub fn new() -> Result<Self> {
        Self::with_timeout(NetworkConfig::REQUEST_TIMEOUT)
    }

    /// Create a new HTTP client with a custom default timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(AppConfig::USER_AGENT)
            .build()
            .map_err(|e| StackError::Network {
                message: format!("Failed to create HTTP client: {}", e),
                source: Some(e),
            })?;

        Ok(Self {
            client,
            default_timeout: timeout,
        })
    }

    /// Make a GET request. The response is returned whatever its status.
    pub async fn get(&self, url: &str) -> Result<Response> {
        self.get_with_headers(url, &[]).await
    }

    /// Make a GET request with custom headers.
    pub async fn get_with_headers(&self, url: &str, headers: &[(&str, &str)]) -> Result<Response> {
        let mut request = self.client.get(url);
        for (key, value) in headers {
            request = request.header(*key, *value);
        }

        request.send().await.map_err(|e| self.transfer_error(url, e))
    }

    /// Fetch a small document.
    ///
    /// Returns `Ok(None)` on 404 and an [`StackError::HttpStatus`] for any
    /// other non-success status. When `timeout` is set, the request and the
    /// body read are both bounded by it and abandoned when it elapses.
    pub async fn fetch_document(
        &self,
        url: &str,
        timeout: Option<Duration>,
    ) -> Result<Option<Vec<u8>>> {
        let fetch = async {
            let response = self.get(url).await?;
            let status = response.status();

            if status == StatusCode::NOT_FOUND {
                debug!("{} returned 404", url);
                return Ok(None);
            }
            if !status.is_success() {
                return Err(status_error(url, status));
            }

            let body = response
                .bytes()
                .await
                .map_err(|e| self.transfer_error(url, e))?;
            Ok(Some(body.to_vec()))
        };

        with_deadline(timeout, fetch).await
    }

    /// Check if an HTTP status code indicates a retryable error.
    pub fn is_retryable_status(status: StatusCode) -> bool {
        matches!(status.as_u16(), 408 | 429 | 500 | 502 | 503 | 504)
    }

    /// Map a transfer failure. Timeouts report the client's configured limit.
    pub(crate) fn transfer_error(&self, url: &str, err: reqwest::Error) -> StackError {
        if err.is_timeout() {
            StackError::Timeout(self.default_timeout)
        } else {
            StackError::Network {
                message: format!("GET {} failed: {}", url, err),
                source: Some(err),
            }
        }
    }
}

/// Build the error for a non-success status.
pub fn status_error(url: &str, status: StatusCode) -> StackError {
    StackError::HttpStatus {
        url: url.to_string(),
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
    }
}

/// Run `fut` under an optional deadline.
///
/// Dropping the future on expiry cancels the in-flight request.
pub async fn with_deadline<T, F>(timeout: Option<Duration>, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| StackError::Timeout(limit))?,
        None => fut.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_status_codes() {
        assert!(HttpClient::is_retryable_status(StatusCode::REQUEST_TIMEOUT));
        assert!(HttpClient::is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(HttpClient::is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(HttpClient::is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));

        assert!(!HttpClient::is_retryable_status(StatusCode::OK));
        assert!(!HttpClient::is_retryable_status(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_status_error_includes_reason() {
        let err = status_error("http://x/y", StatusCode::FORBIDDEN);
        match err {
            StackError::HttpStatus { status, reason, .. } => {
                assert_eq!(status, 403);
                assert_eq!(reason, "Forbidden");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_with_deadline_times_out() {
        let result: Result<()> = with_deadline(Some(Duration::from_millis(10)), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(StackError::Timeout(d)) if d == Duration::from_millis(10)));
    }

    #[tokio::test]
    async fn test_client_timeout_reports_configured_limit() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let client = HttpClient::with_timeout(Duration::from_millis(100)).unwrap();
        let result = client.get(&format!("{}/slow.json", server.uri())).await;
        match result {
            Err(StackError::Timeout(limit)) => assert_eq!(limit, Duration::from_millis(100)),
            other => panic!("expected a timeout, got {:?}", other.map(|r| r.status())),
        }
    }

    #[tokio::test]
    async fn test_with_deadline_passes_through() {
        let result = with_deadline(None, async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
