//! Release-metadata lookup.
//!
//! Resolves the `"latest"` sentinel to a concrete version by asking the
//! release API for the newest published (non-draft, non-prerelease) tag.

use crate::config::ReleaseSource;
use crate::network::client::{status_error, HttpClient};
use crate::network::retry::{retry_async, RetryPolicy};
use crate::version::normalize_version;
use crate::{Result, StackError};
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Subset of the release API payload that the launcher reads.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseInfo {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub prerelease: bool,
}

impl ReleaseInfo {
    /// The release's version without the tag prefix.
    pub fn version(&self) -> String {
        normalize_version(&self.tag_name)
    }
}

/// Looks up release metadata for one release source.
#[derive(Debug, Clone)]
pub struct ReleaseResolver {
    http: Arc<HttpClient>,
    source: ReleaseSource,
    retry: RetryPolicy,
}

impl ReleaseResolver {
    /// Create a resolver for a release source.
    pub fn new(http: Arc<HttpClient>, source: ReleaseSource) -> Self {
        Self {
            http,
            source,
            retry: RetryPolicy::new(),
        }
    }

    /// Replace the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The release source this resolver reads from.
    pub fn source(&self) -> &ReleaseSource {
        &self.source
    }

    /// Fetch the latest published release.
    pub async fn latest_release(&self) -> Result<ReleaseInfo> {
        let url = self.source.latest_release_url();
        debug!("Resolving latest release from {}", url);

        let (result, _stats) = retry_async(
            &self.retry,
            || self.fetch_latest(&url),
            |e: &StackError| e.is_retryable(),
        )
        .await;

        let release = result?;
        info!("Latest release is {}", release.tag_name);
        Ok(release)
    }

    /// Resolve the latest published version (without `v` prefix).
    pub async fn latest_version(&self) -> Result<String> {
        Ok(self.latest_release().await?.version())
    }

    /// Resolve `"latest"` to a concrete version; any other input is
    /// normalized and returned as-is.
    pub async fn resolve(&self, version_or_latest: &str) -> Result<String> {
        if version_or_latest.trim().eq_ignore_ascii_case("latest") {
            self.latest_version().await
        } else {
            Ok(normalize_version(version_or_latest))
        }
    }

    async fn fetch_latest(&self, url: &str) -> Result<ReleaseInfo> {
        let response = self
            .http
            .get_with_headers(url, &[("Accept", "application/vnd.github+json")])
            .await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(StackError::ReleaseNotFound {
                message: format!("no published release for {}", self.source.repo),
            });
        }
        if !status.is_success() {
            return Err(status_error(url, status));
        }

        let release: ReleaseInfo = response.json().await.map_err(|e| {
            StackError::schema("release metadata", format!("Failed to parse release: {}", e))
        })?;

        if normalize_version(&release.tag_name).is_empty() {
            return Err(StackError::schema("release metadata", "empty tag_name"));
        }
        Ok(release)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_version_strips_prefix() {
        let release = ReleaseInfo {
            tag_name: "v0.9.1".into(),
            name: None,
            html_url: None,
            prerelease: false,
        };
        assert_eq!(release.version(), "0.9.1");
    }

    #[tokio::test]
    async fn test_resolve_passes_explicit_versions_through() {
        let resolver = ReleaseResolver::new(
            Arc::new(HttpClient::new().unwrap()),
            ReleaseSource::with_base_url("o/r", "http://127.0.0.1:9"),
        );
        assert_eq!(resolver.resolve("v1.4.0").await.unwrap(), "1.4.0");
    }
}
