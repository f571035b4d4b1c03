//! Compatibility manifest fetcher.

use super::document::{self, FetchOptions, ReleaseDocument};
use super::types::CompatibilityManifest;
use crate::cache::CacheStore;
use crate::config::{NetworkConfig, PathsConfig, ReleaseSource};
use crate::network::HttpClient;
use crate::Result;
use std::sync::Arc;
use tracing::info;

impl ReleaseDocument for CompatibilityManifest {
    const ASSET: &'static str = NetworkConfig::COMPAT_MANIFEST_ASSET;
    const NAMESPACE: &'static str = PathsConfig::COMPAT_MANIFESTS_NAMESPACE;

    fn parse(bytes: &[u8]) -> Result<Self> {
        CompatibilityManifest::from_slice(bytes)
    }

    fn declared_version(&self) -> &str {
        &self.version
    }
}

/// Fetches and caches per-version compatibility manifests.
#[derive(Clone)]
pub struct ManifestFetcher {
    http: Arc<HttpClient>,
    cache: Arc<dyn CacheStore>,
    source: ReleaseSource,
}

impl ManifestFetcher {
    /// Create a fetcher over a shared client and cache.
    pub fn new(http: Arc<HttpClient>, cache: Arc<dyn CacheStore>, source: ReleaseSource) -> Self {
        Self {
            http,
            cache,
            source,
        }
    }

    /// Fetch the manifest for `version`.
    ///
    /// `Ok(None)` means the release publishes no manifest, which is a normal
    /// outcome for releases without breaking changes.
    pub async fn fetch(
        &self,
        version: &str,
        options: FetchOptions,
    ) -> Result<Option<CompatibilityManifest>> {
        document::fetch_document(
            &self.http,
            self.cache.as_ref(),
            &self.source,
            version,
            &options,
        )
        .await
    }

    /// Versions that have a cached manifest, oldest first.
    pub fn list_cached_versions(&self) -> Result<Vec<String>> {
        document::cached_versions(self.cache.as_ref(), CompatibilityManifest::NAMESPACE)
    }

    /// Remove every cached manifest.
    pub fn clear_cache(&self) -> Result<usize> {
        let removed = self
            .cache
            .invalidate_namespace(CompatibilityManifest::NAMESPACE)?;
        info!("Cleared {} cached compatibility manifests", removed);
        Ok(removed)
    }
}

impl std::fmt::Debug for ManifestFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifestFetcher")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}
