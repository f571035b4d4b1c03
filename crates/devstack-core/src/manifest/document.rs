//! Cache-first retrieval of per-release JSON documents.
//!
//! Both the compatibility manifest and the template manifest are published
//! as release assets and cached under `<namespace>/<version>.json`. A cached
//! copy that no longer parses is purged and fetched again.

use crate::cache::CacheStore;
use crate::config::{NetworkConfig, ReleaseSource};
use crate::network::HttpClient;
use crate::version::{normalize_version, sort_versions};
use crate::{Result, StackError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// A JSON document published once per release.
pub trait ReleaseDocument: Sized {
    /// Release asset file name.
    const ASSET: &'static str;
    /// Cache namespace the document is stored under.
    const NAMESPACE: &'static str;

    /// Parse and validate raw bytes.
    fn parse(bytes: &[u8]) -> Result<Self>;

    /// Version the document declares about itself.
    fn declared_version(&self) -> &str;
}

/// Options for a single fetch.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Skip the cache read and always hit the network.
    pub force_refresh: bool,
    /// Abort the request when it takes longer than this.
    pub timeout: Option<Duration>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            force_refresh: false,
            timeout: Some(NetworkConfig::MANIFEST_FETCH_TIMEOUT),
        }
    }
}

impl FetchOptions {
    /// Default options with the cache bypassed.
    pub fn refresh() -> Self {
        Self {
            force_refresh: true,
            ..Self::default()
        }
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

pub(crate) fn cache_key(version: &str) -> String {
    format!("{}.json", version)
}

pub(crate) fn checked_version(version: &str) -> Result<String> {
    let normalized = normalize_version(version);
    if normalized.is_empty() || normalized.contains(['/', '\\']) {
        return Err(StackError::InvalidVersion {
            version: version.to_string(),
        });
    }
    Ok(normalized)
}

/// Read a document from cache, purging it if it is corrupt.
pub(crate) fn read_cached<D: ReleaseDocument>(
    cache: &dyn CacheStore,
    version: &str,
) -> Result<Option<D>> {
    let key = cache_key(version);
    let Some(bytes) = cache.read(D::NAMESPACE, &key)? else {
        return Ok(None);
    };

    match D::parse(&bytes) {
        Ok(document) => {
            debug!("Cache hit for {}/{}", D::NAMESPACE, key);
            Ok(Some(document))
        }
        Err(e) => {
            warn!(
                "Discarding corrupt cache entry {}/{}: {}",
                D::NAMESPACE,
                key,
                e
            );
            cache.invalidate(D::NAMESPACE, &key)?;
            Ok(None)
        }
    }
}

/// Fetch a document, consulting the cache first unless told otherwise.
///
/// Returns `Ok(None)` when the release has no such asset.
pub(crate) async fn fetch_document<D: ReleaseDocument>(
    http: &HttpClient,
    cache: &dyn CacheStore,
    source: &ReleaseSource,
    version: &str,
    options: &FetchOptions,
) -> Result<Option<D>> {
    let version = checked_version(version)?;

    if !options.force_refresh {
        if let Some(document) = read_cached::<D>(cache, &version)? {
            return Ok(Some(document));
        }
    }

    let url = source.asset_url(&version, D::ASSET);
    debug!("Fetching {}", url);

    let Some(bytes) = http.fetch_document(&url, options.timeout).await? else {
        info!("No {} published for {}", D::ASSET, version);
        return Ok(None);
    };

    let document = D::parse(&bytes)?;
    if normalize_version(document.declared_version()) != version {
        warn!(
            "{} for {} declares version {}",
            D::ASSET,
            version,
            document.declared_version()
        );
    }

    cache.write(D::NAMESPACE, &cache_key(&version), &bytes)?;
    Ok(Some(document))
}

/// Versions with a cached document, in semantic-version order.
pub(crate) fn cached_versions(cache: &dyn CacheStore, namespace: &str) -> Result<Vec<String>> {
    let mut versions: Vec<String> = cache
        .keys(namespace)?
        .into_iter()
        .filter_map(|key| key.strip_suffix(".json").map(str::to_string))
        .collect();
    sort_versions(&mut versions);
    Ok(versions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_version() {
        assert_eq!(checked_version("v0.8.0").unwrap(), "0.8.0");
        assert!(checked_version(" ").is_err());
        assert!(checked_version("../etc").is_err());
    }

    #[test]
    fn test_fetch_options_defaults() {
        let options = FetchOptions::default();
        assert!(!options.force_refresh);
        assert_eq!(options.timeout, Some(NetworkConfig::MANIFEST_FETCH_TIMEOUT));
        assert!(FetchOptions::refresh().force_refresh);
    }
}
