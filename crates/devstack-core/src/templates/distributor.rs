//! Template distributor.
//!
//! Provides:
//! - Template manifest lookup with `"latest"` resolution and retries
//! - Streaming archive downloads into the cache's staging area
//! - Checksum verification before anything reaches the target directory
//! - Cache maintenance for manifests and archives

use super::types::{InstalledTemplate, TemplateEntry, TemplateManifest};
use crate::archive::{extract_archive, ArchiveFormat};
use crate::cache::CacheStore;
use crate::checksum;
use crate::config::{NetworkConfig, PathsConfig, ReleaseSource};
use crate::manifest::document::{self, FetchOptions, ReleaseDocument};
use crate::network::{retry_async, status_error, HttpClient, ReleaseResolver, RetryPolicy};
use crate::{Result, StackError};
use futures::StreamExt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempPath;
use tracing::{debug, info, warn};

impl ReleaseDocument for TemplateManifest {
    const ASSET: &'static str = NetworkConfig::TEMPLATE_MANIFEST_ASSET;
    const NAMESPACE: &'static str = PathsConfig::TEMPLATE_MANIFESTS_NAMESPACE;

    fn parse(bytes: &[u8]) -> Result<Self> {
        TemplateManifest::from_slice(bytes)
    }

    fn declared_version(&self) -> &str {
        &self.version
    }
}

/// Fetches, verifies, caches and extracts project templates.
#[derive(Clone)]
pub struct TemplateDistributor {
    http: Arc<HttpClient>,
    cache: Arc<dyn CacheStore>,
    resolver: ReleaseResolver,
    retry: RetryPolicy,
}

impl TemplateDistributor {
    /// Create a distributor over a shared client and cache.
    pub fn new(http: Arc<HttpClient>, cache: Arc<dyn CacheStore>, source: ReleaseSource) -> Self {
        let retry = RetryPolicy::new()
            .with_max_attempts(NetworkConfig::MAX_RETRIES)
            .with_base_delay(NetworkConfig::RETRY_BASE_DELAY);
        Self {
            resolver: ReleaseResolver::new(http.clone(), source).with_retry(retry.clone()),
            http,
            cache,
            retry,
        }
    }

    /// Replace the retry policy used for manifests, release lookup and
    /// archive downloads.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.resolver = self.resolver.with_retry(retry.clone());
        self.retry = retry;
        self
    }

    /// Resolve `"latest"` to a concrete version.
    pub async fn resolve_version(&self, version_or_latest: &str) -> Result<String> {
        self.resolver.resolve(version_or_latest).await
    }

    /// Fetch the template manifest, cache first.
    ///
    /// `Ok(None)` when the release publishes no template manifest.
    pub async fn fetch_manifest(&self, version_or_latest: &str) -> Result<Option<TemplateManifest>> {
        self.fetch_manifest_with(version_or_latest, FetchOptions::default())
            .await
    }

    /// Fetch the template manifest with explicit options.
    pub async fn fetch_manifest_with(
        &self,
        version_or_latest: &str,
        options: FetchOptions,
    ) -> Result<Option<TemplateManifest>> {
        let version = self.resolve_version(version_or_latest).await?;
        let source = self.resolver.source();

        let (result, stats) = retry_async(
            &self.retry,
            || {
                document::fetch_document::<TemplateManifest>(
                    &self.http,
                    self.cache.as_ref(),
                    source,
                    &version,
                    &options,
                )
            },
            |e: &StackError| e.is_retryable(),
        )
        .await;

        if stats.attempts > 1 {
            debug!(
                "Template manifest for {} took {} attempts",
                version, stats.attempts
            );
        }
        result
    }

    /// Templates published with a release.
    pub async fn list_templates(&self, version_or_latest: &str) -> Result<Vec<TemplateEntry>> {
        let version = self.resolve_version(version_or_latest).await?;
        match self.fetch_manifest(&version).await? {
            Some(manifest) => Ok(manifest.templates),
            None => Err(StackError::TemplateManifestNotFound { version }),
        }
    }

    /// Verify a file against a `sha256:<hex>` checksum.
    pub fn verify_checksum(&self, path: &Path, expected: &str) -> Result<()> {
        checksum::verify_checksum(path, expected)
    }

    /// Download a template and extract it into `target_dir`.
    ///
    /// `target_dir` is only touched after the archive has been verified.
    pub async fn download(
        &self,
        template_name: &str,
        version_or_latest: &str,
        target_dir: &Path,
    ) -> Result<InstalledTemplate> {
        let version = self.resolve_version(version_or_latest).await?;
        let manifest = self
            .fetch_manifest(&version)
            .await?
            .ok_or_else(|| StackError::TemplateManifestNotFound {
                version: version.clone(),
            })?;

        let entry = manifest
            .find(template_name)
            .ok_or_else(|| StackError::TemplateNotFound {
                name: template_name.to_string(),
                version: version.clone(),
                available: manifest.names(),
            })?;

        let format = ArchiveFormat::from_file_name(&entry.file)?;
        checksum::parse_checksum(&entry.checksum)?;

        let key = archive_key(&entry.name, &version, format);
        let (archive_path, from_cache) = match self.cached_archive(&key, entry)? {
            Some(path) => (path, true),
            None => (self.fetch_archive(entry, &version, &key).await?, false),
        };

        let dest = target_dir.to_path_buf();
        let source = archive_path.clone();
        let entries = tokio::task::spawn_blocking(move || extract_archive(&source, format, &dest))
            .await
            .map_err(|e| StackError::Other(format!("Extraction task failed: {}", e)))??;

        info!(
            "Installed template {} {} into {} ({} entries)",
            entry.name,
            version,
            target_dir.display(),
            entries
        );

        Ok(InstalledTemplate {
            name: entry.name.clone(),
            version,
            archive_path,
            target_dir: target_dir.to_path_buf(),
            from_cache,
        })
    }

    /// Remove cached archives of a template, for one version or all of them.
    pub fn evict_template(&self, name: &str, version: Option<&str>) -> Result<usize> {
        let wanted = version.map(document::checked_version).transpose()?;

        let mut removed = 0;
        for key in self.cache.keys(PathsConfig::TEMPLATES_NAMESPACE)? {
            let Some(cached) = archive_key_version(&key, name) else {
                continue;
            };
            if wanted.as_deref().is_some_and(|v| v != cached) {
                continue;
            }
            if self.cache.invalidate(PathsConfig::TEMPLATES_NAMESPACE, &key)? {
                removed += 1;
            }
        }
        info!("Evicted {} cached archive(s) of template {}", removed, name);
        Ok(removed)
    }

    /// Bytes used by cached template manifests and archives.
    pub fn cache_size(&self) -> Result<u64> {
        Ok(self
            .cache
            .size_bytes(Some(PathsConfig::TEMPLATE_MANIFESTS_NAMESPACE))?
            + self.cache.size_bytes(Some(PathsConfig::TEMPLATES_NAMESPACE))?)
    }

    /// Versions with a cached template manifest, oldest first.
    pub fn list_cached_versions(&self) -> Result<Vec<String>> {
        document::cached_versions(self.cache.as_ref(), PathsConfig::TEMPLATE_MANIFESTS_NAMESPACE)
    }

    /// Remove every cached template manifest and archive.
    pub fn clear_cache(&self) -> Result<usize> {
        let removed = self
            .cache
            .invalidate_namespace(PathsConfig::TEMPLATE_MANIFESTS_NAMESPACE)?
            + self.cache.invalidate_namespace(PathsConfig::TEMPLATES_NAMESPACE)?;
        info!("Cleared {} cached template entries", removed);
        Ok(removed)
    }

    /// A cached archive that still matches its checksum.
    fn cached_archive(&self, key: &str, entry: &TemplateEntry) -> Result<Option<PathBuf>> {
        let path = self.cache.entry_path(PathsConfig::TEMPLATES_NAMESPACE, key);
        if !path.is_file() {
            return Ok(None);
        }

        match checksum::verify_checksum(&path, &entry.checksum) {
            Ok(()) => {
                debug!("Using cached archive {}", path.display());
                Ok(Some(path))
            }
            Err(e) => {
                warn!("Cached archive {} failed verification: {}", key, e);
                self.cache.invalidate(PathsConfig::TEMPLATES_NAMESPACE, key)?;
                Ok(None)
            }
        }
    }

    /// Download, verify and cache an archive.
    async fn fetch_archive(&self, entry: &TemplateEntry, version: &str, key: &str) -> Result<PathBuf> {
        let url = self.resolver.source().asset_url(version, &entry.file);
        let staging = self.cache.staging_dir(PathsConfig::TEMPLATES_NAMESPACE)?;

        info!("Downloading template {} from {}", entry.name, url);
        let (result, _stats) = retry_async(
            &self.retry,
            || self.stream_to_staging(&url, &staging),
            |e: &StackError| e.is_retryable(),
        )
        .await;
        let (temp_path, bytes) = result?;

        if entry.size > 0 && entry.size != bytes {
            debug!(
                "Template {} size differs from manifest: {} != {}",
                entry.name, bytes, entry.size
            );
        }

        // Dropping the temp path on error removes the rejected download.
        checksum::verify_checksum(&temp_path, &entry.checksum)?;

        self.cache
            .import_file(PathsConfig::TEMPLATES_NAMESPACE, key, &temp_path)
    }

    async fn stream_to_staging(&self, url: &str, staging: &Path) -> Result<(TempPath, u64)> {
        let response = self.http.get(url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(url, status));
        }

        let mut file = tempfile::Builder::new()
            .prefix(".template-")
            .suffix(NetworkConfig::DOWNLOAD_TEMP_SUFFIX)
            .tempfile_in(staging)
            .map_err(|e| StackError::Io {
                message: format!("Failed to create temp file: {}", e),
                path: Some(staging.to_path_buf()),
                source: Some(e),
            })?;

        let mut bytes_downloaded: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(|e| self.http.transfer_error(url, e))?;

            file.write_all(&chunk).map_err(|e| StackError::Io {
                message: format!("Failed to write to temp file: {}", e),
                path: Some(file.path().to_path_buf()),
                source: Some(e),
            })?;
            bytes_downloaded += chunk.len() as u64;
        }

        file.flush().map_err(|e| StackError::Io {
            message: format!("Failed to flush temp file: {}", e),
            path: Some(file.path().to_path_buf()),
            source: Some(e),
        })?;

        if bytes_downloaded == 0 {
            return Err(StackError::EmptyResponse {
                url: url.to_string(),
            });
        }

        debug!("Downloaded {} bytes from {}", bytes_downloaded, url);
        Ok((file.into_temp_path(), bytes_downloaded))
    }
}

impl std::fmt::Debug for TemplateDistributor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateDistributor")
            .field("source", self.resolver.source())
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

/// Cache key of an archive: `<name>-<version>.<ext>`.
fn archive_key(name: &str, version: &str, format: ArchiveFormat) -> String {
    format!("{}-{}.{}", name, version, format.extension())
}

/// Version part of an archive key of template `name`, or `None` if the key
/// belongs to another template.
fn archive_key_version<'a>(key: &'a str, name: &str) -> Option<&'a str> {
    let rest = key.strip_prefix(name)?.strip_prefix('-')?;
    [ArchiveFormat::TarGz, ArchiveFormat::TarZst, ArchiveFormat::Zip]
        .iter()
        .find_map(|format| rest.strip_suffix(format.extension())?.strip_suffix('.'))
        .filter(|version| semver::Version::parse(version).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_key() {
        assert_eq!(
            archive_key("react", "0.8.0", ArchiveFormat::TarGz),
            "react-0.8.0.tar.gz"
        );
        assert_eq!(archive_key("vue", "1.0.0", ArchiveFormat::Zip), "vue-1.0.0.zip");
    }

    #[test]
    fn test_archive_key_version_requires_exact_name() {
        assert_eq!(archive_key_version("react-0.8.0.tar.gz", "react"), Some("0.8.0"));
        assert_eq!(archive_key_version("react-1.0.0-rc.1.zip", "react"), Some("1.0.0-rc.1"));
        assert_eq!(archive_key_version("react-native-0.8.0.tar.gz", "react"), None);
        assert_eq!(archive_key_version("reactive-0.8.0.tar.gz", "react"), None);
        assert_eq!(archive_key_version("react-0.8.0.part", "react"), None);
    }
}
