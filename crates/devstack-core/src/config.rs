//! Centralized configuration for devstack.
//!
//! Constants for network operations, on-disk layout and upgrade timing, plus
//! the runtime [`LauncherSettings`] resolved from defaults and the
//! environment.

use crate::error::{Result, StackError};
use std::path::PathBuf;
use std::time::Duration;

/// Application-level configuration.
pub struct AppConfig;

impl AppConfig {
    pub const APP_NAME: &'static str = "devstack";
    pub const GITHUB_REPO: &'static str = "devstack-org/devstack";
    pub const USER_AGENT: &'static str = concat!("devstack/", env!("CARGO_PKG_VERSION"));
}

/// Network-related configuration.
pub struct NetworkConfig;

impl NetworkConfig {
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    pub const MANIFEST_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
    pub const MAX_RETRIES: u32 = 3;
    pub const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);
    pub const DOWNLOAD_TEMP_SUFFIX: &'static str = ".part";
    pub const GITHUB_API_BASE: &'static str = "https://api.github.com";
    pub const GITHUB_DOWNLOAD_BASE: &'static str = "https://github.com";
    pub const COMPAT_MANIFEST_ASSET: &'static str = "compatibility-manifest.json";
    pub const TEMPLATE_MANIFEST_ASSET: &'static str = "templates-manifest.json";
    pub const LATEST: &'static str = "latest";
}

/// On-disk layout of the cache root and of a scaffolded project.
pub struct PathsConfig;

impl PathsConfig {
    pub const CACHE_DIR_NAME: &'static str = "devstack";
    pub const COMPAT_MANIFESTS_NAMESPACE: &'static str = "compat-manifests";
    pub const TEMPLATE_MANIFESTS_NAMESPACE: &'static str = "template-manifests";
    pub const TEMPLATES_NAMESPACE: &'static str = "templates";

    pub const ENV_FILE: &'static str = ".env";
    pub const COMPOSE_FILE: &'static str = "docker-compose.yml";
    pub const MODE_MARKER_FILE: &'static str = ".devstack-mode";
    pub const FRONTEND_DIR: &'static str = "frontend";
    pub const FRONTEND_MANIFEST: &'static str = "package.json";
    pub const FRONTEND_DEPENDENCY_DIR: &'static str = "node_modules";
}

/// Project conventions shared by the detector and the upgrade strategies.
pub struct ProjectConfig;

impl ProjectConfig {
    /// `.env` key holding the backend version marker.
    pub const VERSION_ENV_KEY: &'static str = "DEVSTACK_VERSION";
    /// Compose service name of the frontend.
    pub const FRONTEND_SERVICE: &'static str = "web";
    /// Package pinned in the frontend manifest.
    pub const CLIENT_PACKAGE: &'static str = "@devstack/client";
}

/// Upgrade timing.
pub struct UpgradeConfig;

impl UpgradeConfig {
    pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(180);
    pub const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(2);
}

/// Where release assets and release metadata are fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseSource {
    /// `owner/name` of the release repository.
    pub repo: String,
    /// Base URL of the release-metadata API.
    pub api_base: String,
    /// Base URL that release assets are downloaded from.
    pub download_base: String,
}

impl Default for ReleaseSource {
    fn default() -> Self {
        Self {
            repo: AppConfig::GITHUB_REPO.to_string(),
            api_base: NetworkConfig::GITHUB_API_BASE.to_string(),
            download_base: NetworkConfig::GITHUB_DOWNLOAD_BASE.to_string(),
        }
    }
}

impl ReleaseSource {
    /// Point both the API and asset downloads at one base URL.
    ///
    /// Used for mirrors and local test servers.
    pub fn with_base_url(repo: impl Into<String>, base: impl Into<String>) -> Self {
        let base = base.into().trim_end_matches('/').to_string();
        Self {
            repo: repo.into(),
            api_base: base.clone(),
            download_base: base,
        }
    }

    /// Release tag for a normalized version.
    pub fn tag_for(version: &str) -> String {
        format!("v{}", version)
    }

    /// URL of a release asset for a normalized version.
    pub fn asset_url(&self, version: &str, asset: &str) -> String {
        format!(
            "{}/{}/releases/download/{}/{}",
            self.download_base.trim_end_matches('/'),
            self.repo,
            Self::tag_for(version),
            asset
        )
    }

    /// URL of the latest-release metadata endpoint.
    pub fn latest_release_url(&self) -> String {
        format!(
            "{}/repos/{}/releases/latest",
            self.api_base.trim_end_matches('/'),
            self.repo
        )
    }

    /// Human-facing release notes page.
    pub fn release_notes_url(&self, version: &str) -> String {
        format!(
            "{}/{}/releases/tag/{}",
            self.download_base.trim_end_matches('/'),
            self.repo,
            Self::tag_for(version)
        )
    }
}

/// Runtime settings for one CLI invocation.
#[derive(Debug, Clone)]
pub struct LauncherSettings {
    /// Root directory of the per-user cache.
    pub cache_root: PathBuf,
    /// Release asset location.
    pub release_source: ReleaseSource,
}

impl LauncherSettings {
    pub const ENV_CACHE_DIR: &'static str = "DEVSTACK_CACHE_DIR";
    pub const ENV_RELEASE_REPO: &'static str = "DEVSTACK_RELEASE_REPO";
    pub const ENV_RELEASE_BASE_URL: &'static str = "DEVSTACK_RELEASE_BASE_URL";

    /// Resolve settings from defaults and `DEVSTACK_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let cache_root = match std::env::var_os(Self::ENV_CACHE_DIR) {
            Some(dir) => PathBuf::from(dir),
            None => default_cache_root()?,
        };

        let mut release_source = ReleaseSource::default();
        if let Ok(repo) = std::env::var(Self::ENV_RELEASE_REPO) {
            release_source.repo = repo;
        }
        if let Ok(base) = std::env::var(Self::ENV_RELEASE_BASE_URL) {
            url::Url::parse(&base).map_err(|e| StackError::Config {
                message: format!("{} is not a valid URL: {}", Self::ENV_RELEASE_BASE_URL, e),
            })?;
            release_source = ReleaseSource::with_base_url(release_source.repo, base);
        }

        Ok(Self {
            cache_root,
            release_source,
        })
    }

    /// Override the cache root.
    pub fn with_cache_root(mut self, cache_root: PathBuf) -> Self {
        self.cache_root = cache_root;
        self
    }
}

/// Per-user cache root, e.g. `~/.cache/devstack` on Linux.
pub fn default_cache_root() -> Result<PathBuf> {
    dirs::cache_dir()
        .map(|dir| dir.join(PathsConfig::CACHE_DIR_NAME))
        .ok_or_else(|| StackError::Config {
            message: "Unable to determine the user cache directory".to_string(),
        })
}
