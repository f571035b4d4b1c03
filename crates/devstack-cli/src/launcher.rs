//! Shared services for one CLI invocation.

use devstack_core::{
    CacheStore, CompatibilityAnalyzer, FileCache, HttpClient, LauncherSettings, ManifestFetcher,
    ReleaseResolver, TemplateDistributor,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

pub struct Launcher {
    pub settings: LauncherSettings,
    http: Arc<HttpClient>,
    cache: Arc<dyn CacheStore>,
}

impl Launcher {
    /// Resolve settings from the environment; `cache_dir` overrides the cache root.
    pub fn new(cache_dir: Option<PathBuf>) -> anyhow::Result<Self> {
        let mut settings = LauncherSettings::from_env()?;
        if let Some(dir) = cache_dir {
            settings = settings.with_cache_root(dir);
        }
        debug!(
            "Cache root {}, releases from {}",
            settings.cache_root.display(),
            settings.release_source.repo
        );

        Ok(Self {
            http: Arc::new(HttpClient::new()?),
            cache: Arc::new(FileCache::new(&settings.cache_root)),
            settings,
        })
    }

    pub fn cache(&self) -> &dyn CacheStore {
        self.cache.as_ref()
    }

    pub fn resolver(&self) -> ReleaseResolver {
        ReleaseResolver::new(self.http.clone(), self.settings.release_source.clone())
    }

    pub fn fetcher(&self) -> ManifestFetcher {
        ManifestFetcher::new(
            self.http.clone(),
            self.cache.clone(),
            self.settings.release_source.clone(),
        )
    }

    pub fn analyzer(&self) -> CompatibilityAnalyzer {
        CompatibilityAnalyzer::new(self.fetcher())
    }

    pub fn distributor(&self) -> TemplateDistributor {
        TemplateDistributor::new(
            self.http.clone(),
            self.cache.clone(),
            self.settings.release_source.clone(),
        )
    }
}
