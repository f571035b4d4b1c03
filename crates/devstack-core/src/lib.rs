//! devstack core - release metadata, templates and project inspection.
//!
//! This crate holds everything the launcher needs below the upgrade
//! procedure itself: fetching and caching per-release documents, verifying
//! and extracting template archives, classifying upgrades by their declared
//! breaking changes, and reading a project's on-disk and runtime state.
//!
//! The upgrade state machine lives in the `devstack-upgrade` crate.
//!
//! # Example
//!
//! ```rust,ignore
//! use devstack_core::{CompatibilityAnalyzer, FileCache, HttpClient, ManifestFetcher, ReleaseSource};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> devstack_core::Result<()> {
//!     let cache = Arc::new(FileCache::new("/tmp/devstack-cache"));
//!     let http = Arc::new(HttpClient::new()?);
//!     let fetcher = ManifestFetcher::new(http, cache, ReleaseSource::default());
//!
//!     let check = CompatibilityAnalyzer::new(fetcher).check("0.7.0", "0.8.0").await?;
//!     println!("breaking: {}", check.breaking);
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod atomic;
pub mod cache;
pub mod checksum;
pub mod compat;
pub mod compose;
pub mod config;
pub mod error;
pub mod manifest;
pub mod mode;
pub mod network;
pub mod project;
pub mod templates;
pub mod version;

// Re-export commonly used types
pub use cache::{CacheMeta, CacheStats, CacheStore, FileCache};
pub use compat::{format_warnings, CompatibilityAnalyzer, CompatibilityCheck};
pub use compose::{ComposeEngine, ComposeProject, DockerCompose, ServiceStatus};
pub use config::{LauncherSettings, ReleaseSource};
pub use error::{ErrorKind, Result, StackError};
pub use manifest::{BreakingChange, CompatibilityManifest, FetchOptions, ManifestFetcher};
pub use mode::{DeploymentMode, ModeDetector, ModeSignal};
pub use network::{HttpClient, ReleaseResolver, RetryPolicy};
pub use project::ProjectContext;
pub use templates::{InstalledTemplate, TemplateDistributor, TemplateEntry, TemplateManifest};
