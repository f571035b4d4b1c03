//! Per-release compatibility manifests.

pub(crate) mod document;
mod fetcher;
mod types;

pub use document::{FetchOptions, ReleaseDocument};
pub use fetcher::ManifestFetcher;
pub use types::{BreakingChange, CompatibilityManifest};
