//! Cache abstraction for release artifacts.
//!
//! Compatibility manifests, template manifests and template archives share
//! one store with namespace-based isolation. The store is handed to each
//! component as an `Arc<dyn CacheStore>` rather than discovered globally.

mod file;
mod traits;

pub use file::FileCache;
pub use traits::{CacheMeta, CacheStats, CacheStore};
