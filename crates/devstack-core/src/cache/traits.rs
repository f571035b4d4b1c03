//! Cache store trait and types.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Metadata about a cache namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheMeta {
    /// Namespace name.
    pub namespace: String,
    /// Number of entries in this namespace.
    pub entry_count: usize,
    /// Total size of all entries in bytes.
    pub total_size_bytes: u64,
    /// When an entry in the namespace was last written.
    pub last_modified: Option<DateTime<Utc>>,
}

/// Cache statistics across all namespaces.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Total number of entries across all namespaces.
    pub total_entries: usize,
    /// Total size of all cached data in bytes.
    pub total_size_bytes: u64,
    /// Per-namespace statistics.
    pub namespaces: Vec<CacheMeta>,
}

/// Namespace-isolated key-value storage for fetched release artifacts.
///
/// Keys are opaque names chosen by the caller (a version, or a template name
/// plus version). Entries never expire on their own: they stay until they
/// are invalidated, cleared, or overwritten after a failed validation.
pub trait CacheStore: Send + Sync {
    /// Read an entry. `None` if it does not exist.
    fn read(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write an entry, replacing any existing one.
    fn write(&self, namespace: &str, key: &str, value: &[u8]) -> Result<()>;

    /// Move a finished file into the store under `key`.
    ///
    /// Used for large artifacts that were streamed to disk.
    fn import_file(&self, namespace: &str, key: &str, source: &std::path::Path) -> Result<PathBuf>;

    /// Location of an entry, whether or not it exists.
    fn entry_path(&self, namespace: &str, key: &str) -> PathBuf;

    /// Scratch directory for partially written entries of a namespace.
    fn staging_dir(&self, namespace: &str) -> Result<PathBuf>;

    /// Delete one entry. Returns whether it existed.
    fn invalidate(&self, namespace: &str, key: &str) -> Result<bool>;

    /// Delete every entry of a namespace. Returns the number removed.
    fn invalidate_namespace(&self, namespace: &str) -> Result<usize>;

    /// List entry keys of a namespace.
    fn keys(&self, namespace: &str) -> Result<Vec<String>>;

    /// Total bytes stored, optionally restricted to one namespace.
    fn size_bytes(&self, namespace: Option<&str>) -> Result<u64>;

    /// Overall statistics.
    fn stats(&self) -> Result<CacheStats>;

    /// Remove everything.
    fn clear_all(&self) -> Result<()>;
}
