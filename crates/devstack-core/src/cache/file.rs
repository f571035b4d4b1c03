//! File-backed cache store.
//!
//! Layout: `<root>/<namespace>/<key>`. Writes go through a temp file in the
//! same directory and are renamed into place, so a crash never leaves a
//! half-written entry under its final name. Temp files carry a `.part`
//! suffix and are invisible to [`CacheStore::keys`].

use super::traits::{CacheMeta, CacheStats, CacheStore};
use crate::atomic::atomic_write;
use crate::config::NetworkConfig;
use crate::error::{Result, StackError};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

const STAGING_DIR_NAME: &str = ".staging";

/// Cache store rooted at a directory on disk.
#[derive(Debug, Clone)]
pub struct FileCache {
    root: PathBuf,
}

impl FileCache {
    /// Create a store rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn namespace_dir(&self, namespace: &str) -> PathBuf {
        self.root.join(sanitize(namespace))
    }

    fn ensure_dir(dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).map_err(|e| StackError::Io {
            message: format!("Failed to create cache directory: {}", e),
            path: Some(dir.to_path_buf()),
            source: Some(e),
        })
    }

    fn is_entry(path: &Path) -> bool {
        path.is_file()
            && !path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.ends_with(NetworkConfig::DOWNLOAD_TEMP_SUFFIX) || n.starts_with('.'))
                .unwrap_or(true)
    }

    fn namespace_meta(&self, namespace: &str) -> Result<CacheMeta> {
        let dir = self.namespace_dir(namespace);
        let mut meta = CacheMeta {
            namespace: namespace.to_string(),
            entry_count: 0,
            total_size_bytes: 0,
            last_modified: None,
        };

        if !dir.exists() {
            return Ok(meta);
        }

        for entry in fs::read_dir(&dir).map_err(|e| StackError::io_with_path(e, &dir))? {
            let path = entry.map_err(|e| StackError::io_with_path(e, &dir))?.path();
            if !Self::is_entry(&path) {
                continue;
            }
            let metadata = fs::metadata(&path).map_err(|e| StackError::io_with_path(e, &path))?;
            meta.entry_count += 1;
            meta.total_size_bytes += metadata.len();
            if let Ok(modified) = metadata.modified() {
                let modified: DateTime<Utc> = modified.into();
                if meta.last_modified.map(|m| modified > m).unwrap_or(true) {
                    meta.last_modified = Some(modified);
                }
            }
        }

        Ok(meta)
    }
}

impl CacheStore for FileCache {
    fn read(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.entry_path(namespace, key);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StackError::io_with_path(e, path)),
        }
    }

    fn write(&self, namespace: &str, key: &str, value: &[u8]) -> Result<()> {
        let path = self.entry_path(namespace, key);
        atomic_write(&path, value)?;

        debug!("Cached {}/{} ({} bytes)", namespace, key, value.len());
        Ok(())
    }

    fn import_file(&self, namespace: &str, key: &str, source: &Path) -> Result<PathBuf> {
        let dir = self.namespace_dir(namespace);
        Self::ensure_dir(&dir)?;
        let path = self.entry_path(namespace, key);

        if fs::rename(source, &path).is_err() {
            // Different filesystem: copy then remove.
            fs::copy(source, &path).map_err(|e| StackError::io_with_path(e, &path))?;
            let _ = fs::remove_file(source);
        }

        debug!("Imported {} into cache as {}/{}", source.display(), namespace, key);
        Ok(path)
    }

    fn entry_path(&self, namespace: &str, key: &str) -> PathBuf {
        self.namespace_dir(namespace).join(sanitize(key))
    }

    fn staging_dir(&self, namespace: &str) -> Result<PathBuf> {
        let dir = self.namespace_dir(namespace).join(STAGING_DIR_NAME);
        Self::ensure_dir(&dir)?;
        Ok(dir)
    }

    fn invalidate(&self, namespace: &str, key: &str) -> Result<bool> {
        let path = self.entry_path(namespace, key);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Invalidated cache entry {}/{}", namespace, key);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StackError::io_with_path(e, path)),
        }
    }

    fn invalidate_namespace(&self, namespace: &str) -> Result<usize> {
        let count = self.keys(namespace)?.len();
        let dir = self.namespace_dir(namespace);
        if dir.exists() {
            fs::remove_dir_all(&dir).map_err(|e| StackError::io_with_path(e, &dir))?;
        }
        Ok(count)
    }

    fn keys(&self, namespace: &str) -> Result<Vec<String>> {
        let dir = self.namespace_dir(namespace);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|e| StackError::io_with_path(e, &dir))? {
            let path = entry.map_err(|e| StackError::io_with_path(e, &dir))?.path();
            if !Self::is_entry(&path) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                keys.push(name.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn size_bytes(&self, namespace: Option<&str>) -> Result<u64> {
        let dir = match namespace {
            Some(ns) => self.namespace_dir(ns),
            None => self.root.clone(),
        };
        if !dir.exists() {
            return Ok(0);
        }

        let mut total = 0;
        for entry in WalkDir::new(&dir).into_iter() {
            match entry {
                Ok(entry) if entry.file_type().is_file() => {
                    total += entry.metadata().map(|m| m.len()).unwrap_or(0);
                }
                Ok(_) => {}
                Err(e) => warn!("Skipping unreadable cache path: {}", e),
            }
        }
        Ok(total)
    }

    fn stats(&self) -> Result<CacheStats> {
        let mut stats = CacheStats::default();
        if !self.root.exists() {
            return Ok(stats);
        }

        let mut namespaces = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(|e| StackError::io_with_path(e, &self.root))? {
            let path = entry.map_err(|e| StackError::io_with_path(e, &self.root))?.path();
            if path.is_dir() {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    namespaces.push(name.to_string());
                }
            }
        }
        namespaces.sort();

        for namespace in namespaces {
            let meta = self.namespace_meta(&namespace)?;
            stats.total_entries += meta.entry_count;
            stats.total_size_bytes += meta.total_size_bytes;
            stats.namespaces.push(meta);
        }
        Ok(stats)
    }

    fn clear_all(&self) -> Result<()> {
        if self.root.exists() {
            fs::remove_dir_all(&self.root).map_err(|e| StackError::io_with_path(e, &self.root))?;
        }
        Ok(())
    }
}

/// Make a key safe to use as a single path component.
fn sanitize(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '-',
            c => c,
        })
        .collect()
}
