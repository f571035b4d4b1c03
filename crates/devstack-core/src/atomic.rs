//! Atomic file replacement.
//!
//! Writes go to a temp file in the target's directory, are synced, then
//! renamed over the target. Readers never observe a partially written file.

use crate::config::NetworkConfig;
use crate::{Result, StackError};
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Replace `path` with `contents`, creating parent directories as needed.
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| StackError::Io {
        message: format!("Failed to create directory: {}", e),
        path: Some(dir.to_path_buf()),
        source: Some(e),
    })?;

    let mut temp = tempfile::Builder::new()
        .prefix(".")
        .suffix(NetworkConfig::DOWNLOAD_TEMP_SUFFIX)
        .tempfile_in(dir)
        .map_err(|e| StackError::io_with_path(e, dir))?;

    temp.write_all(contents).map_err(|e| StackError::Io {
        message: format!("Failed to write temp file: {}", e),
        path: Some(temp.path().to_path_buf()),
        source: Some(e),
    })?;
    temp.as_file().sync_all().map_err(|e| StackError::Io {
        message: format!("Failed to sync temp file: {}", e),
        path: Some(temp.path().to_path_buf()),
        source: Some(e),
    })?;

    temp.persist(path).map_err(|e| StackError::Io {
        message: format!("Failed to replace {}: {}", path.display(), e.error),
        path: Some(path.to_path_buf()),
        source: Some(e.error),
    })?;

    debug!("Wrote {} ({} bytes)", path.display(), contents.len());
    Ok(())
}

/// Read a UTF-8 file, `None` if it does not exist.
pub fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StackError::io_with_path(e, path)),
    }
}
