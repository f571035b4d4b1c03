//! Template archive extraction.
//!
//! Archives are unpacked into a staging directory next to the destination
//! and moved into place afterwards, so a failed extraction leaves the
//! destination untouched. Release archives usually wrap their content in a
//! single top-level directory; that wrapper is stripped.

use crate::error::{Result, StackError};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Archive formats that templates are published in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    TarZst,
    Zip,
}

impl ArchiveFormat {
    /// Detect the format from a file name.
    pub fn from_file_name(name: &str) -> Result<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Ok(ArchiveFormat::TarGz)
        } else if lower.ends_with(".tar.zst") {
            Ok(ArchiveFormat::TarZst)
        } else if lower.ends_with(".zip") {
            Ok(ArchiveFormat::Zip)
        } else {
            Err(StackError::UnsupportedArchive {
                file: name.to_string(),
            })
        }
    }

    /// Canonical file extension, without a leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveFormat::TarGz => "tar.gz",
            ArchiveFormat::TarZst => "tar.zst",
            ArchiveFormat::Zip => "zip",
        }
    }
}

/// Extract `archive_path` into `dest_dir`.
///
/// `dest_dir` must be absent or empty. Returns the number of top-level
/// entries placed into it.
pub fn extract_archive(archive_path: &Path, format: ArchiveFormat, dest_dir: &Path) -> Result<usize> {
    ensure_empty_destination(dest_dir)?;

    let parent = dest_dir
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|e| StackError::io_with_path(e, parent))?;

    let staging = tempfile::Builder::new()
        .prefix(".devstack-extract-")
        .tempdir_in(parent)
        .map_err(|e| StackError::io_with_path(e, parent))?;

    info!(
        "Extracting {} to {}",
        archive_path.display(),
        dest_dir.display()
    );
    match format {
        ArchiveFormat::TarGz => extract_tar_gz(archive_path, staging.path())?,
        ArchiveFormat::TarZst => extract_tar_zst(archive_path, staging.path())?,
        ArchiveFormat::Zip => extract_zip(archive_path, staging.path())?,
    }

    let source_root = content_root(staging.path())?;
    move_contents(&source_root, dest_dir)
}

fn ensure_empty_destination(dest_dir: &Path) -> Result<()> {
    if !dest_dir.exists() {
        return Ok(());
    }
    let mut entries = fs::read_dir(dest_dir).map_err(|e| StackError::io_with_path(e, dest_dir))?;
    if entries.next().is_some() {
        return Err(StackError::Config {
            message: format!("Target directory {} is not empty", dest_dir.display()),
        });
    }
    Ok(())
}

fn open(archive_path: &Path) -> Result<BufReader<File>> {
    let file = File::open(archive_path).map_err(|e| StackError::Io {
        message: format!("Failed to open archive: {}", e),
        path: Some(archive_path.to_path_buf()),
        source: Some(e),
    })?;
    Ok(BufReader::new(file))
}

fn extract_tar_gz(archive_path: &Path, dest: &Path) -> Result<()> {
    let decoder = flate2::read::GzDecoder::new(open(archive_path)?);
    tar::Archive::new(decoder).unpack(dest).map_err(|e| StackError::Io {
        message: format!("Failed to extract tar.gz: {}", e),
        path: Some(dest.to_path_buf()),
        source: Some(e),
    })
}

fn extract_tar_zst(archive_path: &Path, dest: &Path) -> Result<()> {
    let decoder = zstd::Decoder::new(open(archive_path)?).map_err(|e| StackError::Io {
        message: format!("Failed to create zstd decoder: {}", e),
        path: Some(archive_path.to_path_buf()),
        source: Some(e),
    })?;
    tar::Archive::new(decoder).unpack(dest).map_err(|e| StackError::Io {
        message: format!("Failed to extract tar.zst: {}", e),
        path: Some(dest.to_path_buf()),
        source: Some(e),
    })
}

fn extract_zip(archive_path: &Path, dest: &Path) -> Result<()> {
    let mut archive = zip::ZipArchive::new(open(archive_path)?).map_err(|e| StackError::Io {
        message: format!("Failed to read zip archive: {}", e),
        path: Some(archive_path.to_path_buf()),
        source: Some(std::io::Error::other(e)),
    })?;
    archive.extract(dest).map_err(|e| StackError::Io {
        message: format!("Failed to extract zip: {}", e),
        path: Some(dest.to_path_buf()),
        source: Some(std::io::Error::other(e)),
    })
}

/// The directory whose children become the destination's children.
fn content_root(staging: &Path) -> Result<PathBuf> {
    let entries: Vec<PathBuf> = fs::read_dir(staging)
        .map_err(|e| StackError::io_with_path(e, staging))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .collect();

    if entries.len() == 1 && entries[0].is_dir() {
        debug!("Stripping wrapper directory {}", entries[0].display());
        Ok(entries[0].clone())
    } else {
        Ok(staging.to_path_buf())
    }
}

fn move_contents(source_root: &Path, dest_dir: &Path) -> Result<usize> {
    fs::create_dir_all(dest_dir).map_err(|e| StackError::io_with_path(e, dest_dir))?;

    let mut moved = 0;
    for entry in fs::read_dir(source_root).map_err(|e| StackError::io_with_path(e, source_root))? {
        let entry = entry.map_err(|e| StackError::io_with_path(e, source_root))?;
        let target = dest_dir.join(entry.file_name());
        fs::rename(entry.path(), &target).map_err(|e| StackError::Io {
            message: format!("Failed to move extracted entry: {}", e),
            path: Some(target.clone()),
            source: Some(e),
        })?;
        moved += 1;
    }
    Ok(moved)
}
