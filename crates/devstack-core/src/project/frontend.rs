//! Pinned client version in the frontend manifest.
//!
//! The pin is rewritten textually so the file keeps its formatting, key
//! order and any range operator in front of the version.

use crate::atomic::{atomic_write, read_optional};
use crate::config::{PathsConfig, ProjectConfig};
use crate::Result;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

static CLIENT_PIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r#"("{}"\s*:\s*")([\^~]?)([^"]*)(")"#,
        regex::escape(ProjectConfig::CLIENT_PACKAGE)
    ))
    .expect("client pin pattern is valid")
});

/// Path of the frontend manifest inside a project.
pub fn frontend_manifest_path(project_dir: &Path) -> PathBuf {
    project_dir
        .join(PathsConfig::FRONTEND_DIR)
        .join(PathsConfig::FRONTEND_MANIFEST)
}

/// The pinned client version, without a range operator.
pub fn read_client_pin(project_dir: &Path) -> Result<Option<String>> {
    let path = frontend_manifest_path(project_dir);
    Ok(read_optional(&path)?.and_then(|contents| {
        CLIENT_PIN_RE
            .captures(&contents)
            .map(|caps| caps[3].to_string())
    }))
}

/// Rewrite the pinned client version.
///
/// Returns `false` when the manifest or the dependency is absent.
pub fn write_client_pin(project_dir: &Path, version: &str) -> Result<bool> {
    let path = frontend_manifest_path(project_dir);
    let Some(contents) = read_optional(&path)? else {
        debug!("No frontend manifest at {}", path.display());
        return Ok(false);
    };
    if !CLIENT_PIN_RE.is_match(&contents) {
        debug!("{} does not pin {}", path.display(), ProjectConfig::CLIENT_PACKAGE);
        return Ok(false);
    }

    let updated = CLIENT_PIN_RE.replace(&contents, |caps: &regex::Captures| {
        format!("{}{}{}{}", &caps[1], &caps[2], version, &caps[4])
    });
    atomic_write(&path, updated.as_bytes())?;
    Ok(true)
}
