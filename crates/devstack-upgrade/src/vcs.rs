//! Version-control status query.

use async_trait::async_trait;
use devstack_core::{Result, StackError};
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

/// Reports uncommitted work under a path.
#[async_trait]
pub trait Vcs: Send + Sync {
    /// Whether `path` (relative to `repo_dir`) has uncommitted changes.
    async fn has_uncommitted_changes(&self, repo_dir: &Path, path: &Path) -> Result<bool>;
}

/// `git status --porcelain` backed implementation.
#[derive(Debug, Clone, Default)]
pub struct GitCli;

#[async_trait]
impl Vcs for GitCli {
    async fn has_uncommitted_changes(&self, repo_dir: &Path, path: &Path) -> Result<bool> {
        let output = Command::new("git")
            .args(["status", "--porcelain", "--"])
            .arg(path)
            .current_dir(repo_dir)
            .output()
            .await
            .map_err(|e| StackError::Other(format!("Failed to run git: {}", e)))?;

        if !output.status.success() {
            debug!(
                "git status failed in {}: {}",
                repo_dir.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Err(StackError::Other(format!(
                "git status exited with {}",
                output.status
            )));
        }
        Ok(!output.stdout.is_empty())
    }
}
