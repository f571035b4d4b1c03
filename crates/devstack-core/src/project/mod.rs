//! A scaffolded project on disk.

mod env_file;
mod frontend;

pub use env_file::EnvFile;
pub use frontend::{frontend_manifest_path, read_client_pin, write_client_pin};

use crate::config::{PathsConfig, ProjectConfig};
use crate::mode::{DeploymentMode, ModeDetector};
use crate::{Result, StackError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// What the launcher knows about a project directory.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    pub dir: PathBuf,
    /// Both the compose file and `.env` exist.
    pub scaffolded: bool,
    /// `*_PORT` assignments from `.env`.
    pub ports: BTreeMap<String, u16>,
    pub mode: DeploymentMode,
    /// Backend version marker from `.env`.
    pub installed_version: Option<String>,
}

impl ProjectContext {
    /// Inspect `dir`, detecting the mode with `detector`.
    pub async fn load(dir: &Path, detector: &ModeDetector) -> Result<Self> {
        let scaffolded = is_scaffolded(dir);
        let env = EnvFile::load(env_path(dir))?;
        let mode = detector.detect(dir).await;

        let context = Self {
            dir: dir.to_path_buf(),
            scaffolded,
            ports: env.ports(),
            mode,
            installed_version: env.get(ProjectConfig::VERSION_ENV_KEY),
        };
        debug!(
            "Project {}: scaffolded={}, mode={}, version={:?}",
            dir.display(),
            context.scaffolded,
            context.mode,
            context.installed_version
        );
        Ok(context)
    }

    /// Fail unless the project has been scaffolded.
    pub fn require_scaffolded(&self) -> Result<()> {
        if self.scaffolded {
            Ok(())
        } else {
            Err(StackError::NotScaffolded(self.dir.clone()))
        }
    }
}

/// Location of the project's `.env`.
pub fn env_path(dir: &Path) -> PathBuf {
    dir.join(PathsConfig::ENV_FILE)
}

/// Whether `dir` holds a scaffolded project.
pub fn is_scaffolded(dir: &Path) -> bool {
    dir.join(PathsConfig::COMPOSE_FILE).is_file() && env_path(dir).is_file()
}

/// Read the backend version marker.
pub fn read_version_marker(dir: &Path) -> Result<Option<String>> {
    Ok(EnvFile::load(env_path(dir))?.get(ProjectConfig::VERSION_ENV_KEY))
}

/// Rewrite the backend version marker, leaving other `.env` lines intact.
pub fn write_version_marker(dir: &Path, version: &str) -> Result<()> {
    let mut env = EnvFile::load(env_path(dir))?;
    env.set(ProjectConfig::VERSION_ENV_KEY, version);
    env.save()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::MarkerFileSignal;
    use std::fs;
    use tempfile::TempDir;

    fn marker_only_detector() -> ModeDetector {
        ModeDetector::with_signals(vec![Box::new(MarkerFileSignal)])
    }

    #[tokio::test]
    async fn test_load_scaffolded_project() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("docker-compose.yml"), "services: {}\n").unwrap();
        fs::write(temp.path().join(".env"), "DEVSTACK_VERSION=0.7.0\nAPI_PORT=8080\n").unwrap();
        fs::write(temp.path().join(".devstack-mode"), "app-dev").unwrap();

        let context = ProjectContext::load(temp.path(), &marker_only_detector())
            .await
            .unwrap();
        assert!(context.scaffolded);
        assert!(context.require_scaffolded().is_ok());
        assert_eq!(context.installed_version.as_deref(), Some("0.7.0"));
        assert_eq!(context.ports.get("API_PORT"), Some(&8080));
        assert_eq!(context.mode, DeploymentMode::AppDev);
    }

    #[tokio::test]
    async fn test_unscaffolded_project() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(".env"), "DEVSTACK_VERSION=0.7.0\n").unwrap();

        let context = ProjectContext::load(temp.path(), &marker_only_detector())
            .await
            .unwrap();
        assert!(matches!(
            context.require_scaffolded(),
            Err(StackError::NotScaffolded(_))
        ));
    }

    #[test]
    fn test_version_marker_round_trip() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(".env"), "# keep\nDEVSTACK_VERSION=0.7.0\n").unwrap();

        write_version_marker(temp.path(), "0.8.0").unwrap();
        assert_eq!(read_version_marker(temp.path()).unwrap().as_deref(), Some("0.8.0"));
        assert!(fs::read_to_string(temp.path().join(".env"))
            .unwrap()
            .starts_with("# keep\n"));
    }
}
