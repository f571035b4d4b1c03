//! Container orchestration seam.
//!
//! Everything that shells out to the compose engine goes through
//! [`ComposeEngine`], so detection and upgrade logic can be exercised with a
//! scripted engine in tests.

mod docker;

pub use docker::{parse_ps_output, DockerCompose};

use crate::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// A compose project on disk, plus environment overrides for engine calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeProject {
    /// Directory containing the compose file.
    pub dir: PathBuf,
    /// Extra environment variables passed to every engine command.
    pub env: Vec<(String, String)>,
}

impl ComposeProject {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            env: Vec::new(),
        }
    }

    /// Add an environment override.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Runtime state of one compose service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStatus {
    pub service: String,
    /// Container state, e.g. `running`, `exited`, `restarting`.
    pub state: String,
    /// Health check result if the service defines one.
    pub health: Option<String>,
}

impl ServiceStatus {
    pub fn is_running(&self) -> bool {
        self.state.eq_ignore_ascii_case("running")
    }

    /// Running, and healthy if a health check is defined.
    pub fn is_healthy(&self) -> bool {
        self.is_running()
            && self
                .health
                .as_deref()
                .map(|h| h.eq_ignore_ascii_case("healthy"))
                .unwrap_or(true)
    }

    /// Exited, dead, or reported unhealthy.
    pub fn is_failed(&self) -> bool {
        matches!(self.state.to_ascii_lowercase().as_str(), "exited" | "dead")
            || self
                .health
                .as_deref()
                .map(|h| h.eq_ignore_ascii_case("unhealthy"))
                .unwrap_or(false)
    }
}

/// Compose engine command surface.
///
/// Service lists that are empty mean "every service in the project".
#[async_trait]
pub trait ComposeEngine: Send + Sync {
    /// Names of the services declared by the compose file.
    async fn list_services(&self, project: &ComposeProject) -> Result<Vec<String>>;

    /// Structured status of the project's containers.
    async fn status(&self, project: &ComposeProject) -> Result<Vec<ServiceStatus>>;

    /// Names of services with a running container.
    async fn running_services(&self, project: &ComposeProject) -> Result<Vec<String>> {
        Ok(self
            .status(project)
            .await?
            .into_iter()
            .filter(|s| s.is_running())
            .map(|s| s.service)
            .collect())
    }

    /// Stop services.
    async fn stop(&self, project: &ComposeProject, services: &[String]) -> Result<()>;

    /// Pull images for services.
    async fn pull(&self, project: &ComposeProject, services: &[String]) -> Result<()>;

    /// Build images for services.
    async fn build(&self, project: &ComposeProject, services: &[String]) -> Result<()>;

    /// Start services detached.
    async fn up(&self, project: &ComposeProject, services: &[String]) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(state: &str, health: Option<&str>) -> ServiceStatus {
        ServiceStatus {
            service: "api".into(),
            state: state.into(),
            health: health.map(str::to_string),
        }
    }

    #[test]
    fn test_health_classification() {
        assert!(status("running", None).is_healthy());
        assert!(status("running", Some("healthy")).is_healthy());
        assert!(!status("running", Some("starting")).is_healthy());
        assert!(!status("running", Some("starting")).is_failed());
        assert!(status("running", Some("unhealthy")).is_failed());
        assert!(status("exited", None).is_failed());
        assert!(!status("restarting", None).is_healthy());
    }
}
