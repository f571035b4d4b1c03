//! Deployment mode detection.
//!
//! A project runs in one of two topologies: the frontend inside the compose
//! service set (standard) or under the developer's own tooling (app-dev).
//! Detection asks an ordered list of independent signals and takes the first
//! answer; live engine state outranks the persisted marker, which outranks
//! the filesystem heuristic.

use crate::atomic::{atomic_write, read_optional};
use crate::compose::{ComposeEngine, ComposeProject};
use crate::config::{PathsConfig, ProjectConfig};
use crate::{Result, StackError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Topology a project is deployed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeploymentMode {
    /// Frontend runs as the `web` compose service.
    Standard,
    /// Frontend runs locally, outside compose.
    AppDev,
}

impl DeploymentMode {
    /// Value written to the mode marker file.
    pub fn marker(&self) -> &'static str {
        match self {
            DeploymentMode::Standard => "default",
            DeploymentMode::AppDev => "app-dev",
        }
    }

    /// Parse exact marker file contents.
    pub fn from_marker(value: &str) -> Option<Self> {
        match value {
            "default" => Some(DeploymentMode::Standard),
            "app-dev" => Some(DeploymentMode::AppDev),
            _ => None,
        }
    }

    /// Name shown to users.
    pub fn display_name(&self) -> &'static str {
        match self {
            DeploymentMode::Standard => "standard",
            DeploymentMode::AppDev => "local-frontend-dev",
        }
    }
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for DeploymentMode {
    type Err = StackError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "default" | "standard" => Ok(DeploymentMode::Standard),
            "app-dev" | "local-frontend-dev" => Ok(DeploymentMode::AppDev),
            other => Err(StackError::InvalidMode(other.to_string())),
        }
    }
}

/// One source of evidence about a project's mode.
#[async_trait]
pub trait ModeSignal: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// The mode this signal indicates, or `None` if it has no opinion.
    async fn detect(&self, project_dir: &Path) -> Option<DeploymentMode>;
}

/// A running frontend container means the project is in standard mode.
pub struct RunningFrontendSignal {
    engine: Arc<dyn ComposeEngine>,
}

impl RunningFrontendSignal {
    pub fn new(engine: Arc<dyn ComposeEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl ModeSignal for RunningFrontendSignal {
    fn name(&self) -> &'static str {
        "running services"
    }

    async fn detect(&self, project_dir: &Path) -> Option<DeploymentMode> {
        let project = ComposeProject::new(project_dir);
        match self.engine.running_services(&project).await {
            Ok(services) if services.iter().any(|s| s == ProjectConfig::FRONTEND_SERVICE) => {
                Some(DeploymentMode::Standard)
            }
            Ok(_) => None,
            Err(e) => {
                debug!("Engine status unavailable for mode detection: {}", e);
                None
            }
        }
    }
}

/// The persisted `.devstack-mode` marker.
pub struct MarkerFileSignal;

#[async_trait]
impl ModeSignal for MarkerFileSignal {
    fn name(&self) -> &'static str {
        "mode marker"
    }

    async fn detect(&self, project_dir: &Path) -> Option<DeploymentMode> {
        read_marker(project_dir).ok().flatten()
    }
}

/// Installed frontend dependencies suggest the frontend is run locally.
pub struct FrontendDependenciesSignal;

#[async_trait]
impl ModeSignal for FrontendDependenciesSignal {
    fn name(&self) -> &'static str {
        "frontend dependencies"
    }

    async fn detect(&self, project_dir: &Path) -> Option<DeploymentMode> {
        project_dir
            .join(PathsConfig::FRONTEND_DIR)
            .join(PathsConfig::FRONTEND_DEPENDENCY_DIR)
            .is_dir()
            .then_some(DeploymentMode::AppDev)
    }
}

/// First-match-wins combination of mode signals.
pub struct ModeDetector {
    signals: Vec<Box<dyn ModeSignal>>,
}

impl ModeDetector {
    /// Detector with the standard signal order.
    pub fn new(engine: Arc<dyn ComposeEngine>) -> Self {
        Self::with_signals(vec![
            Box::new(RunningFrontendSignal::new(engine)),
            Box::new(MarkerFileSignal),
            Box::new(FrontendDependenciesSignal),
        ])
    }

    /// Detector that only reads the project tree. Never queries the engine.
    pub fn offline() -> Self {
        Self::with_signals(vec![
            Box::new(MarkerFileSignal),
            Box::new(FrontendDependenciesSignal),
        ])
    }

    /// Detector over an explicit, ordered signal list.
    pub fn with_signals(signals: Vec<Box<dyn ModeSignal>>) -> Self {
        Self { signals }
    }

    /// Detect the mode of the project at `project_dir`.
    pub async fn detect(&self, project_dir: &Path) -> DeploymentMode {
        self.detect_with_source(project_dir).await.0
    }

    /// Detect the mode and report which signal decided it.
    pub async fn detect_with_source(&self, project_dir: &Path) -> (DeploymentMode, &'static str) {
        for signal in &self.signals {
            if let Some(mode) = signal.detect(project_dir).await {
                debug!("Mode {} from {}", mode, signal.name());
                return (mode, signal.name());
            }
        }
        (DeploymentMode::Standard, "default")
    }
}

impl fmt::Debug for ModeDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.signals.iter().map(|s| s.name()).collect();
        f.debug_struct("ModeDetector").field("signals", &names).finish()
    }
}

/// Read the mode marker. Unrecognized contents count as absent.
pub fn read_marker(project_dir: &Path) -> Result<Option<DeploymentMode>> {
    let path = project_dir.join(PathsConfig::MODE_MARKER_FILE);
    Ok(read_optional(&path)?.and_then(|contents| DeploymentMode::from_marker(contents.trim())))
}

/// Persist the mode marker, replacing any previous value.
pub fn save(project_dir: &Path, mode: DeploymentMode) -> Result<()> {
    let path = project_dir.join(PathsConfig::MODE_MARKER_FILE);
    atomic_write(&path, mode.marker().as_bytes())
}
