//! Upgrade steps and the plan shown before anything runs.

use devstack_core::config::{PathsConfig, ProjectConfig};
use devstack_core::{CompatibilityCheck, DeploymentMode};
use serde::Serialize;
use std::fmt;

/// Which compose services a step addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceScope {
    /// Every service, frontend included.
    All,
    /// Every service except the frontend.
    Backend,
}

impl fmt::Display for ServiceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ServiceScope::All => "all",
            ServiceScope::Backend => "backend",
        })
    }
}

/// One unit of work during execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "step", content = "scope", rename_all = "kebab-case")]
pub enum UpgradeStep {
    StopServices(ServiceScope),
    PullImages(ServiceScope),
    BuildFrontend,
    StartServices(ServiceScope),
    WaitHealthy(ServiceScope),
    WriteVersionMarker,
    WriteFrontendPin,
}

impl UpgradeStep {
    /// Whether the step shells out to the compose engine.
    pub fn uses_engine(&self) -> bool {
        !matches!(self, UpgradeStep::WriteVersionMarker | UpgradeStep::WriteFrontendPin)
    }
}

impl fmt::Display for UpgradeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpgradeStep::StopServices(scope) => write!(f, "Stop {} services", scope),
            UpgradeStep::PullImages(_) => write!(f, "Pull backend images"),
            UpgradeStep::BuildFrontend => write!(
                f,
                "Build the {} image",
                ProjectConfig::FRONTEND_SERVICE
            ),
            UpgradeStep::StartServices(scope) => write!(f, "Start {} services", scope),
            UpgradeStep::WaitHealthy(scope) => {
                write!(f, "Wait for {} services to become healthy", scope)
            }
            UpgradeStep::WriteVersionMarker => write!(
                f,
                "Set {} in {}",
                ProjectConfig::VERSION_ENV_KEY,
                PathsConfig::ENV_FILE
            ),
            UpgradeStep::WriteFrontendPin => write!(
                f,
                "Pin {} in {}/{}",
                ProjectConfig::CLIENT_PACKAGE,
                PathsConfig::FRONTEND_DIR,
                PathsConfig::FRONTEND_MANIFEST
            ),
        }
    }
}

/// Everything decided before execution.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradePlan {
    pub from_version: String,
    pub to_version: String,
    pub mode: DeploymentMode,
    pub downgrade: bool,
    pub steps: Vec<UpgradeStep>,
    pub compatibility: CompatibilityCheck,
}

impl UpgradePlan {
    /// Human-readable plan, as printed for a dry run.
    pub fn render(&self) -> String {
        let mut out = format!(
            "Upgrade {} -> {} ({} mode)\n",
            self.from_version, self.to_version, self.mode
        );
        if self.downgrade {
            out.push_str("  ! Target is older than the installed version (downgrade)\n");
        }
        out.push_str("\nSteps:\n");
        for (idx, step) in self.steps.iter().enumerate() {
            out.push_str(&format!("  {}. {}\n", idx + 1, step));
        }

        let warnings = devstack_core::format_warnings(&self.compatibility);
        if !warnings.is_empty() {
            out.push_str("\nCompatibility:\n");
            out.push_str(&warnings);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_descriptions() {
        assert_eq!(
            UpgradeStep::StopServices(ServiceScope::Backend).to_string(),
            "Stop backend services"
        );
        assert_eq!(UpgradeStep::BuildFrontend.to_string(), "Build the web image");
        assert_eq!(
            UpgradeStep::WriteVersionMarker.to_string(),
            "Set DEVSTACK_VERSION in .env"
        );
        assert!(!UpgradeStep::WriteFrontendPin.uses_engine());
        assert!(UpgradeStep::PullImages(ServiceScope::Backend).uses_engine());
    }
}
