//! Mode-specific upgrade strategies.

use crate::plan::{ServiceScope, UpgradeStep};
use devstack_core::DeploymentMode;

/// The ordered steps an upgrade performs for one deployment mode.
pub trait UpgradeStrategy: Send + Sync {
    fn mode(&self) -> DeploymentMode;

    fn steps(&self) -> Vec<UpgradeStep>;

    /// Whether the developer's own tooling owns the frontend.
    fn frontend_is_external(&self) -> bool {
        false
    }
}

/// Frontend built and run as a compose service.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardStrategy;

impl UpgradeStrategy for StandardStrategy {
    fn mode(&self) -> DeploymentMode {
        DeploymentMode::Standard
    }

    fn steps(&self) -> Vec<UpgradeStep> {
        vec![
            UpgradeStep::StopServices(ServiceScope::All),
            UpgradeStep::PullImages(ServiceScope::Backend),
            UpgradeStep::BuildFrontend,
            UpgradeStep::StartServices(ServiceScope::All),
            UpgradeStep::WaitHealthy(ServiceScope::All),
            UpgradeStep::WriteVersionMarker,
            UpgradeStep::WriteFrontendPin,
        ]
    }
}

/// Frontend run locally; only the backend tier is touched.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppDevStrategy;

impl UpgradeStrategy for AppDevStrategy {
    fn mode(&self) -> DeploymentMode {
        DeploymentMode::AppDev
    }

    fn steps(&self) -> Vec<UpgradeStep> {
        vec![
            UpgradeStep::StopServices(ServiceScope::Backend),
            UpgradeStep::PullImages(ServiceScope::Backend),
            UpgradeStep::StartServices(ServiceScope::Backend),
            UpgradeStep::WaitHealthy(ServiceScope::Backend),
            UpgradeStep::WriteVersionMarker,
        ]
    }

    fn frontend_is_external(&self) -> bool {
        true
    }
}

/// Strategy for a detected mode.
pub fn strategy_for(mode: DeploymentMode) -> Box<dyn UpgradeStrategy> {
    match mode {
        DeploymentMode::Standard => Box::new(StandardStrategy),
        DeploymentMode::AppDev => Box::new(AppDevStrategy),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_dev_never_touches_frontend() {
        let steps = AppDevStrategy.steps();
        assert!(!steps.contains(&UpgradeStep::BuildFrontend));
        assert!(!steps.contains(&UpgradeStep::WriteFrontendPin));
        assert!(!steps.iter().any(|s| matches!(
            s,
            UpgradeStep::StopServices(ServiceScope::All) | UpgradeStep::StartServices(ServiceScope::All)
        )));
    }

    #[test]
    fn test_standard_writes_markers_after_health() {
        let steps = StandardStrategy.steps();
        let health = steps
            .iter()
            .position(|s| matches!(s, UpgradeStep::WaitHealthy(_)))
            .unwrap();
        let marker = steps
            .iter()
            .position(|s| *s == UpgradeStep::WriteVersionMarker)
            .unwrap();
        assert!(health < marker);
        assert_eq!(strategy_for(DeploymentMode::Standard).mode(), DeploymentMode::Standard);
    }
}
