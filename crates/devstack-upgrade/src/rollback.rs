//! Manual recovery instructions after a failed upgrade.

use devstack_core::config::{PathsConfig, ProjectConfig};
use serde::Serialize;
use std::path::Path;

/// Copyable recovery steps. Nothing here is executed automatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackInstructions {
    pub failed_step: String,
    pub previous_version: String,
    pub steps: Vec<String>,
}

impl RollbackInstructions {
    /// Instructions for restoring `previous_version` in `project_dir`.
    ///
    /// `restart_services` empty means every service.
    pub fn new(
        failed_step: impl Into<String>,
        project_dir: &Path,
        previous_version: &str,
        restart_services: &[String],
    ) -> Self {
        let mut restart = format!(
            "cd {} && {}={} docker compose up -d",
            project_dir.display(),
            ProjectConfig::VERSION_ENV_KEY,
            previous_version
        );
        for service in restart_services {
            restart.push(' ');
            restart.push_str(service);
        }

        let steps = vec![
            format!(
                "Set {}={} in {}",
                ProjectConfig::VERSION_ENV_KEY,
                previous_version,
                project_dir.join(PathsConfig::ENV_FILE).display()
            ),
            format!("Restart with the previous configuration: {}", restart),
        ];

        Self {
            failed_step: failed_step.into(),
            previous_version: previous_version.to_string(),
            steps,
        }
    }

    pub fn render(&self) -> String {
        let mut out = format!(
            "Upgrade stopped at step '{}'. No automatic rollback was attempted.\nTo return to {}:\n",
            self.failed_step, self.previous_version
        );
        for (idx, step) in self.steps.iter().enumerate() {
            out.push_str(&format!("  {}. {}\n", idx + 1, step));
        }
        out
    }
}
