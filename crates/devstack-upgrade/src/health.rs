//! Post-start health polling.

use devstack_core::config::UpgradeConfig;
use devstack_core::{ComposeEngine, ComposeProject, Result, StackError};
use std::time::{Duration, Instant};
use tracing::debug;

/// Timing of the health wait.
#[derive(Debug, Clone, Copy)]
pub struct HealthSettings {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            timeout: UpgradeConfig::HEALTH_TIMEOUT,
            poll_interval: UpgradeConfig::HEALTH_POLL_INTERVAL,
        }
    }
}

/// Poll until every service in `services` is running and healthy.
///
/// Fails early when a service exits or reports unhealthy.
pub async fn wait_until_healthy(
    engine: &dyn ComposeEngine,
    project: &ComposeProject,
    services: &[String],
    settings: HealthSettings,
) -> Result<()> {
    let started = Instant::now();

    loop {
        let statuses = engine.status(project).await?;

        if let Some(failed) = statuses
            .iter()
            .find(|s| services.contains(&s.service) && s.is_failed())
        {
            return Err(StackError::ServiceUnhealthy {
                service: failed.service.clone(),
                state: failed.health.clone().unwrap_or_else(|| failed.state.clone()),
            });
        }

        let pending: Vec<&str> = services
            .iter()
            .filter(|name| {
                !statuses
                    .iter()
                    .any(|s| &s.service == *name && s.is_healthy())
            })
            .map(String::as_str)
            .collect();

        if pending.is_empty() {
            debug!("All {} services healthy after {:?}", services.len(), started.elapsed());
            return Ok(());
        }

        if started.elapsed() >= settings.timeout {
            return Err(StackError::HealthTimeout {
                timeout: settings.timeout,
                pending: pending.iter().map(|s| s.to_string()).collect(),
            });
        }

        debug!("Waiting for {}", pending.join(", "));
        tokio::time::sleep(settings.poll_interval).await;
    }
}
