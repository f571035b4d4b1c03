//! `docker compose` implementation of [`ComposeEngine`].

use super::{ComposeEngine, ComposeProject, ServiceStatus};
use crate::{Result, StackError};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;

/// Lines of stderr kept in an orchestration error.
const STDERR_TAIL_LINES: usize = 20;

/// Runs `docker compose` subcommands in the project directory.
#[derive(Debug, Clone)]
pub struct DockerCompose {
    program: PathBuf,
}

impl Default for DockerCompose {
    fn default() -> Self {
        Self {
            program: PathBuf::from("docker"),
        }
    }
}

impl DockerCompose {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different docker binary.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, project: &ComposeProject, args: &[&str], services: &[String]) -> Result<String> {
        let step = format!("docker compose {}", args.join(" "));
        debug!("Running {} in {}", step, project.dir.display());

        let output = Command::new(&self.program)
            .arg("compose")
            .args(args)
            .args(services)
            .current_dir(&project.dir)
            .envs(project.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| StackError::Orchestration {
                step: step.clone(),
                message: format!("failed to run {}: {}", self.program.display(), e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let lines: Vec<&str> = stderr.lines().collect();
            let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
            return Err(StackError::Orchestration {
                step,
                message: format!("exited with {}: {}", output.status, tail.trim()),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl ComposeEngine for DockerCompose {
    async fn list_services(&self, project: &ComposeProject) -> Result<Vec<String>> {
        let stdout = self.run(project, &["config", "--services"], &[]).await?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn status(&self, project: &ComposeProject) -> Result<Vec<ServiceStatus>> {
        let stdout = self.run(project, &["ps", "--all", "--format", "json"], &[]).await?;
        parse_ps_output(&stdout)
    }

    async fn stop(&self, project: &ComposeProject, services: &[String]) -> Result<()> {
        self.run(project, &["stop"], services).await.map(|_| ())
    }

    async fn pull(&self, project: &ComposeProject, services: &[String]) -> Result<()> {
        self.run(project, &["pull"], services).await.map(|_| ())
    }

    async fn build(&self, project: &ComposeProject, services: &[String]) -> Result<()> {
        self.run(project, &["build"], services).await.map(|_| ())
    }

    async fn up(&self, project: &ComposeProject, services: &[String]) -> Result<()> {
        self.run(project, &["up", "-d"], services).await.map(|_| ())
    }
}

#[derive(Debug, Deserialize)]
struct PsEntry {
    #[serde(rename = "Service")]
    service: String,
    #[serde(rename = "State", default)]
    state: String,
    #[serde(rename = "Health", default)]
    health: String,
}

impl From<PsEntry> for ServiceStatus {
    fn from(entry: PsEntry) -> Self {
        ServiceStatus {
            service: entry.service,
            state: entry.state,
            health: Some(entry.health).filter(|h| !h.is_empty()),
        }
    }
}

/// Parse `docker compose ps --format json` output.
///
/// Older compose releases print one JSON array; newer ones print one object
/// per line.
pub fn parse_ps_output(stdout: &str) -> Result<Vec<ServiceStatus>> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let entries: Vec<PsEntry> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed)
            .map_err(|e| StackError::schema("compose status", e.to_string()))?
    } else {
        trimmed
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| {
                serde_json::from_str(l).map_err(|e| StackError::schema("compose status", e.to_string()))
            })
            .collect::<Result<_>>()?
    };

    Ok(entries.into_iter().map(ServiceStatus::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ndjson() {
        let out = r#"{"Name":"app-api-1","Service":"api","State":"running","Health":"healthy"}
{"Name":"app-web-1","Service":"web","State":"running","Health":""}
"#;
        let statuses = parse_ps_output(out).unwrap();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].health.as_deref(), Some("healthy"));
        assert_eq!(statuses[1].service, "web");
        assert!(statuses[1].health.is_none());
    }

    #[test]
    fn test_parse_array() {
        let out = r#"[{"Service":"db","State":"exited"}]"#;
        let statuses = parse_ps_output(out).unwrap();
        assert!(statuses[0].is_failed());
    }

    #[test]
    fn test_parse_empty_and_garbage() {
        assert!(parse_ps_output("  \n").unwrap().is_empty());
        assert!(parse_ps_output("not json").is_err());
    }

    #[tokio::test]
    async fn test_missing_binary_is_orchestration_error() {
        let engine = DockerCompose::with_program("/nonexistent/docker-binary");
        let project = ComposeProject::new(std::env::temp_dir());
        match engine.pull(&project, &[]).await {
            Err(StackError::Orchestration { step, .. }) => assert_eq!(step, "docker compose pull"),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
