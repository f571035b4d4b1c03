//! Upgrade orchestrator.
//!
//! Drives [`UpgradeState`] one transition at a time. Nothing touches the
//! project or the compose engine before `Executing`, apart from the status
//! query mode detection makes during `Init`. Dry runs skip that query and
//! detect the mode from the project tree alone. Once `Executing` starts, the
//! first failing step ends the run with manual rollback instructions.

use crate::health::{wait_until_healthy, HealthSettings};
use crate::lockfile::ManualUpdateHint;
use crate::plan::{ServiceScope, UpgradePlan, UpgradeStep};
use crate::prompt::{Confirm, StdinConfirm};
use crate::rollback::RollbackInstructions;
use crate::state::{UpgradeEvent, UpgradeOutcome, UpgradeState};
use crate::strategy::strategy_for;
use crate::vcs::{GitCli, Vcs};
use devstack_core::config::{NetworkConfig, PathsConfig, ProjectConfig};
use devstack_core::project::{env_path, write_client_pin, write_version_marker};
use devstack_core::version::{normalize_version, parse_version};
use devstack_core::{
    format_warnings, CompatibilityAnalyzer, ComposeEngine, ComposeProject, DeploymentMode,
    ModeDetector, ProjectContext, ReleaseResolver, Result, StackError,
};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// What the operator asked for.
#[derive(Debug, Clone, Default)]
pub struct UpgradeOptions {
    /// Explicit target version; the latest release when unset.
    pub target: Option<String>,
    /// Report the plan without changing anything.
    pub dry_run: bool,
    /// Skip the breaking-change confirmation prompt.
    pub force: bool,
}

/// Data gathered while the state machine advances.
#[derive(Default)]
struct Run {
    project: Option<ProjectContext>,
    installed: String,
    target: String,
    downgrade: bool,
    plan: Option<UpgradePlan>,
}

impl Run {
    fn project(&self) -> Result<&ProjectContext> {
        self.project
            .as_ref()
            .ok_or_else(|| StackError::Other("upgrade project not loaded".to_string()))
    }

    fn plan(&self) -> Result<&UpgradePlan> {
        self.plan
            .as_ref()
            .ok_or_else(|| StackError::Other("upgrade plan not built".to_string()))
    }
}

enum Transition {
    Next(UpgradeState),
    Done(UpgradeOutcome),
}

/// Upgrades one project to a target release.
pub struct Upgrader {
    engine: Arc<dyn ComposeEngine>,
    resolver: ReleaseResolver,
    analyzer: CompatibilityAnalyzer,
    detector: ModeDetector,
    confirm: Arc<dyn Confirm>,
    vcs: Arc<dyn Vcs>,
    health: HealthSettings,
    events: Option<mpsc::Sender<UpgradeEvent>>,
}

impl Upgrader {
    /// Create an upgrader with the stdin prompt and git status check.
    pub fn new(
        engine: Arc<dyn ComposeEngine>,
        resolver: ReleaseResolver,
        analyzer: CompatibilityAnalyzer,
    ) -> Self {
        Self {
            detector: ModeDetector::new(engine.clone()),
            engine,
            resolver,
            analyzer,
            confirm: Arc::new(StdinConfirm),
            vcs: Arc::new(GitCli),
            health: HealthSettings::default(),
            events: None,
        }
    }

    pub fn with_confirm(mut self, confirm: Arc<dyn Confirm>) -> Self {
        self.confirm = confirm;
        self
    }

    pub fn with_vcs(mut self, vcs: Arc<dyn Vcs>) -> Self {
        self.vcs = vcs;
        self
    }

    pub fn with_detector(mut self, detector: ModeDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_health_settings(mut self, health: HealthSettings) -> Self {
        self.health = health;
        self
    }

    /// Send progress events to `tx`.
    pub fn with_events(mut self, tx: mpsc::Sender<UpgradeEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Run the upgrade to a terminal state.
    ///
    /// Errors before `Executing` are returned as `Err`; a failing step during
    /// execution is reported as [`UpgradeOutcome::Failed`].
    pub async fn run(&self, project_dir: &Path, options: &UpgradeOptions) -> Result<UpgradeOutcome> {
        let mut state = UpgradeState::Init;
        let mut run = Run::default();

        loop {
            debug!("Upgrade state: {}", state);
            self.emit(UpgradeEvent::StateEntered(state)).await;

            match self.advance(state, project_dir, options, &mut run).await? {
                Transition::Next(next) => state = next,
                Transition::Done(outcome) => {
                    debug!("Upgrade finished in state {}", outcome.state());
                    self.emit(UpgradeEvent::StateEntered(outcome.state())).await;
                    return Ok(outcome);
                }
            }
        }
    }

    async fn advance(
        &self,
        state: UpgradeState,
        project_dir: &Path,
        options: &UpgradeOptions,
        run: &mut Run,
    ) -> Result<Transition> {
        match state {
            UpgradeState::Init => self.init(project_dir, options, run).await,
            UpgradeState::VersionResolution => self.resolve_target(options, run).await,
            UpgradeState::CompatibilityCheck => self.check_compatibility(options, run).await,
            UpgradeState::ConfirmationGate => self.confirmation_gate(options, run).await,
            UpgradeState::Executing => self.execute(run).await.map(Transition::Done),
            terminal => Err(StackError::Other(format!(
                "upgrade cannot advance from terminal state {}",
                terminal
            ))),
        }
    }

    async fn init(
        &self,
        project_dir: &Path,
        options: &UpgradeOptions,
        run: &mut Run,
    ) -> Result<Transition> {
        let offline;
        let detector = if options.dry_run {
            offline = ModeDetector::offline();
            &offline
        } else {
            &self.detector
        };
        let project = ProjectContext::load(project_dir, detector).await?;
        project.require_scaffolded()?;

        let installed = project
            .installed_version
            .as_deref()
            .map(normalize_version)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| StackError::Config {
                message: format!(
                    "{} is not set in {}",
                    ProjectConfig::VERSION_ENV_KEY,
                    env_path(project_dir).display()
                ),
            })?;

        info!("Installed version {} ({} mode)", installed, project.mode);
        run.installed = installed;
        run.project = Some(project);
        Ok(Transition::Next(UpgradeState::VersionResolution))
    }

    async fn resolve_target(&self, options: &UpgradeOptions, run: &mut Run) -> Result<Transition> {
        let requested = options.target.as_deref().unwrap_or(NetworkConfig::LATEST);
        let target = self.resolver.resolve(requested).await?;

        let installed_version = parse_version(&run.installed)?;
        let target_version = parse_version(&target)?;

        if target_version == installed_version {
            info!("Already at {}", target);
            return Ok(Transition::Done(UpgradeOutcome::AlreadyCurrent { version: target }));
        }
        if target_version < installed_version {
            let message = format!(
                "Target {} is older than the installed {}; proceeding with a downgrade",
                target, run.installed
            );
            warn!("{}", message);
            self.emit(UpgradeEvent::Warning { message }).await;
            run.downgrade = true;
        }

        run.target = target;
        Ok(Transition::Next(UpgradeState::CompatibilityCheck))
    }

    async fn check_compatibility(&self, options: &UpgradeOptions, run: &mut Run) -> Result<Transition> {
        let check = self.analyzer.check(&run.installed, &run.target).await?;
        for warning in &check.warnings {
            info!("Compatibility: {}", warning);
        }

        let mode = run.project()?.mode;
        let plan = UpgradePlan {
            from_version: run.installed.clone(),
            to_version: run.target.clone(),
            mode,
            downgrade: run.downgrade,
            steps: strategy_for(mode).steps(),
            compatibility: check,
        };

        if options.dry_run {
            info!("Dry run: {} steps planned, nothing executed", plan.steps.len());
            return Ok(Transition::Done(UpgradeOutcome::DryRun { plan }));
        }

        run.plan = Some(plan);
        Ok(Transition::Next(UpgradeState::ConfirmationGate))
    }

    async fn confirmation_gate(&self, options: &UpgradeOptions, run: &mut Run) -> Result<Transition> {
        let plan = run.plan()?;
        if !plan.compatibility.breaking {
            return Ok(Transition::Next(UpgradeState::Executing));
        }

        if options.force {
            warn!("Breaking changes present; confirmation bypassed by --force");
            self.emit(UpgradeEvent::ConfirmationBypassed).await;
            return Ok(Transition::Next(UpgradeState::Executing));
        }

        let question = format!(
            "{}\nUpgrade {} -> {} anyway?",
            format_warnings(&plan.compatibility).trim_end(),
            plan.from_version,
            plan.to_version
        );
        if self.confirm.confirm(&question).await? {
            Ok(Transition::Next(UpgradeState::Executing))
        } else {
            info!("Upgrade declined");
            Ok(Transition::Done(UpgradeOutcome::Cancelled { plan: plan.clone() }))
        }
    }

    async fn execute(&self, run: &Run) -> Result<UpgradeOutcome> {
        let plan = run.plan()?.clone();
        let project_dir = run.project()?.dir.clone();
        let strategy = strategy_for(plan.mode);
        let compose = ComposeProject::new(&project_dir)
            .with_env(ProjectConfig::VERSION_ENV_KEY, &plan.to_version);

        if strategy.frontend_is_external() {
            self.warn_uncommitted_frontend(&project_dir).await;
        }

        let mut services: Option<Vec<String>> = None;
        let steps = plan.steps.clone();
        let total = steps.len();
        for (index, step) in steps.into_iter().enumerate() {
            info!("[{}/{}] {}", index + 1, total, step);
            self.emit(UpgradeEvent::StepStarted { index, total, step }).await;

            if let Err(e) = self
                .execute_step(step, &compose, &plan, &mut services)
                .await
            {
                error!("Step '{}' failed: {}", step, e);
                let restart = match plan.mode {
                    DeploymentMode::Standard => Vec::new(),
                    DeploymentMode::AppDev => backend_of(services.as_deref().unwrap_or_default()),
                };
                let rollback = RollbackInstructions::new(
                    step.to_string(),
                    &project_dir,
                    &plan.from_version,
                    &restart,
                );
                return Ok(UpgradeOutcome::Failed {
                    error: e.to_string(),
                    step,
                    rollback,
                    plan,
                });
            }

            self.emit(UpgradeEvent::StepCompleted { index, total, step }).await;
        }

        let manual_update = strategy.frontend_is_external().then(|| {
            ManualUpdateHint::for_frontend(&project_dir.join(PathsConfig::FRONTEND_DIR), &plan.to_version)
        });
        let release_notes_url = self.resolver.source().release_notes_url(&plan.to_version);
        info!("Upgraded to {}", plan.to_version);

        Ok(UpgradeOutcome::Success {
            plan,
            release_notes_url,
            manual_update,
        })
    }

    async fn execute_step(
        &self,
        step: UpgradeStep,
        compose: &ComposeProject,
        plan: &UpgradePlan,
        services: &mut Option<Vec<String>>,
    ) -> Result<()> {
        match step {
            UpgradeStep::StopServices(scope) => {
                let targets = self.targets(scope, compose, services).await?;
                self.engine.stop(compose, &targets).await
            }
            UpgradeStep::PullImages(scope) => {
                let targets = self.targets(scope, compose, services).await?;
                self.engine.pull(compose, &targets).await
            }
            UpgradeStep::BuildFrontend => {
                self.engine
                    .build(compose, &[ProjectConfig::FRONTEND_SERVICE.to_string()])
                    .await
            }
            UpgradeStep::StartServices(scope) => {
                let targets = self.targets(scope, compose, services).await?;
                self.engine.up(compose, &targets).await
            }
            UpgradeStep::WaitHealthy(scope) => {
                let all = self.list_services(compose, services).await?;
                let watched = match scope {
                    ServiceScope::All => all,
                    ServiceScope::Backend => backend_of(&all),
                };
                wait_until_healthy(self.engine.as_ref(), compose, &watched, self.health).await
            }
            UpgradeStep::WriteVersionMarker => write_version_marker(compose.dir(), &plan.to_version),
            UpgradeStep::WriteFrontendPin => {
                if !write_client_pin(compose.dir(), &plan.to_version)? {
                    warn!(
                        "{} is not pinned in the frontend manifest; left unchanged",
                        ProjectConfig::CLIENT_PACKAGE
                    );
                }
                Ok(())
            }
        }
    }

    /// Service arguments for an engine command. `All` is passed as an empty
    /// list; `Backend` is resolved against the compose file.
    async fn targets(
        &self,
        scope: ServiceScope,
        compose: &ComposeProject,
        services: &mut Option<Vec<String>>,
    ) -> Result<Vec<String>> {
        match scope {
            ServiceScope::All => Ok(Vec::new()),
            ServiceScope::Backend => {
                let backend = backend_of(&self.list_services(compose, services).await?);
                if backend.is_empty() {
                    return Err(StackError::Other(
                        "the compose file declares no backend services".to_string(),
                    ));
                }
                Ok(backend)
            }
        }
    }

    async fn list_services(
        &self,
        compose: &ComposeProject,
        services: &mut Option<Vec<String>>,
    ) -> Result<Vec<String>> {
        if let Some(known) = services {
            return Ok(known.clone());
        }
        let listed = self.engine.list_services(compose).await?;
        *services = Some(listed.clone());
        Ok(listed)
    }

    async fn warn_uncommitted_frontend(&self, project_dir: &Path) {
        match self
            .vcs
            .has_uncommitted_changes(project_dir, Path::new(PathsConfig::FRONTEND_DIR))
            .await
        {
            Ok(true) => {
                let message = format!(
                    "{}/ has uncommitted changes; commit or stash them before updating {}",
                    PathsConfig::FRONTEND_DIR,
                    ProjectConfig::CLIENT_PACKAGE
                );
                warn!("{}", message);
                self.emit(UpgradeEvent::Warning { message }).await;
            }
            Ok(false) => {}
            Err(e) => debug!("Skipping uncommitted-change check: {}", e),
        }
    }

    async fn emit(&self, event: UpgradeEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event).await;
        }
    }
}

fn backend_of(services: &[String]) -> Vec<String> {
    services
        .iter()
        .filter(|s| s.as_str() != ProjectConfig::FRONTEND_SERVICE)
        .cloned()
        .collect()
}
