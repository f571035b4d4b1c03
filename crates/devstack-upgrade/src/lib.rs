//! Mode-aware upgrades for devstack projects.
//!
//! [`Upgrader`] moves a scaffolded project from its installed release to a
//! target release. The deployment mode picks the [`UpgradeStrategy`]: the
//! standard mode rebuilds the containerized frontend, while app-dev mode
//! leaves the developer's local frontend alone and only prints how to update
//! the client package.
//!
//! ```rust,ignore
//! use devstack_upgrade::{UpgradeOptions, Upgrader};
//!
//! let outcome = upgrader
//!     .run(project_dir, &UpgradeOptions { dry_run: true, ..Default::default() })
//!     .await?;
//! std::process::exit(outcome.exit_code());
//! ```

pub mod health;
pub mod lockfile;
pub mod orchestrator;
pub mod plan;
pub mod prompt;
pub mod rollback;
pub mod state;
pub mod strategy;
pub mod vcs;

pub use health::{wait_until_healthy, HealthSettings};
pub use lockfile::{LockFile, ManualUpdateHint};
pub use orchestrator::{UpgradeOptions, Upgrader};
pub use plan::{ServiceScope, UpgradePlan, UpgradeStep};
pub use prompt::{Confirm, StdinConfirm};
pub use rollback::RollbackInstructions;
pub use state::{UpgradeEvent, UpgradeOutcome, UpgradeState};
pub use strategy::{strategy_for, AppDevStrategy, StandardStrategy, UpgradeStrategy};
pub use vcs::{GitCli, Vcs};
