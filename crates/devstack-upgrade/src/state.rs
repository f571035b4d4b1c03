//! Upgrade states, outcomes and progress events.

use crate::lockfile::ManualUpdateHint;
use crate::plan::{UpgradePlan, UpgradeStep};
use crate::rollback::RollbackInstructions;
use serde::Serialize;
use std::fmt;

/// States of one upgrade run.
///
/// `Init → VersionResolution → {AlreadyCurrent | CompatibilityCheck} →
/// {DryRunReport | ConfirmationGate} → {Cancelled | Executing} →
/// {Success | Failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UpgradeState {
    Init,
    VersionResolution,
    CompatibilityCheck,
    ConfirmationGate,
    Executing,
    AlreadyCurrent,
    DryRunReport,
    Cancelled,
    Success,
    Failed,
}

impl UpgradeState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UpgradeState::AlreadyCurrent
                | UpgradeState::DryRunReport
                | UpgradeState::Cancelled
                | UpgradeState::Success
                | UpgradeState::Failed
        )
    }
}

impl fmt::Display for UpgradeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UpgradeState::Init => "init",
            UpgradeState::VersionResolution => "version-resolution",
            UpgradeState::CompatibilityCheck => "compatibility-check",
            UpgradeState::ConfirmationGate => "confirmation-gate",
            UpgradeState::Executing => "executing",
            UpgradeState::AlreadyCurrent => "already-current",
            UpgradeState::DryRunReport => "dry-run-report",
            UpgradeState::Cancelled => "cancelled",
            UpgradeState::Success => "success",
            UpgradeState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Progress update sent through the optional event channel.
#[derive(Debug, Clone)]
pub enum UpgradeEvent {
    /// The state machine entered a state.
    StateEntered(UpgradeState),
    /// A step is about to run.
    StepStarted {
        index: usize,
        total: usize,
        step: UpgradeStep,
    },
    /// A step finished successfully.
    StepCompleted {
        index: usize,
        total: usize,
        step: UpgradeStep,
    },
    /// Something the operator should know about; the run continues.
    Warning { message: String },
    /// `--force` skipped the confirmation prompt.
    ConfirmationBypassed,
}

/// Terminal result of an upgrade run.
#[derive(Debug, Clone)]
pub enum UpgradeOutcome {
    AlreadyCurrent {
        version: String,
    },
    DryRun {
        plan: UpgradePlan,
    },
    Cancelled {
        plan: UpgradePlan,
    },
    Success {
        plan: UpgradePlan,
        release_notes_url: String,
        /// Set in app-dev mode, where the frontend is updated by hand.
        manual_update: Option<ManualUpdateHint>,
    },
    Failed {
        plan: UpgradePlan,
        step: UpgradeStep,
        error: String,
        rollback: RollbackInstructions,
    },
}

impl UpgradeOutcome {
    /// Terminal state this outcome corresponds to.
    pub fn state(&self) -> UpgradeState {
        match self {
            UpgradeOutcome::AlreadyCurrent { .. } => UpgradeState::AlreadyCurrent,
            UpgradeOutcome::DryRun { .. } => UpgradeState::DryRunReport,
            UpgradeOutcome::Cancelled { .. } => UpgradeState::Cancelled,
            UpgradeOutcome::Success { .. } => UpgradeState::Success,
            UpgradeOutcome::Failed { .. } => UpgradeState::Failed,
        }
    }

    /// Process exit code: 0 success, 2 cancelled, 1 failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            UpgradeOutcome::AlreadyCurrent { .. }
            | UpgradeOutcome::DryRun { .. }
            | UpgradeOutcome::Success { .. } => 0,
            UpgradeOutcome::Cancelled { .. } => 2,
            UpgradeOutcome::Failed { .. } => 1,
        }
    }

    pub fn plan(&self) -> Option<&UpgradePlan> {
        match self {
            UpgradeOutcome::AlreadyCurrent { .. } => None,
            UpgradeOutcome::DryRun { plan }
            | UpgradeOutcome::Cancelled { plan }
            | UpgradeOutcome::Success { plan, .. }
            | UpgradeOutcome::Failed { plan, .. } => Some(plan),
        }
    }
}
