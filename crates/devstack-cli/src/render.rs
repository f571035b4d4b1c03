//! Terminal output for upgrade progress and outcomes.

use devstack_upgrade::{UpgradeEvent, UpgradeOutcome};
use tokio::sync::mpsc;
use tracing::debug;

/// Print progress events until the sender side is dropped.
pub async fn print_events(mut rx: mpsc::Receiver<UpgradeEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            UpgradeEvent::StateEntered(state) => debug!("-> {}", state),
            UpgradeEvent::StepStarted { index, total, step } => {
                eprintln!("[{}/{}] {}...", index + 1, total, step);
            }
            UpgradeEvent::StepCompleted { .. } => {}
            UpgradeEvent::Warning { message } => eprintln!("warning: {}", message),
            UpgradeEvent::ConfirmationBypassed => {
                eprintln!("warning: breaking changes acknowledged with --force")
            }
        }
    }
}

pub fn outcome(outcome: &UpgradeOutcome) -> String {
    match outcome {
        UpgradeOutcome::AlreadyCurrent { version } => {
            format!("Already at {}; nothing to do.\n", version)
        }
        UpgradeOutcome::DryRun { plan } => {
            format!("{}\nDry run: no changes were made.\n", plan.render())
        }
        UpgradeOutcome::Cancelled { plan } => format!(
            "Upgrade {} -> {} cancelled. Nothing was changed.\n",
            plan.from_version, plan.to_version
        ),
        UpgradeOutcome::Success {
            plan,
            release_notes_url,
            manual_update,
        } => {
            let mut out = format!(
                "Upgraded {} -> {}.\nRelease notes: {}\n",
                plan.from_version, plan.to_version, release_notes_url
            );
            if let Some(hint) = manual_update {
                out.push_str(&format!(
                    "\nThe frontend runs outside the stack ({}). Update the client yourself:\n  {}\nthen restart it:\n  {}\n",
                    hint.package_manager, hint.update_command, hint.restart_hint
                ));
            }
            out
        }
        UpgradeOutcome::Failed {
            error, rollback, ..
        } => format!("Upgrade failed: {}\n\n{}", error, rollback.render()),
    }
}

/// Human-readable byte count.
pub fn size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size() {
        assert_eq!(size(512), "512 B");
        assert_eq!(size(1536), "1.5 KiB");
        assert_eq!(size(5 * 1024 * 1024), "5.0 MiB");
    }

    #[test]
    fn test_already_current() {
        let text = outcome(&UpgradeOutcome::AlreadyCurrent {
            version: "0.8.0".into(),
        });
        assert!(text.contains("Already at 0.8.0"));
    }
}
