//! Compatibility analysis between an installed and a target version.

use super::range::satisfies;
use crate::manifest::{BreakingChange, FetchOptions, ManifestFetcher};
use crate::version::{normalize_version, parse_version};
use crate::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Generic warning placed first when any breaking change applies.
pub const BREAKING_WARNING: &str = "This upgrade contains breaking changes";

/// Outcome of comparing an installed version against a target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompatibilityCheck {
    pub from_version: String,
    pub to_version: String,
    pub breaking: bool,
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migration_notes: Option<String>,
    #[serde(default)]
    pub required_actions: Vec<String>,
    /// Breaking changes whose range contains `from_version`.
    #[serde(default)]
    pub relevant_changes: Vec<BreakingChange>,
}

impl CompatibilityCheck {
    fn no_manifest(from: String, to: String) -> Self {
        let warning = format!("No compatibility manifest found for version {}", to);
        Self {
            from_version: from,
            to_version: to,
            breaking: false,
            warnings: vec![warning],
            migration_notes: None,
            required_actions: Vec::new(),
            relevant_changes: Vec::new(),
        }
    }
}

/// Classifies upgrades using the target release's compatibility manifest.
#[derive(Debug, Clone)]
pub struct CompatibilityAnalyzer {
    fetcher: ManifestFetcher,
    options: FetchOptions,
}

impl CompatibilityAnalyzer {
    pub fn new(fetcher: ManifestFetcher) -> Self {
        Self {
            fetcher,
            options: FetchOptions::default(),
        }
    }

    /// Override the options used for manifest fetches.
    pub fn with_fetch_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    /// Compare `from` (installed) against `to` (target).
    ///
    /// A missing manifest is folded into a warning. Transfer and validation
    /// failures are returned to the caller.
    pub async fn check(&self, from: &str, to: &str) -> Result<CompatibilityCheck> {
        let from = normalize_version(from);
        let to = normalize_version(to);

        let Some(manifest) = self.fetcher.fetch(&to, self.options.clone()).await? else {
            info!("No compatibility manifest for {}", to);
            return Ok(CompatibilityCheck::no_manifest(from, to));
        };

        let installed = parse_version(&from)?;
        let relevant_changes: Vec<BreakingChange> = manifest
            .breaking_changes
            .iter()
            .filter(|change| satisfies(&installed, &change.affected_versions))
            .cloned()
            .collect();

        let breaking = !relevant_changes.is_empty();
        let mut warnings = Vec::new();
        if breaking {
            warnings.push(BREAKING_WARNING.to_string());
            warnings.extend(relevant_changes.iter().map(change_warning));
            if let Some(notes) = &manifest.migration_notes {
                warnings.push(format!("Migration guide: {}", notes));
            }
        }

        debug!(
            "{} -> {}: {} of {} breaking changes apply",
            from,
            to,
            relevant_changes.len(),
            manifest.breaking_changes.len()
        );

        Ok(CompatibilityCheck {
            from_version: from,
            to_version: to,
            breaking,
            warnings,
            migration_notes: manifest.migration_notes,
            required_actions: manifest.required_actions,
            relevant_changes,
        })
    }

    /// Check an upgrade that may skip intermediate releases.
    ///
    /// Only the target manifest is consulted; its ranges are expected to
    /// cover every installed version an upgrade can start from.
    pub async fn check_multi_hop(&self, from: &str, to: &str) -> Result<CompatibilityCheck> {
        debug!("Multi-hop check {} -> {} uses the target manifest only", from, to);
        self.check(from, to).await
    }
}

fn change_warning(change: &BreakingChange) -> String {
    match &change.category {
        Some(category) => format!(
            "[{}] {} (mitigation: {})",
            category, change.description, change.mitigation
        ),
        None => format!("{} (mitigation: {})", change.description, change.mitigation),
    }
}

/// Render warnings and required actions for display.
pub fn format_warnings(check: &CompatibilityCheck) -> String {
    let mut out = String::new();
    for warning in &check.warnings {
        out.push_str("  ! ");
        out.push_str(warning);
        out.push('\n');
    }

    if !check.required_actions.is_empty() {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("Required manual actions:\n");
        for action in &check.required_actions {
            out.push_str("  - ");
            out.push_str(action);
            out.push('\n');
        }
    }
    out
}
