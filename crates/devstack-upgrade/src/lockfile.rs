//! Frontend package manager detection.
//!
//! In app-dev mode the developer updates the client package with their own
//! tooling; the lock file tells us which command to suggest.

use devstack_core::config::ProjectConfig;
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Package manager inferred from the frontend lock file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LockFile {
    Bun,
    Pnpm,
    Yarn,
    Npm,
}

impl LockFile {
    /// Lock file names in detection order.
    const SIGNATURES: &'static [(&'static str, LockFile)] = &[
        ("bun.lockb", LockFile::Bun),
        ("bun.lock", LockFile::Bun),
        ("pnpm-lock.yaml", LockFile::Pnpm),
        ("yarn.lock", LockFile::Yarn),
        ("package-lock.json", LockFile::Npm),
    ];

    /// Detect the package manager of `frontend_dir`, falling back to npm.
    pub fn detect(frontend_dir: &Path) -> LockFile {
        Self::SIGNATURES
            .iter()
            .find(|(name, _)| frontend_dir.join(name).is_file())
            .map(|(_, lock)| *lock)
            .unwrap_or(LockFile::Npm)
    }

    /// Command that pins the client package to `version`.
    pub fn update_command(&self, version: &str) -> String {
        let package = format!("{}@{}", ProjectConfig::CLIENT_PACKAGE, version);
        match self {
            LockFile::Bun => format!("bun add {}", package),
            LockFile::Pnpm => format!("pnpm add {}", package),
            LockFile::Yarn => format!("yarn add {}", package),
            LockFile::Npm => format!("npm install {}", package),
        }
    }

    /// Command that restarts the local dev server.
    pub fn restart_hint(&self) -> &'static str {
        match self {
            LockFile::Bun => "bun run dev",
            LockFile::Pnpm => "pnpm dev",
            LockFile::Yarn => "yarn dev",
            LockFile::Npm => "npm run dev",
        }
    }
}

impl fmt::Display for LockFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LockFile::Bun => "bun",
            LockFile::Pnpm => "pnpm",
            LockFile::Yarn => "yarn",
            LockFile::Npm => "npm",
        })
    }
}

/// What the developer has to run after an app-dev upgrade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManualUpdateHint {
    pub package_manager: LockFile,
    pub update_command: String,
    pub restart_hint: String,
}

impl ManualUpdateHint {
    pub fn for_frontend(frontend_dir: &Path, version: &str) -> Self {
        let lock = LockFile::detect(frontend_dir);
        Self {
            package_manager: lock,
            update_command: lock.update_command(version),
            restart_hint: lock.restart_hint().to_string(),
        }
    }
}
