//! Version string normalization.
//!
//! Release tags carry a `v` prefix while cache keys, markers and manifests
//! use the bare version. Everything entering the crate goes through
//! [`normalize_version`] first.

use crate::error::{Result, StackError};
use semver::Version;

/// Strip whitespace and a single leading `v`/`V`.
pub fn normalize_version(version: &str) -> String {
    let trimmed = version.trim();
    trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed)
        .to_string()
}

/// Parse a version leniently: `v` prefixes are dropped and missing minor or
/// patch components are filled with zero (`1.2` → `1.2.0`).
pub fn parse_version(version: &str) -> Result<Version> {
    let normalized = normalize_version(version);
    if let Ok(parsed) = Version::parse(&normalized) {
        return Ok(parsed);
    }

    let (core, rest) = match normalized.find(['-', '+']) {
        Some(idx) => normalized.split_at(idx),
        None => (normalized.as_str(), ""),
    };
    let parts: Vec<&str> = core.split('.').collect();
    if parts.is_empty() || parts.len() > 3 || parts.iter().any(|p| p.is_empty()) {
        return Err(StackError::InvalidVersion {
            version: version.to_string(),
        });
    }

    let mut padded: Vec<&str> = parts.clone();
    while padded.len() < 3 {
        padded.push("0");
    }

    Version::parse(&format!("{}{}", padded.join("."), rest)).map_err(|_| {
        StackError::InvalidVersion {
            version: version.to_string(),
        }
    })
}

/// Sort version strings by semantic version; unparseable entries sort last
/// in lexical order.
pub fn sort_versions(versions: &mut [String]) {
    versions.sort_by(|a, b| match (parse_version(a), parse_version(b)) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        (Ok(_), Err(_)) => std::cmp::Ordering::Less,
        (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    });
}
