//! npm-style version ranges.
//!
//! Manifests are authored with the range grammar JavaScript tooling uses
//! (`>=0.7.0 <0.8.0`, `^1.2`, `1.0.0 - 1.2.0`, `a || b`). Each alternative is
//! rewritten into a [`semver::VersionReq`], whose comparators are otherwise
//! compatible. The one semantic difference is a bare version, which npm reads
//! as an exact match and Cargo as a caret range; bare versions get an
//! explicit `=`.

use crate::error::{Result, StackError};
use semver::{Version, VersionReq};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

const OPERATOR_CHARS: &[char] = &['<', '>', '=', '~', '^'];

/// A parsed range: matches when any alternative matches.
#[derive(Debug, Clone)]
pub struct VersionRange {
    raw: String,
    alternatives: Vec<VersionReq>,
}

impl VersionRange {
    /// Parse an npm-style range.
    pub fn parse(range: &str) -> Result<Self> {
        let invalid = |message: String| StackError::InvalidRange {
            range: range.to_string(),
            message,
        };

        if range.trim().is_empty() {
            return Err(invalid("range is empty".to_string()));
        }

        let mut alternatives = Vec::new();
        for alternative in range.split("||") {
            let normalized = normalize_alternative(alternative).map_err(&invalid)?;
            let req = VersionReq::parse(&normalized)
                .map_err(|e| invalid(format!("{} (as '{}')", e, normalized)))?;
            alternatives.push(req);
        }

        Ok(Self {
            raw: range.trim().to_string(),
            alternatives,
        })
    }

    /// Whether `version` falls inside the range.
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }

    /// The range as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for VersionRange {
    type Err = StackError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Test `version` against a range string.
///
/// A malformed range is logged and never matches.
pub fn satisfies(version: &Version, range: &str) -> bool {
    match VersionRange::parse(range) {
        Ok(parsed) => parsed.matches(version),
        Err(e) => {
            warn!("{}; treating as not matching", e);
            false
        }
    }
}

/// Rewrite one `||` alternative into `VersionReq` syntax.
fn normalize_alternative(alternative: &str) -> std::result::Result<String, String> {
    let tokens: Vec<&str> = alternative.split_whitespace().collect();
    if tokens.is_empty() {
        return Err("empty alternative".to_string());
    }

    // Hyphen range: `A - B` is inclusive on both ends.
    if tokens.len() == 3 && tokens[1] == "-" {
        return Ok(format!(
            ">={}, <={}",
            strip_v(tokens[0]),
            strip_v(tokens[2])
        ));
    }

    let mut comparators = Vec::new();
    let mut pending_op: Option<&str> = None;
    for token in tokens {
        if token.chars().all(|c| OPERATOR_CHARS.contains(&c)) {
            if pending_op.is_some() {
                return Err(format!("dangling operator before '{}'", token));
            }
            pending_op = Some(token);
            continue;
        }

        let comparator = match pending_op.take() {
            Some(op) => format!("{}{}", op, token),
            None => token.to_string(),
        };
        comparators.push(normalize_comparator(&comparator));
    }

    if let Some(op) = pending_op {
        return Err(format!("operator '{}' without a version", op));
    }
    Ok(comparators.join(", "))
}

fn normalize_comparator(comparator: &str) -> String {
    let split = comparator
        .find(|c: char| !OPERATOR_CHARS.contains(&c))
        .unwrap_or(comparator.len());
    let (op, version) = comparator.split_at(split);
    let version = strip_v(version);

    if !op.is_empty() || is_wildcard(version) {
        format!("{}{}", op, version)
    } else {
        format!("={}", version)
    }
}

fn strip_v(version: &str) -> &str {
    version
        .strip_prefix('v')
        .or_else(|| version.strip_prefix('V'))
        .unwrap_or(version)
}

fn is_wildcard(version: &str) -> bool {
    version
        .split('.')
        .any(|part| matches!(part, "*" | "x" | "X"))
}
