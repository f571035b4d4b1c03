//! Breaking-change detection for upgrades.

mod analyzer;
mod range;

pub use analyzer::{format_warnings, CompatibilityAnalyzer, CompatibilityCheck, BREAKING_WARNING};
pub use range::{satisfies, VersionRange};
