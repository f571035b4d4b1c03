//! Versioned project templates published alongside each release.

mod distributor;
mod types;

pub use distributor::TemplateDistributor;
pub use types::{InstalledTemplate, TemplateEntry, TemplateManifest};
