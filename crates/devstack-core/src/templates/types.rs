//! Template manifest types.

use crate::error::{Result, StackError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Per-release list of distributable project templates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateManifest {
    pub version: String,
    #[serde(default)]
    pub templates: Vec<TemplateEntry>,
}

/// One template archive published with a release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Archive file name of the release asset.
    pub file: String,
    /// Archive size in bytes.
    #[serde(default)]
    pub size: u64,
    /// `sha256:<hex>` digest of the archive.
    pub checksum: String,
    #[serde(default)]
    pub frameworks: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
}

impl TemplateManifest {
    const DOCUMENT: &'static str = "template manifest";

    /// Parse and validate a manifest from raw JSON.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let manifest: TemplateManifest = serde_json::from_slice(bytes)
            .map_err(|e| StackError::schema(Self::DOCUMENT, e.to_string()))?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(StackError::schema(Self::DOCUMENT, "`version` is empty"));
        }
        for template in &self.templates {
            if template.name.trim().is_empty() {
                return Err(StackError::schema(Self::DOCUMENT, "template without a name"));
            }
            if template.file.trim().is_empty() || template.checksum.trim().is_empty() {
                return Err(StackError::schema(
                    Self::DOCUMENT,
                    format!("template '{}' is missing `file` or `checksum`", template.name),
                ));
            }
        }
        Ok(())
    }

    /// Look up a template by name.
    pub fn find(&self, name: &str) -> Option<&TemplateEntry> {
        self.templates.iter().find(|t| t.name == name)
    }

    /// Names of every template, in manifest order.
    pub fn names(&self) -> Vec<String> {
        self.templates.iter().map(|t| t.name.clone()).collect()
    }
}

/// Result of a successful template download.
#[derive(Debug, Clone)]
pub struct InstalledTemplate {
    pub name: String,
    pub version: String,
    /// Verified archive in the cache.
    pub archive_path: PathBuf,
    /// Directory the template was extracted into.
    pub target_dir: PathBuf,
    /// Whether the archive came from the cache.
    pub from_cache: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &[u8] = br#"{
        "version": "0.8.0",
        "templates": [
            {
                "name": "react",
                "description": "React + Vite",
                "file": "react-template.tar.gz",
                "size": 1024,
                "checksum": "sha256:00",
                "frameworks": ["react"],
                "features": ["auth", "storage"]
            },
            { "name": "vue", "file": "vue-template.zip", "checksum": "sha256:11" }
        ]
    }"#;

    #[test]
    fn test_parse_and_find() {
        let manifest = TemplateManifest::from_slice(MANIFEST).unwrap();
        assert_eq!(manifest.names(), vec!["react", "vue"]);
        let react = manifest.find("react").unwrap();
        assert_eq!(react.size, 1024);
        assert_eq!(react.features, vec!["auth", "storage"]);
        assert!(manifest.find("svelte").is_none());
    }

    #[test]
    fn test_template_without_checksum_rejected() {
        let err = TemplateManifest::from_slice(
            br#"{"version":"1.0.0","templates":[{"name":"x","file":"x.zip","checksum":""}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, StackError::SchemaInvalid { .. }));
    }
}
