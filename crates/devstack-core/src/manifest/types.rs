//! Compatibility manifest types.

use crate::error::{Result, StackError};
use serde::{Deserialize, Serialize};

/// Per-release document declaring breaking changes and manual actions for
/// upgrading *into* that release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompatibilityManifest {
    pub version: String,
    pub storage_format_version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub breaking_changes: Vec<BreakingChange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migration_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_actions: Vec<String>,
}

/// One declared incompatibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakingChange {
    /// Semantic-version range of *installed* versions this change affects.
    pub affected_versions: String,
    pub description: String,
    pub mitigation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl CompatibilityManifest {
    const DOCUMENT: &'static str = "compatibility manifest";

    /// Parse and validate a manifest from raw JSON.
    ///
    /// `storageFormatVersion` is accepted as a JSON string or number.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let mut value: serde_json::Value = serde_json::from_slice(bytes)
            .map_err(|e| StackError::schema(Self::DOCUMENT, format!("not valid JSON: {}", e)))?;

        let object = value
            .as_object_mut()
            .ok_or_else(|| StackError::schema(Self::DOCUMENT, "expected a JSON object"))?;

        if let Some(number) = object
            .get("storageFormatVersion")
            .filter(|v| v.is_number())
            .map(|v| v.to_string())
        {
            object.insert("storageFormatVersion".to_string(), number.into());
        }

        let manifest: CompatibilityManifest = serde_json::from_value(value)
            .map_err(|e| StackError::schema(Self::DOCUMENT, e.to_string()))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Check the fields every manifest must carry.
    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(StackError::schema(Self::DOCUMENT, "`version` is empty"));
        }
        if self.storage_format_version.trim().is_empty() {
            return Err(StackError::schema(
                Self::DOCUMENT,
                "`storageFormatVersion` is empty",
            ));
        }
        for (idx, change) in self.breaking_changes.iter().enumerate() {
            if change.affected_versions.trim().is_empty() {
                return Err(StackError::schema(
                    Self::DOCUMENT,
                    format!("breakingChanges[{}].affectedVersions is empty", idx),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_manifest() {
        let manifest = CompatibilityManifest::from_slice(
            br#"{
                "version": "0.8.0",
                "storageFormatVersion": "3",
                "breakingChanges": [{
                    "affectedVersions": ">=0.7.0 <0.8.0",
                    "description": "Auth tokens moved to a new table",
                    "mitigation": "Re-issue API keys after upgrading",
                    "category": "auth"
                }],
                "migrationNotes": "https://example.com/migrate/0.8",
                "requiredActions": ["Rotate API keys"]
            }"#,
        )
        .unwrap();

        assert_eq!(manifest.version, "0.8.0");
        assert_eq!(manifest.breaking_changes.len(), 1);
        assert_eq!(manifest.breaking_changes[0].category.as_deref(), Some("auth"));
        assert_eq!(manifest.required_actions, vec!["Rotate API keys"]);
    }

    #[test]
    fn test_optional_fields_default() {
        let manifest =
            CompatibilityManifest::from_slice(br#"{"version":"1.0.0","storageFormatVersion":2}"#)
                .unwrap();
        assert_eq!(manifest.storage_format_version, "2");
        assert!(manifest.breaking_changes.is_empty());
        assert!(manifest.migration_notes.is_none());
    }

    #[test]
    fn test_missing_required_fields_rejected() {
        for raw in [
            &br#"{"storageFormatVersion":"1"}"#[..],
            br#"{"version":"1.0.0"}"#,
            br#"{"version":"","storageFormatVersion":"1"}"#,
            br#"[1,2,3]"#,
            br#"{not json"#,
        ] {
            let err = CompatibilityManifest::from_slice(raw).unwrap_err();
            assert!(matches!(err, StackError::SchemaInvalid { .. }), "{:?}", err);
        }
    }
}
