//! Error types for devstack.
//!
//! Every failure the launcher can hit is folded into [`StackError`]. Callers
//! that need to branch on the broad failure class (retry, absorb, abort) use
//! [`StackError::kind`] instead of matching individual variants.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for devstack.
#[derive(Debug, Error)]
pub enum StackError {
    // Transfer errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("GET {url} failed with status {status} {reason}")]
    HttpStatus {
        url: String,
        status: u16,
        reason: String,
    },

    #[error("Empty response body from {url}")]
    EmptyResponse { url: String },

    // Not-found outcomes that callers may surface
    #[error("No template manifest published for version {version}")]
    TemplateManifestNotFound { version: String },

    #[error("Template '{name}' not found in {version}; available templates: {}", available.join(", "))]
    TemplateNotFound {
        name: String,
        version: String,
        available: Vec<String>,
    },

    #[error("No release found: {message}")]
    ReleaseNotFound { message: String },

    // Validation errors
    #[error("Invalid {document}: {message}")]
    SchemaInvalid { document: String, message: String },

    #[error("Unsupported checksum format '{value}': expected 'sha256:<hex>'")]
    ChecksumFormat { value: String },

    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Invalid version: {version}")]
    InvalidVersion { version: String },

    #[error("Invalid version range '{range}': {message}")]
    InvalidRange { range: String, message: String },

    #[error("Unsupported archive format: {file}")]
    UnsupportedArchive { file: String },

    // Project errors
    #[error("No devstack project found at {0} (run the scaffold command first)")]
    NotScaffolded(PathBuf),

    #[error("Unknown deployment mode '{0}': expected 'default' or 'app-dev'")]
    InvalidMode(String),

    // Orchestration errors
    #[error("Step '{step}' failed: {message}")]
    Orchestration { step: String, message: String },

    #[error("Service '{service}' is {state}")]
    ServiceUnhealthy { service: String, state: String },

    #[error("Timed out after {timeout:?} waiting for: {}", .pending.join(", "))]
    HealthTimeout {
        timeout: Duration,
        pending: Vec<String>,
    },

    #[error("Upgrade cancelled by user")]
    Cancelled,

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for devstack operations.
pub type Result<T> = std::result::Result<T, StackError>;

/// Broad failure classes used for retry and reporting decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Something expected to exist was not published.
    NotFound,
    /// Network or HTTP failure.
    Transfer,
    /// Schema, checksum or format violation.
    Validation,
    /// An explicit deadline was exceeded.
    Timeout,
    /// A compose engine step failed.
    Orchestration,
    /// The user declined to continue.
    Cancelled,
    /// Local IO, configuration and everything else.
    Other,
}

impl From<std::io::Error> for StackError {
    fn from(err: std::io::Error) -> Self {
        StackError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for StackError {
    fn from(err: serde_json::Error) -> Self {
        StackError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl StackError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        StackError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create a schema validation error for a named document.
    pub fn schema(document: impl Into<String>, message: impl Into<String>) -> Self {
        StackError::SchemaInvalid {
            document: document.into(),
            message: message.into(),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StackError::TemplateManifestNotFound { .. }
            | StackError::TemplateNotFound { .. }
            | StackError::ReleaseNotFound { .. } => ErrorKind::NotFound,

            StackError::Network { .. }
            | StackError::HttpStatus { .. }
            | StackError::EmptyResponse { .. } => ErrorKind::Transfer,

            StackError::SchemaInvalid { .. }
            | StackError::ChecksumFormat { .. }
            | StackError::ChecksumMismatch { .. }
            | StackError::InvalidVersion { .. }
            | StackError::InvalidRange { .. }
            | StackError::UnsupportedArchive { .. }
            | StackError::Json { .. } => ErrorKind::Validation,

            StackError::Timeout(_) => ErrorKind::Timeout,
            StackError::Orchestration { .. }
            | StackError::ServiceUnhealthy { .. }
            | StackError::HealthTimeout { .. } => ErrorKind::Orchestration,
            StackError::Cancelled => ErrorKind::Cancelled,

            _ => ErrorKind::Other,
        }
    }

    /// Check if this error should trigger a retry.
    ///
    /// Only transient transfer failures qualify. An empty body is reported
    /// as-is rather than silently retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            StackError::Network { .. } | StackError::Timeout(_) => true,
            StackError::HttpStatus { status, .. } => matches!(*status, 408 | 429 | 500..=599),
            _ => false,
        }
    }
}
