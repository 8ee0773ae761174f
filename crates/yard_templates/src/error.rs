//! Error types for templates.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors that can occur while loading templates or resolving their inputs.
///
/// Every variant except `Io`/`Yaml` is a validation error: it is raised
/// before anything is written to disk.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Unknown template: {0}")]
    UnknownTemplate(String),

    #[error("Invalid template {template}: {message}")]
    InvalidTemplate { template: String, message: String },

    #[error("Template '{0}' is already defined")]
    DuplicateTemplate(String),

    #[error("Malformed version override '{0}', expected tool:version")]
    MalformedVersionOverride(String),

    #[error("Version slot '{0}' given more than once")]
    DuplicateVersionSlot(String),

    #[error("Template {template} has no version slot '{slot}' (declared: {})", declared.join(", "))]
    UnknownVersionSlot {
        template: String,
        slot: String,
        declared: Vec<String>,
    },

    #[error("Unsupported {tool} version '{version}' (supported: {})", supported.join(", "))]
    UnsupportedVersion {
        tool: String,
        version: String,
        supported: Vec<String>,
    },

    #[error("Missing required variables: {}", .0.join(", "))]
    MissingRequiredVariable(Vec<String>),

    #[error("Invalid value for {variable}: {message}")]
    InvalidVariable { variable: String, message: String },

    #[error("Artifact path '{path}' of template {template} {reason}")]
    InvalidArtifactPath {
        template: String,
        path: String,
        reason: &'static str,
    },

    #[error("Failed to read template file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl TemplateError {
    pub(crate) fn invalid(template: &str, message: impl Into<String>) -> Self {
        Self::InvalidTemplate {
            template: template.to_string(),
            message: message.into(),
        }
    }
}
