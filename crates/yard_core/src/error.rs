//! Error types for the core module.

use std::path::PathBuf;

use thiserror::Error;
use yard_runner::ComposeAction;
use yard_templates::TemplateError;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur during engine operations.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Template, version or variable validation failed.
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("Project '{0}' already exists")]
    DuplicateProjectName(String),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Failed to {action} project '{project}':\n{diagnostics}")]
    OrchestratorFailure {
        project: String,
        action: ComposeAction,
        diagnostics: String,
    },

    #[error("Failed to write artifact {path:?}: {source}")]
    ArtifactWriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Domain {domain} is already used by project '{project}'")]
    DomainInUse { domain: String, project: String },

    #[error("Host port {port} is already used by project '{project}'")]
    PortInUse { port: u16, project: String },

    #[error("No free host port at or above {0}")]
    NoFreePort(u16),

    #[error("Registry {path:?} is corrupt: {message}")]
    RegistryCorrupt { path: PathBuf, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    /// Whether the error was raised before anything was changed.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Template(_)
                | Self::DuplicateProjectName(_)
                | Self::ProjectNotFound(_)
                | Self::DomainInUse { .. }
                | Self::PortInUse { .. }
                | Self::NoFreePort(_)
        )
    }
}
