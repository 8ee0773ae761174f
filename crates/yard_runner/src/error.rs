//! Error types for the runner module.

use thiserror::Error;

/// Result type alias for runner operations.
pub type RunnerResult<T> = Result<T, RunnerError>;

/// Errors that can occur while invoking the orchestrator.
///
/// A compose command that runs and exits non-zero is not an error at this
/// level; it is reported through [`crate::OrchestratorOutput::exit_code`].
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("No compose command available: {0}")]
    NotAvailable(String),

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Orchestrator call failed: {0}")]
    ExecutionFailed(String),
}
