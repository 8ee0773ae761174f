//! Orchestrator trait and types.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RunnerResult;

/// What the orchestrator is asked to do with a project root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComposeAction {
    BringUp,
    TearDown,
}

impl ComposeAction {
    /// Compose subcommand arguments for this action.
    pub fn args(&self) -> &'static [&'static str] {
        match self {
            Self::BringUp => &["up", "-d"],
            Self::TearDown => &["down"],
        }
    }
}

impl fmt::Display for ComposeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BringUp => write!(f, "bring up"),
            Self::TearDown => write!(f, "tear down"),
        }
    }
}

/// Result of one orchestrator call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorOutput {
    /// Exit code of the compose command (-1 when killed by a signal)
    pub exit_code: i32,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl OrchestratorOutput {
    /// Check if the call was successful (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Get combined output (stdout + stderr).
    pub fn combined_output(&self) -> String {
        if self.stdout.is_empty() {
            self.stderr.clone()
        } else if self.stderr.is_empty() {
            self.stdout.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// External orchestrator for project roots.
///
/// Exit status and captured output are the whole contract. Calls block until
/// the orchestrator returns; there is no timeout and no retry.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Check if the orchestrator can be invoked.
    async fn is_available(&self) -> RunnerResult<bool>;

    /// Bring up the project whose artifacts live at `root`.
    async fn bring_up(&self, root: &Path) -> RunnerResult<OrchestratorOutput>;

    /// Tear down the project whose artifacts live at `root`.
    async fn tear_down(&self, root: &Path) -> RunnerResult<OrchestratorOutput>;

    /// Dispatch on `action`.
    async fn run(&self, action: ComposeAction, root: &Path) -> RunnerResult<OrchestratorOutput> {
        match action {
            ComposeAction::BringUp => self.bring_up(root).await,
            ComposeAction::TearDown => self.tear_down(root).await,
        }
    }
}
