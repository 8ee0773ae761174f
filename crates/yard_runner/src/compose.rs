//! CLI-based compose orchestrator supporting Docker and Podman.
//!
//! Drives `docker compose`, `docker-compose` or `podman-compose` against a
//! project root, with automatic detection and fallback.

use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{RunnerError, RunnerResult};
use crate::orchestrator::{ComposeAction, Orchestrator, OrchestratorOutput};

/// Compose definition file every project root carries.
pub const COMPOSE_FILE: &str = "docker-compose.yml";

/// Container runtime type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerRuntime {
    Docker,
    Podman,
}

impl ContainerRuntime {
    /// Get the CLI command name.
    pub fn command(&self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Podman => "podman",
        }
    }
}

impl std::fmt::Display for ContainerRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.command())
    }
}

/// A compose front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeCommand {
    /// `docker compose` (v2 plugin)
    DockerPlugin,
    /// standalone `docker-compose`
    DockerCompose,
    /// `podman-compose`
    PodmanCompose,
}

impl ComposeCommand {
    /// Program to execute.
    pub fn program(&self) -> &'static str {
        match self {
            Self::DockerPlugin => "docker",
            Self::DockerCompose => "docker-compose",
            Self::PodmanCompose => "podman-compose",
        }
    }

    /// Arguments that precede the compose arguments.
    pub fn base_args(&self) -> &'static [&'static str] {
        match self {
            Self::DockerPlugin => &["compose"],
            Self::DockerCompose | Self::PodmanCompose => &[],
        }
    }

    pub fn runtime(&self) -> ContainerRuntime {
        match self {
            Self::DockerPlugin | Self::DockerCompose => ContainerRuntime::Docker,
            Self::PodmanCompose => ContainerRuntime::Podman,
        }
    }

    /// Detection order, preferred runtime first.
    pub fn candidates(preferred: Option<ContainerRuntime>) -> [ComposeCommand; 3] {
        match preferred {
            Some(ContainerRuntime::Podman) => {
                [Self::PodmanCompose, Self::DockerPlugin, Self::DockerCompose]
            }
            _ => [Self::DockerPlugin, Self::DockerCompose, Self::PodmanCompose],
        }
    }

    /// Check if this front-end can be invoked.
    pub fn is_available(&self) -> bool {
        Command::new(self.program())
            .args(self.base_args())
            .arg("version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

impl std::fmt::Display for ComposeCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DockerPlugin => write!(f, "docker compose"),
            Self::DockerCompose => write!(f, "docker-compose"),
            Self::PodmanCompose => write!(f, "podman-compose"),
        }
    }
}

/// Compose orchestrator options.
#[derive(Debug, Clone, Default)]
pub struct ComposeOptions {
    /// Preferred runtime (if not set, auto-detect)
    pub preferred_runtime: Option<ContainerRuntime>,
    /// Dry-run mode (log commands without executing)
    pub dry_run: bool,
}

impl ComposeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    pub fn prefer(mut self, runtime: Option<ContainerRuntime>) -> Self {
        self.preferred_runtime = runtime;
        self
    }
}

/// Orchestrator that shells out to a compose CLI.
pub struct ComposeOrchestrator {
    command: ComposeCommand,
    options: ComposeOptions,
}

impl ComposeOrchestrator {
    /// Create an orchestrator with automatic compose detection.
    ///
    /// In dry-run mode a missing compose CLI is not an error: the first
    /// candidate is used for logging.
    pub fn new(options: ComposeOptions) -> RunnerResult<Self> {
        let command = match Self::detect(&options) {
            Ok(command) => command,
            Err(e) if options.dry_run => {
                let fallback = ComposeCommand::candidates(options.preferred_runtime)[0];
                warn!("{}; dry-run will assume {}", e, fallback);
                fallback
            }
            Err(e) => return Err(e),
        };
        info!("Using compose command: {}", command);
        Ok(Self { command, options })
    }

    /// Create an orchestrator with a specific compose command.
    pub fn with_command(command: ComposeCommand, options: ComposeOptions) -> Self {
        Self { command, options }
    }

    /// Detect an available compose front-end.
    pub fn detect(options: &ComposeOptions) -> RunnerResult<ComposeCommand> {
        if let Some(preferred) = options.preferred_runtime {
            debug!("Preferring {} compose front-ends", preferred);
        }

        ComposeCommand::candidates(options.preferred_runtime)
            .into_iter()
            .find(|candidate| {
                let available = candidate.is_available();
                debug!("{} available: {}", candidate, available);
                available
            })
            .ok_or_else(|| {
                RunnerError::NotAvailable(
                    "none of docker compose, docker-compose or podman-compose responded"
                        .to_string(),
                )
            })
    }

    pub fn command(&self) -> ComposeCommand {
        self.command
    }

    /// Check if dry-run mode is enabled.
    pub fn is_dry_run(&self) -> bool {
        self.options.dry_run
    }

    /// Build the full argument list for `action` on `root`.
    pub fn build_args(&self, action: ComposeAction, root: &Path) -> Vec<String> {
        let mut args: Vec<String> = self
            .command
            .base_args()
            .iter()
            .map(|s| s.to_string())
            .collect();

        args.push("-f".to_string());
        args.push(root.join(COMPOSE_FILE).to_string_lossy().to_string());
        args.push("--project-directory".to_string());
        args.push(root.to_string_lossy().to_string());
        args.extend(action.args().iter().map(|s| s.to_string()));
        args
    }

    /// Format command for logging.
    fn format_command(&self, args: &[String]) -> String {
        let mut cmd = self.command.program().to_string();
        for arg in args {
            if arg.contains(' ') {
                cmd.push_str(&format!(" '{}'", arg));
            } else {
                cmd.push_str(&format!(" {}", arg));
            }
        }
        cmd
    }

    async fn execute(
        &self,
        action: ComposeAction,
        root: &Path,
    ) -> RunnerResult<OrchestratorOutput> {
        let args = self.build_args(action, root);
        let cmd_str = self.format_command(&args);
        let started_at = Utc::now();

        if self.options.dry_run {
            info!("[DRY-RUN] Would run: {}", cmd_str);
            return Ok(OrchestratorOutput {
                exit_code: 0,
                stdout: format!("[DRY-RUN] {}", cmd_str),
                stderr: String::new(),
                started_at,
                finished_at: started_at,
                duration_ms: 0,
            });
        }

        info!("Executing: {}", cmd_str);
        let start = Instant::now();

        let output = tokio::process::Command::new(self.command.program())
            .args(&args)
            .current_dir(root)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| RunnerError::Spawn {
                program: self.command.program().to_string(),
                source,
            })?;

        let duration = start.elapsed();
        let exit_code = output.status.code().unwrap_or(-1);
        debug!(
            "{} {} finished with exit code {} in {:?}",
            self.command, action, exit_code, duration
        );

        Ok(OrchestratorOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            started_at,
            finished_at: Utc::now(),
            duration_ms: duration.as_millis() as u64,
        })
    }
}

#[async_trait]
impl Orchestrator for ComposeOrchestrator {
    async fn is_available(&self) -> RunnerResult<bool> {
        Ok(self.options.dry_run || self.command.is_available())
    }

    async fn bring_up(&self, root: &Path) -> RunnerResult<OrchestratorOutput> {
        self.execute(ComposeAction::BringUp, root).await
    }

    async fn tear_down(&self, root: &Path) -> RunnerResult<OrchestratorOutput> {
        self.execute(ComposeAction::TearDown, root).await
    }
}
