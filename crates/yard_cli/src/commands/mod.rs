//! CLI command definitions.
//!
//! Each subcommand maps onto one engine operation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::debug;

use yard_core::{default_home, Engine, EngineConfig, HOME_ENV};
use yard_runner::{ComposeCommand, ComposeOrchestrator};

pub mod list;
pub mod new;
pub mod reconcile;
pub mod remove;
pub mod start;
pub mod stop;
pub mod templates;
pub mod versions;

/// stackyard - containerized development environments from templates
#[derive(Parser)]
#[command(name = "yard")]
#[command(version, about = "stackyard - containerized development environments from templates")]
#[command(long_about = r#"
stackyard scaffolds isolated, containerized development environments from
named templates and manages their running/stopped lifecycle.

COMMANDS:
  new        → Create a project from a template
  start      → Bring a project up
  stop       → Tear a project down
  list       → Show registered projects
  versions   → Show supported tool versions
  templates  → Show available templates
  remove     → Unregister a project (optionally deleting its files)
  reconcile  → Compare the registry with the projects directory

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments / unknown project
  3 - Validation failure
  4 - Template error
  5 - Orchestrator failure
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command.
#[derive(Args, Clone)]
pub struct GlobalArgs {
    /// stackyard home directory (config, registry, projects)
    #[arg(long, global = true, env = HOME_ENV)]
    pub home: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log orchestrator commands instead of running them
    #[arg(long, global = true)]
    pub dry_run: bool,
}

impl GlobalArgs {
    /// Load the engine configuration, applying command-line overrides.
    pub fn config(&self) -> Result<EngineConfig> {
        let home = match &self.home {
            Some(home) => home.clone(),
            None => default_home()?,
        };
        let mut config = EngineConfig::load(&home)
            .with_context(|| format!("Failed to load configuration from {:?}", home))?;
        if self.dry_run {
            config.orchestrator.dry_run = true;
        }
        debug!("Using configuration: {:?}", config);
        Ok(config)
    }

    /// Open the engine.
    ///
    /// Only commands that delegate to the orchestrator need `detect`; the
    /// others never invoke it and so work without a container runtime.
    pub fn engine(&self, detect: bool) -> Result<Engine> {
        let config = self.config()?;
        let options = config.orchestrator.compose_options();

        let orchestrator = if detect {
            ComposeOrchestrator::new(options).context("Failed to find a compose command")?
        } else {
            let command = ComposeCommand::candidates(options.preferred_runtime)[0];
            ComposeOrchestrator::with_command(command, options)
        };

        Engine::new(config, Arc::new(orchestrator)).context("Failed to open stackyard")
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new project from a template
    New(new::NewArgs),

    /// Bring a project up
    Start(start::StartArgs),

    /// Tear a project down
    Stop(stop::StopArgs),

    /// List registered projects
    List(list::ListArgs),

    /// Show supported tool versions and template defaults
    Versions(versions::VersionsArgs),

    /// List available templates
    Templates(templates::TemplatesArgs),

    /// Remove a project from the registry
    Remove(remove::RemoveArgs),

    /// Compare the registry with the projects directory
    Reconcile(reconcile::ReconcileArgs),
}
