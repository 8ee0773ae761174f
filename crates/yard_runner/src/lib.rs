//! # yard_runner
//!
//! Orchestrator adapter for stackyard.
//!
//! Projects are brought up and torn down by an external compose CLI. This
//! crate wraps that CLI behind the [`Orchestrator`] trait.
//!
//! # Features
//!
//! - **Compose detection**: `docker compose`, then `docker-compose`, then `podman-compose`
//! - **Dry-Run Mode**: log commands without executing them
//! - **Mock Orchestrator**: for tests without a container runtime
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use yard_runner::{ComposeOptions, ComposeOrchestrator, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let orchestrator = ComposeOrchestrator::new(ComposeOptions::default())?;
//!
//!     let output = orchestrator.bring_up(Path::new("/srv/projects/mysite")).await?;
//!     println!("Exit code: {}", output.exit_code);
//!
//!     Ok(())
//! }
//! ```

pub mod compose;
pub mod error;
pub mod mock;
pub mod orchestrator;

pub use compose::{
    ComposeCommand, ComposeOptions, ComposeOrchestrator, ContainerRuntime, COMPOSE_FILE,
};
pub use error::{RunnerError, RunnerResult};
pub use mock::{CapturedCall, MockOrchestrator, MockResponse};
pub use orchestrator::{ComposeAction, Orchestrator, OrchestratorOutput};
