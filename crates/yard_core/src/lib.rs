//! # yard_core
//!
//! Project engine for stackyard.
//!
//! This crate owns everything that has state: the project registry, the
//! instantiation pipeline that writes rendered artifacts, and the lifecycle
//! controller that drives the orchestrator.
//!
//! # Architecture
//!
//! - **Registry**: durable, lock-protected record of every project
//! - **Instantiator**: validate, render, write, register; rolls back on failure
//! - **Lifecycle**: start, stop and remove through an [`yard_runner::Orchestrator`]
//! - **Reconcile**: explicit comparison of the registry with the projects directory
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use yard_core::{Engine, EngineConfig, NewProject};
//! use yard_runner::{ComposeOptions, ComposeOrchestrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::load("/home/dev/.stackyard")?;
//!     let orchestrator = ComposeOrchestrator::new(ComposeOptions::default())?;
//!     let engine = Engine::new(config, Arc::new(orchestrator))?;
//!
//!     let request = NewProject::new("laravel", "mysite")
//!         .domain("mysite.test")
//!         .versions("php:8.3");
//!     engine.instantiate(&request)?;
//!     engine.start("mysite").await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod instantiate;
pub mod lifecycle;
pub mod ports;
pub mod reconcile;
pub mod registry;

pub use config::{default_home, EngineConfig, OrchestratorConfig, HOME_ENV};
pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use instantiate::{Instantiator, NewProject};
pub use lifecycle::LifecycleController;
pub use reconcile::{reconcile, ReconcileReport};
pub use registry::{PortBinding, ProjectRecord, ProjectRegistry, ProjectState};
