//! Lifecycle controller.
//!
//! Delegates bring-up and tear-down to the orchestrator and records the
//! resulting state. Projects are located by registry lookup only. A failed
//! orchestrator call leaves the record untouched; nothing is retried.

use std::fs;
use std::sync::Arc;

use tracing::{info, warn};
use yard_runner::{ComposeAction, Orchestrator, OrchestratorOutput, COMPOSE_FILE};

use crate::error::{EngineError, EngineResult};
use crate::registry::{ProjectRecord, ProjectRegistry, ProjectState};

pub struct LifecycleController {
    registry: Arc<ProjectRegistry>,
    orchestrator: Arc<dyn Orchestrator>,
}

impl LifecycleController {
    pub fn new(registry: Arc<ProjectRegistry>, orchestrator: Arc<dyn Orchestrator>) -> Self {
        Self {
            registry,
            orchestrator,
        }
    }

    /// Bring a project up; on success its state becomes `running`.
    pub async fn start(&self, name: &str) -> EngineResult<ProjectRecord> {
        let record = self.registry.lookup(name)?;
        self.delegate(&record, ComposeAction::BringUp).await?;
        self.registry.update_state(name, ProjectState::Running)
    }

    /// Tear a project down; on success its state becomes `stopped`.
    pub async fn stop(&self, name: &str) -> EngineResult<ProjectRecord> {
        let record = self.registry.lookup(name)?;
        self.delegate(&record, ComposeAction::TearDown).await?;
        self.registry.update_state(name, ProjectState::Stopped)
    }

    /// Tear a project down and drop its record; with `purge` the project
    /// root is deleted as well.
    ///
    /// A project whose compose file is gone has nothing left to tear down and
    /// is only unregistered.
    pub async fn remove(&self, name: &str, purge: bool) -> EngineResult<ProjectRecord> {
        let record = self.registry.lookup(name)?;

        if record.root.join(COMPOSE_FILE).exists() {
            self.delegate(&record, ComposeAction::TearDown).await?;
        } else {
            warn!(
                "No compose file under {:?}, skipping tear down of {}",
                record.root, name
            );
        }

        let record = self.registry.remove(name)?;
        if purge && record.root.exists() {
            info!("Deleting project files at {:?}", record.root);
            fs::remove_dir_all(&record.root)?;
        }
        Ok(record)
    }

    async fn delegate(
        &self,
        record: &ProjectRecord,
        action: ComposeAction,
    ) -> EngineResult<OrchestratorOutput> {
        info!("Requesting {} of {} at {:?}", action, record.name, record.root);

        let output = self
            .orchestrator
            .run(action, &record.root)
            .await
            .map_err(|e| EngineError::OrchestratorFailure {
                project: record.name.clone(),
                action,
                diagnostics: e.to_string(),
            })?;

        if !output.success() {
            return Err(EngineError::OrchestratorFailure {
                project: record.name.clone(),
                action,
                diagnostics: format!(
                    "exit code {}\n{}",
                    output.exit_code,
                    output.combined_output()
                ),
            });
        }

        info!(
            "{} of {} finished in {} ms",
            action, record.name, output.duration_ms
        );
        Ok(output)
    }
}
