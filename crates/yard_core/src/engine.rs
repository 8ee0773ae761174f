//! Engine facade wiring the store, registry and controllers together.

use std::sync::Arc;

use tracing::{debug, info};
use yard_runner::Orchestrator;
use yard_templates::{TemplateLoader, TemplateStore};

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::instantiate::{Instantiator, NewProject};
use crate::lifecycle::LifecycleController;
use crate::reconcile::{reconcile, ReconcileReport};
use crate::registry::{ProjectRecord, ProjectRegistry};

/// One engine per process: templates are loaded once and the registry is
/// shared by every operation.
pub struct Engine {
    config: EngineConfig,
    store: Arc<TemplateStore>,
    registry: Arc<ProjectRegistry>,
    instantiator: Instantiator,
    lifecycle: LifecycleController,
}

impl Engine {
    /// Load templates and open the registry described by `config`.
    pub fn new(config: EngineConfig, orchestrator: Arc<dyn Orchestrator>) -> EngineResult<Self> {
        let mut loader = TemplateLoader::new();
        if let Some(dir) = &config.templates_dir {
            loader = loader.with_templates_dir(dir);
        }
        let store = loader.load_all()?;
        info!("Loaded {} templates", store.len());
        Self::with_store(config, store, orchestrator)
    }

    /// Build an engine around an already loaded template store.
    pub fn with_store(
        config: EngineConfig,
        store: TemplateStore,
        orchestrator: Arc<dyn Orchestrator>,
    ) -> EngineResult<Self> {
        let store = Arc::new(store);
        let registry = Arc::new(ProjectRegistry::open(&config.registry_path)?);
        debug!("Using registry at {:?}", registry.path());

        let instantiator = Instantiator::new(
            store.clone(),
            registry.clone(),
            &config.projects_dir,
            &config.overlays_dir,
        );
        let lifecycle = LifecycleController::new(registry.clone(), orchestrator);

        Ok(Self {
            config,
            store,
            registry,
            instantiator,
            lifecycle,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &TemplateStore {
        &self.store
    }

    pub fn registry(&self) -> &ProjectRegistry {
        &self.registry
    }

    pub fn instantiate(&self, request: &NewProject) -> EngineResult<ProjectRecord> {
        self.instantiator.instantiate(request)
    }

    pub async fn start(&self, name: &str) -> EngineResult<ProjectRecord> {
        self.lifecycle.start(name).await
    }

    pub async fn stop(&self, name: &str) -> EngineResult<ProjectRecord> {
        self.lifecycle.stop(name).await
    }

    pub async fn remove(&self, name: &str, purge: bool) -> EngineResult<ProjectRecord> {
        self.lifecycle.remove(name, purge).await
    }

    pub fn list(&self) -> EngineResult<Vec<ProjectRecord>> {
        self.registry.list()
    }

    pub fn reconcile(&self, prune: bool) -> EngineResult<ReconcileReport> {
        reconcile(&self.registry, &self.config.projects_dir, prune)
    }
}
