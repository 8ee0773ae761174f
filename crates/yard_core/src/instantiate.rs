//! Project instantiation.
//!
//! Turns a template name, project name, optional domain and version
//! overrides into a project root full of rendered artifacts plus a registry
//! record. All validation happens before the first write. Once writing
//! starts the operation is all-or-nothing: any failure removes the project
//! root again and nothing is registered.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};
use yard_templates::{
    render_artifacts, validate_domain, validate_project_name, ProjectInputs, RenderedArtifact,
    TemplateStore, VariableResolver, VersionResolver,
};

use crate::error::{EngineError, EngineResult};
use crate::ports::allocate_host_ports;
use crate::registry::{ProjectRecord, ProjectRegistry};

/// Parameters of a new project.
#[derive(Debug, Clone, Default)]
pub struct NewProject {
    pub template: String,
    pub name: String,
    pub domain: Option<String>,
    /// Raw `tool:version,...` override list
    pub versions: String,
}

impl NewProject {
    pub fn new(template: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            name: name.into(),
            domain: None,
            versions: String::new(),
        }
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn versions(mut self, overrides: impl Into<String>) -> Self {
        self.versions = overrides.into();
        self
    }
}

/// Removes a freshly created project root unless disarmed.
struct RootGuard {
    root: PathBuf,
    armed: bool,
}

impl RootGuard {
    fn new(root: PathBuf) -> Self {
        Self { root, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for RootGuard {
    fn drop(&mut self) {
        if self.armed {
            warn!("Rolling back {:?}", self.root);
            if let Err(e) = fs::remove_dir_all(&self.root) {
                warn!("Failed to remove {:?} during rollback: {}", self.root, e);
            }
        }
    }
}

/// Creates projects from templates.
pub struct Instantiator {
    store: Arc<TemplateStore>,
    registry: Arc<ProjectRegistry>,
    projects_dir: PathBuf,
    overlays_dir: PathBuf,
    versions: VersionResolver,
    variables: VariableResolver,
}

impl Instantiator {
    pub fn new(
        store: Arc<TemplateStore>,
        registry: Arc<ProjectRegistry>,
        projects_dir: impl Into<PathBuf>,
        overlays_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            registry,
            projects_dir: projects_dir.into(),
            overlays_dir: overlays_dir.into(),
            versions: VersionResolver::default(),
            variables: VariableResolver::new(),
        }
    }

    pub fn with_version_resolver(mut self, resolver: VersionResolver) -> Self {
        self.versions = resolver;
        self
    }

    /// Instantiate a project and register it in the `created` state.
    pub fn instantiate(&self, request: &NewProject) -> EngineResult<ProjectRecord> {
        let template = self.store.get(&request.template)?;
        validate_project_name(&request.name)?;
        let versions = self.versions.resolve(template, &request.versions)?;
        let domain = request
            .domain
            .as_deref()
            .map(validate_domain)
            .transpose()?;

        let root = self.projects_dir.join(&request.name);
        if self.registry.contains(&request.name)? || root.exists() {
            return Err(EngineError::DuplicateProjectName(request.name.clone()));
        }

        let existing = self.registry.list()?;
        if let Some(domain) = &domain {
            if let Some(other) = existing.iter().find(|r| r.domain.as_ref() == Some(domain)) {
                return Err(EngineError::DomainInUse {
                    domain: domain.clone(),
                    project: other.name.clone(),
                });
            }
        }
        let taken = existing.iter().flat_map(|r| r.host_ports()).collect();
        let ports = allocate_host_ports(template.ports(), &taken)?;

        let mut inputs = ProjectInputs::new(&request.name)
            .with_domain(domain.clone())
            .with_overlays_dir(self.overlays_dir.to_string_lossy());
        for binding in &ports {
            inputs = inputs.with_host_port(binding.container, binding.host);
        }
        let map = self.variables.resolve(template, &versions, &inputs)?;
        let artifacts = render_artifacts(template, &map)?;

        let guard = self.create_root(&request.name, &root)?;
        for artifact in &artifacts {
            write_artifact(&root, artifact)?;
        }

        let record = ProjectRecord::new(&request.name, template.name(), versions, &root)
            .with_domain(domain)
            .with_ports(ports);
        self.registry.register(record.clone())?;
        guard.disarm();

        info!(
            "Created project {} from template {} at {:?} ({})",
            record.name, record.template, record.root, record.versions
        );
        Ok(record)
    }

    /// Create the project root exclusively; an existing directory is a
    /// duplicate project.
    fn create_root(&self, name: &str, root: &Path) -> EngineResult<RootGuard> {
        fs::create_dir_all(&self.projects_dir).map_err(|source| {
            EngineError::ArtifactWriteFailure {
                path: self.projects_dir.clone(),
                source,
            }
        })?;
        match fs::create_dir(root) {
            Ok(()) => Ok(RootGuard::new(root.to_path_buf())),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(EngineError::DuplicateProjectName(name.to_string()))
            }
            Err(source) => Err(EngineError::ArtifactWriteFailure {
                path: root.to_path_buf(),
                source,
            }),
        }
    }
}

fn write_artifact(root: &Path, artifact: &RenderedArtifact) -> EngineResult<()> {
    let path = root.join(&artifact.path);
    debug!("Writing {} artifact {:?}", artifact.kind, path);

    let write = || -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &artifact.contents)
    };
    write().map_err(|source| EngineError::ArtifactWriteFailure {
        path: path.clone(),
        source,
    })
}
