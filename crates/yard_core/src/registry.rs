//! Project registry.
//!
//! The registry is a single JSON document keyed by project name. Every
//! read-modify-write holds an exclusive lock on a sidecar lock file, and the
//! document is replaced atomically, so a crash never leaves a torn file.
//! Reads take a shared lock. No lock is ever held across an orchestrator call.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use yard_templates::{PortMapping, VersionSet};

use crate::error::{EngineError, EngineResult};

const FORMAT_VERSION: u32 = 1;

/// Last known lifecycle state of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectState {
    Created,
    Running,
    Stopped,
}

impl fmt::Display for ProjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// A published port of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortBinding {
    pub host: u16,
    pub container: u16,
}

impl From<PortMapping> for PortBinding {
    fn from(mapping: PortMapping) -> Self {
        Self {
            host: mapping.host,
            container: mapping.container,
        }
    }
}

/// One instantiated project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub name: String,
    pub template: String,
    pub versions: VersionSet,
    pub root: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<PortBinding>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub state: ProjectState,
}

impl ProjectRecord {
    /// A fresh record in the `created` state.
    pub fn new(
        name: impl Into<String>,
        template: impl Into<String>,
        versions: VersionSet,
        root: impl Into<PathBuf>,
    ) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            template: template.into(),
            versions,
            root: root.into(),
            domain: None,
            ports: Vec::new(),
            created_at: now,
            updated_at: now,
            state: ProjectState::Created,
        }
    }

    pub fn with_domain(mut self, domain: Option<String>) -> Self {
        self.domain = domain;
        self
    }

    pub fn with_ports(mut self, ports: Vec<PortBinding>) -> Self {
        self.ports = ports;
        self
    }

    pub fn host_ports(&self) -> impl Iterator<Item = u16> + '_ {
        self.ports.iter().map(|p| p.host)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RegistryDocument {
    version: u32,
    projects: BTreeMap<String, ProjectRecord>,
}

impl Default for RegistryDocument {
    fn default() -> Self {
        Self {
            version: FORMAT_VERSION,
            projects: BTreeMap::new(),
        }
    }
}

/// Held lock on the registry; released on drop.
struct RegistryLock {
    _file: File,
}

/// Durable store of project records.
#[derive(Debug, Clone)]
pub struct ProjectRegistry {
    path: PathBuf,
    lock_path: PathBuf,
}

impl ProjectRegistry {
    /// Open (or lazily create) the registry at `path`.
    pub fn open(path: impl Into<PathBuf>) -> EngineResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut lock_name = path.file_name().unwrap_or_default().to_os_string();
        lock_name.push(".lock");
        let lock_path = path.with_file_name(lock_name);
        Ok(Self { path, lock_path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert a new record.
    ///
    /// This is the only place name uniqueness is decided. Host ports and
    /// domains held by other projects are rejected as well.
    pub fn register(&self, record: ProjectRecord) -> EngineResult<()> {
        let name = record.name.clone();
        self.modify(|doc| {
            if doc.projects.contains_key(&record.name) {
                return Err(EngineError::DuplicateProjectName(record.name.clone()));
            }
            for other in doc.projects.values() {
                if let (Some(domain), Some(theirs)) = (&record.domain, &other.domain) {
                    if domain == theirs {
                        return Err(EngineError::DomainInUse {
                            domain: domain.clone(),
                            project: other.name.clone(),
                        });
                    }
                }
                let shared = record
                    .host_ports()
                    .find(|p| other.host_ports().any(|o| o == *p));
                if let Some(port) = shared {
                    return Err(EngineError::PortInUse {
                        port,
                        project: other.name.clone(),
                    });
                }
            }
            doc.projects.insert(record.name.clone(), record);
            Ok(())
        })?;
        info!("Registered project: {}", name);
        Ok(())
    }

    /// Look up a record by name.
    pub fn lookup(&self, name: &str) -> EngineResult<ProjectRecord> {
        self.read()?
            .projects
            .remove(name)
            .ok_or_else(|| EngineError::ProjectNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> EngineResult<bool> {
        Ok(self.read()?.projects.contains_key(name))
    }

    /// Set the lifecycle state of a project, returning the updated record.
    pub fn update_state(&self, name: &str, state: ProjectState) -> EngineResult<ProjectRecord> {
        let record = self.modify(|doc| {
            let record = doc
                .projects
                .get_mut(name)
                .ok_or_else(|| EngineError::ProjectNotFound(name.to_string()))?;
            record.state = state;
            record.updated_at = Utc::now();
            Ok(record.clone())
        })?;
        debug!("Project {} is now {}", name, state);
        Ok(record)
    }

    /// Every record, oldest first.
    pub fn list(&self) -> EngineResult<Vec<ProjectRecord>> {
        let mut records: Vec<ProjectRecord> = self.read()?.projects.into_values().collect();
        records.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(records)
    }

    /// Host ports held by any registered project.
    pub fn used_host_ports(&self) -> EngineResult<BTreeSet<u16>> {
        Ok(self
            .read()?
            .projects
            .values()
            .flat_map(|r| r.host_ports())
            .collect())
    }

    /// Delete a record, returning it.
    pub fn remove(&self, name: &str) -> EngineResult<ProjectRecord> {
        let record = self.modify(|doc| {
            doc.projects
                .remove(name)
                .ok_or_else(|| EngineError::ProjectNotFound(name.to_string()))
        })?;
        info!("Removed project from registry: {}", name);
        Ok(record)
    }

    fn lock(&self, exclusive: bool) -> EngineResult<RegistryLock> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)?;
        if exclusive {
            file.lock()?;
        } else {
            file.lock_shared()?;
        }
        Ok(RegistryLock { _file: file })
    }

    fn read(&self) -> EngineResult<RegistryDocument> {
        let _lock = self.lock(false)?;
        self.load()
    }

    /// Run `f` on the document under the exclusive lock; persist on success.
    fn modify<T>(
        &self,
        f: impl FnOnce(&mut RegistryDocument) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let _lock = self.lock(true)?;
        let mut doc = self.load()?;
        let result = f(&mut doc)?;
        self.store(&doc)?;
        Ok(result)
    }

    fn load(&self) -> EngineResult<RegistryDocument> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(RegistryDocument::default()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(RegistryDocument::default());
        }

        let doc: RegistryDocument =
            serde_json::from_str(&content).map_err(|e| EngineError::RegistryCorrupt {
                path: self.path.clone(),
                message: e.to_string(),
            })?;
        if doc.version != FORMAT_VERSION {
            return Err(EngineError::RegistryCorrupt {
                path: self.path.clone(),
                message: format!("unsupported format version {}", doc.version),
            });
        }
        if let Some((key, record)) = doc.projects.iter().find(|(k, r)| *k != &r.name) {
            return Err(EngineError::RegistryCorrupt {
                path: self.path.clone(),
                message: format!("entry '{}' holds record '{}'", key, record.name),
            });
        }
        Ok(doc)
    }

    fn store(&self, doc: &RegistryDocument) -> EngineResult<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, doc)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}
