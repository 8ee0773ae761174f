//! Engine configuration.
//!
//! Read from `<home>/config.toml` when present. Every field is optional;
//! relative paths are resolved against the home directory.
//!
//! ```toml
//! projects_dir = "/srv/projects"
//! templates_dir = "templates"
//!
//! [orchestrator]
//! runtime = "podman"
//! dry_run = false
//! ```

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;
use yard_runner::{ComposeOptions, ContainerRuntime};

use crate::error::{EngineError, EngineResult};

pub const CONFIG_FILE: &str = "config.toml";

/// Environment variable overriding the home directory.
pub const HOME_ENV: &str = "STACKYARD_HOME";

/// Default home directory: `~/.stackyard`.
pub fn default_home() -> EngineResult<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".stackyard"))
        .ok_or_else(|| {
            EngineError::Config(format!(
                "cannot determine the user's home directory; set {} or pass --home",
                HOME_ENV
            ))
        })
}

/// Orchestrator section of the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrchestratorConfig {
    /// Preferred runtime; auto-detected when unset
    pub runtime: Option<ContainerRuntime>,
    /// Log compose commands instead of running them
    pub dry_run: bool,
}

impl OrchestratorConfig {
    pub fn compose_options(&self) -> ComposeOptions {
        let options = ComposeOptions::new().prefer(self.runtime);
        if self.dry_run {
            options.dry_run()
        } else {
            options
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    projects_dir: Option<PathBuf>,
    registry_path: Option<PathBuf>,
    overlays_dir: Option<PathBuf>,
    templates_dir: Option<PathBuf>,
    orchestrator: OrchestratorConfig,
}

/// Resolved engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub home: PathBuf,
    /// Parent of every project root
    pub projects_dir: PathBuf,
    pub registry_path: PathBuf,
    /// Base overlays the `dev` images are built from
    pub overlays_dir: PathBuf,
    /// Optional directory of user template definitions
    pub templates_dir: Option<PathBuf>,
    pub orchestrator: OrchestratorConfig,
}

impl EngineConfig {
    /// Defaults for `home`, without reading any file.
    pub fn for_home(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        Self {
            projects_dir: home.join("projects"),
            registry_path: home.join("registry.json"),
            overlays_dir: home.join("overlays"),
            templates_dir: None,
            orchestrator: OrchestratorConfig::default(),
            home,
        }
    }

    /// Load `<home>/config.toml` on top of the defaults.
    pub fn load(home: impl Into<PathBuf>) -> EngineResult<Self> {
        let mut config = Self::for_home(home);
        let path = config.home.join(CONFIG_FILE);

        if !path.exists() {
            debug!("No config file at {:?}, using defaults", path);
            return Ok(config);
        }

        debug!("Loading config from {:?}", path);
        let content = fs::read_to_string(&path)?;
        let file: ConfigFile = toml::from_str(&content)
            .map_err(|e| EngineError::Config(format!("{}: {}", path.display(), e)))?;

        let home = config.home.clone();
        let resolve = |p: PathBuf| if p.is_absolute() { p } else { home.join(p) };

        if let Some(dir) = file.projects_dir {
            config.projects_dir = resolve(dir);
        }
        if let Some(path) = file.registry_path {
            config.registry_path = resolve(path);
        }
        if let Some(dir) = file.overlays_dir {
            config.overlays_dir = resolve(dir);
        }
        config.templates_dir = file.templates_dir.map(resolve);
        config.orchestrator = file.orchestrator;

        Ok(config)
    }

    /// Root directory of a project.
    pub fn project_root(&self, name: &str) -> PathBuf {
        self.projects_dir.join(name)
    }

    pub fn config_path(&self) -> PathBuf {
        self.home.join(CONFIG_FILE)
    }
}
