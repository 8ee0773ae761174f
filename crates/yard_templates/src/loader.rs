//! Template loading functionality.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{TemplateError, TemplateResult};
use crate::manifest::{Template, TemplateDefinition};
use crate::store::TemplateStore;
use crate::versions::SupportedVersions;

/// Definitions compiled into the binary.
const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    ("laravel", include_str!("../templates/laravel.yaml")),
    ("python-fastapi", include_str!("../templates/python-fastapi.yaml")),
    ("wordpress", include_str!("../templates/wordpress.yaml")),
];

/// Template loader.
///
/// Built-in templates always load; a user templates directory may add more.
pub struct TemplateLoader {
    templates_dir: Option<PathBuf>,
    supported: SupportedVersions,
}

impl Default for TemplateLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateLoader {
    /// Create a loader for the built-in templates only.
    pub fn new() -> Self {
        Self {
            templates_dir: None,
            supported: SupportedVersions::builtin(),
        }
    }

    /// Also load user templates from `dir`.
    pub fn with_templates_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.templates_dir = Some(dir.into());
        self
    }

    pub fn with_supported_versions(mut self, supported: SupportedVersions) -> Self {
        self.supported = supported;
        self
    }

    /// Load every template into an immutable store.
    ///
    /// A broken built-in is an error. User templates that fail to load, or
    /// that reuse an existing name, are logged and skipped.
    pub fn load_all(&self) -> TemplateResult<TemplateStore> {
        let mut templates = Vec::new();

        for (name, yaml) in BUILTIN_TEMPLATES {
            let template = self.parse(yaml)?;
            debug!("Loaded built-in template: {}", name);
            templates.push(template);
        }

        if let Some(dir) = &self.templates_dir {
            for template in self.load_dir(dir) {
                if templates.iter().any(|t: &Template| t.name() == template.name()) {
                    warn!(
                        "Ignoring user template '{}': name already defined",
                        template.name()
                    );
                    continue;
                }
                info!("Loaded template: {}", template.name());
                templates.push(template);
            }
        }

        TemplateStore::new(templates)
    }

    /// Load user templates from a directory, skipping invalid ones.
    fn load_dir(&self, dir: &Path) -> Vec<Template> {
        let mut loaded = Vec::new();

        if !dir.exists() {
            warn!("Templates directory does not exist: {:?}", dir);
            return loaded;
        }

        let mut entries: Vec<PathBuf> = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .collect();
        entries.sort();

        for path in entries {
            let manifest = if path.is_dir() {
                match ["template.yaml", "template.yml"]
                    .iter()
                    .map(|f| path.join(f))
                    .find(|p| p.exists())
                {
                    Some(manifest) => manifest,
                    None => continue,
                }
            } else if matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("yaml") | Some("yml")
            ) {
                path.clone()
            } else {
                continue;
            };

            match self.load_file(&manifest) {
                Ok(template) => loaded.push(template),
                Err(e) => warn!("Failed to load template from {:?}: {}", manifest, e),
            }
        }

        loaded
    }

    /// Load a single template definition file.
    pub fn load_file(&self, path: &Path) -> TemplateResult<Template> {
        debug!("Loading template definition from {:?}", path);
        let content = fs::read_to_string(path).map_err(|source| TemplateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse(&content)
    }

    fn parse(&self, yaml: &str) -> TemplateResult<Template> {
        let definition = TemplateDefinition::from_yaml(yaml)?;
        Template::from_definition(definition, &self.supported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_builtins_load() {
        let store = TemplateLoader::new().load_all().unwrap();
        assert_eq!(store.len(), BUILTIN_TEMPLATES.len());
        for (name, _) in BUILTIN_TEMPLATES {
            assert!(store.get(name).is_ok(), "missing {name}");
        }
    }

    #[test]
    fn test_loader_missing_dir() {
        let temp = tempdir().unwrap();
        let store = TemplateLoader::new()
            .with_templates_dir(temp.path().join("nope"))
            .load_all()
            .unwrap();
        assert_eq!(store.len(), BUILTIN_TEMPLATES.len());
    }

    #[test]
    fn test_loader_user_templates() {
        let temp = tempdir().unwrap();
        fs::write(
            temp.path().join("static-site.yaml"),
            "name: static-site\ndescription: nginx\nbase_overlay: node\n\
             versions:\n  node: \"20\"\n",
        )
        .unwrap();
        fs::create_dir(temp.path().join("worker")).unwrap();
        fs::write(
            temp.path().join("worker").join("template.yml"),
            "name: worker\ndescription: queue worker\nbase_overlay: python\n",
        )
        .unwrap();
        fs::write(temp.path().join("README.md"), "not a template").unwrap();

        let store = TemplateLoader::new()
            .with_templates_dir(temp.path())
            .load_all()
            .unwrap();
        assert!(store.get("static-site").is_ok());
        assert!(store.get("worker").is_ok());
        assert_eq!(store.len(), BUILTIN_TEMPLATES.len() + 2);
    }

    #[test]
    fn test_loader_skips_invalid_and_shadowing() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("broken.yaml"), "name: [unclosed").unwrap();
        fs::write(
            temp.path().join("laravel.yaml"),
            "name: laravel\ndescription: impostor\nbase_overlay: php\n",
        )
        .unwrap();

        let store = TemplateLoader::new()
            .with_templates_dir(temp.path())
            .load_all()
            .unwrap();
        assert_eq!(store.len(), BUILTIN_TEMPLATES.len());
        assert_ne!(store.get("laravel").unwrap().description(), "impostor");
    }
}
