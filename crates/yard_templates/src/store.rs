//! Immutable template store.

use std::collections::BTreeMap;

use crate::error::{TemplateError, TemplateResult};
use crate::manifest::{Template, TemplateSummary};

/// The set of templates available to the engine.
///
/// Built once at start-up; there is no way to add or change a template
/// afterwards.
#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    templates: BTreeMap<String, Template>,
}

impl TemplateStore {
    /// Build a store, rejecting duplicate names.
    pub fn new(templates: impl IntoIterator<Item = Template>) -> TemplateResult<Self> {
        let mut map = BTreeMap::new();
        for template in templates {
            let name = template.name().to_string();
            if map.insert(name.clone(), template).is_some() {
                return Err(TemplateError::DuplicateTemplate(name));
            }
        }
        Ok(Self { templates: map })
    }

    /// Get a template by name.
    pub fn get(&self, name: &str) -> TemplateResult<&Template> {
        self.templates
            .get(name)
            .ok_or_else(|| TemplateError::UnknownTemplate(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Summaries of all templates, ordered by name.
    pub fn list(&self) -> Vec<TemplateSummary> {
        self.templates.values().map(Template::summary).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        self.templates.values()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
