//! Version override parsing and resolution.
//!
//! Overrides arrive as a comma-separated `tool:version` list, for example
//! `php:8.2,mysql:8.0`. Versions are opaque strings: they are only checked for
//! membership in the supported-versions table of their tool family.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{TemplateError, TemplateResult};
use crate::manifest::{version_placeholder, Template};

/// Supported versions per tool family.
#[derive(Debug, Clone)]
pub struct SupportedVersions {
    tools: BTreeMap<String, Vec<String>>,
}

impl SupportedVersions {
    /// The built-in version catalogue.
    pub fn builtin() -> Self {
        let table: &[(&str, &[&str])] = &[
            ("php", &["7.4", "8.0", "8.1", "8.2", "8.3"]),
            ("node", &["16", "18", "20", "latest"]),
            ("python", &["3.8", "3.9", "3.10", "3.11", "3.12"]),
            ("wordpress", &["6.2", "6.3", "6.4", "latest"]),
            ("laravel", &["9", "10", "11"]),
            ("mysql", &["5.7", "8.0", "8.4"]),
            ("mariadb", &["10.6", "10.11", "11.4"]),
            ("postgres", &["13", "14", "15", "16"]),
            ("redis", &["6", "7"]),
        ];

        Self {
            tools: table
                .iter()
                .map(|(tool, versions)| {
                    (
                        tool.to_string(),
                        versions.iter().map(|v| v.to_string()).collect(),
                    )
                })
                .collect(),
        }
    }

    /// Supported versions of `tool`, if the tool is known.
    pub fn get(&self, tool: &str) -> Option<&[String]> {
        self.tools.get(tool).map(Vec::as_slice)
    }

    pub fn is_supported(&self, tool: &str, version: &str) -> bool {
        self.get(tool)
            .map(|versions| versions.iter().any(|v| v == version))
            .unwrap_or(false)
    }

    /// Iterate tools in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.tools.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl Default for SupportedVersions {
    fn default() -> Self {
        Self::builtin()
    }
}

/// A complete slot → version assignment for one template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionSet(BTreeMap<String, String>);

impl VersionSet {
    pub fn get(&self, slot: &str) -> Option<&str> {
        self.0.get(slot).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn slots(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `(PLACEHOLDER, version)` pairs for the substitution map.
    pub fn placeholders(&self) -> impl Iterator<Item = (String, &str)> {
        self.0
            .iter()
            .map(|(slot, version)| (version_placeholder(slot), version.as_str()))
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}

impl FromIterator<(String, String)> for VersionSet {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl std::fmt::Display for VersionSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pairs: Vec<String> = self.iter().map(|(k, v)| format!("{}:{}", k, v)).collect();
        write!(f, "{}", pairs.join(","))
    }
}

/// Parse a raw override list into ordered `(slot, version)` pairs.
///
/// Only syntax is checked here: empty input yields no pairs, each entry must
/// be `slot:version` with both sides non-empty after trimming, and a slot
/// may appear once.
pub fn parse_overrides(raw: &str) -> TemplateResult<Vec<(String, String)>> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    if raw.trim().is_empty() {
        return Ok(pairs);
    }

    for entry in raw.split(',') {
        let (slot, version) = entry
            .split_once(':')
            .map(|(s, v)| (s.trim(), v.trim()))
            .filter(|(s, v)| !s.is_empty() && !v.is_empty())
            .ok_or_else(|| TemplateError::MalformedVersionOverride(entry.trim().to_string()))?;

        if pairs.iter().any(|(seen, _)| seen == slot) {
            return Err(TemplateError::DuplicateVersionSlot(slot.to_string()));
        }
        pairs.push((slot.to_string(), version.to_string()));
    }

    Ok(pairs)
}

/// Resolves version overrides against a template's declared slots.
#[derive(Debug, Clone, Default)]
pub struct VersionResolver {
    supported: SupportedVersions,
}

impl VersionResolver {
    pub fn new(supported: SupportedVersions) -> Self {
        Self { supported }
    }

    pub fn supported(&self) -> &SupportedVersions {
        &self.supported
    }

    /// Produce a version for every declared slot of `template`.
    pub fn resolve(&self, template: &Template, raw_overrides: &str) -> TemplateResult<VersionSet> {
        let overrides = parse_overrides(raw_overrides)?;

        let declared: BTreeSet<&str> = template
            .version_slots()
            .iter()
            .map(|s| s.name.as_str())
            .collect();

        for (slot, version) in &overrides {
            if !declared.contains(slot.as_str()) {
                return Err(TemplateError::UnknownVersionSlot {
                    template: template.name().to_string(),
                    slot: slot.clone(),
                    declared: template
                        .version_slots()
                        .iter()
                        .map(|s| s.name.clone())
                        .collect(),
                });
            }
            if !self.supported.is_supported(slot, version) {
                return Err(TemplateError::UnsupportedVersion {
                    tool: slot.clone(),
                    version: version.clone(),
                    supported: self.supported.get(slot).unwrap_or_default().to_vec(),
                });
            }
        }

        let resolved: VersionSet = template
            .version_slots()
            .iter()
            .map(|slot| {
                let version = overrides
                    .iter()
                    .find(|(name, _)| name == &slot.name)
                    .map(|(_, v)| v.clone())
                    .unwrap_or_else(|| slot.default.clone());
                (slot.name.clone(), version)
            })
            .collect();

        debug!("Resolved versions for {}: {}", template.name(), resolved);
        Ok(resolved)
    }
}
