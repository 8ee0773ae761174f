//! Template definitions.
//!
//! A template is authored as a YAML [`TemplateDefinition`] and turned into an
//! immutable [`Template`] at load time. Loading validates the definition and
//! synthesizes the artifact bodies (compose file, env file, proxy route), so
//! that every later stage works on plain placeholder-bearing text.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::artifacts;
use crate::error::{TemplateError, TemplateResult};
use crate::renderer::{check_yaml_body, scan_placeholders};
use crate::versions::SupportedVersions;

/// Kind of a generated artifact.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Compose definition handed to the orchestrator
    Compose,
    /// Reverse-proxy route
    Proxy,
    /// Environment file
    Env,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Compose => write!(f, "compose"),
            Self::Proxy => write!(f, "proxy"),
            Self::Env => write!(f, "env"),
        }
    }
}

/// An artifact body plus where it lands relative to the project root.
///
/// Both `path` and `body` may contain `{{NAME}}` placeholders.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactSpec {
    pub kind: ArtifactKind,
    pub path: String,
    pub body: String,
}

/// A `host:container` port publication.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PortMapping {
    pub host: u16,
    pub container: u16,
}

impl PortMapping {
    pub fn parse(raw: &str) -> Option<Self> {
        let (host, container) = raw.trim().split_once(':')?;
        Some(Self {
            host: host.trim().parse().ok()?,
            container: container.trim().parse().ok()?,
        })
    }
}

impl std::fmt::Display for PortMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.container)
    }
}

/// Reverse-proxy route declared by a template.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProxyRoute {
    /// Container port of the `dev` service the route forwards to
    pub port: u16,
}

/// A declared tool-version slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSlot {
    pub name: String,
    pub default: String,
}

/// Raw template document as authored in YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateDefinition {
    /// Unique template identifier
    pub name: String,
    pub description: String,
    /// Overlay directory the `dev` service image is built from
    pub base_overlay: String,
    /// Descriptive only
    #[serde(default)]
    pub tech_stack: Vec<String>,
    /// Descriptive only
    #[serde(default)]
    pub features: Vec<String>,
    /// `host:container` pairs published by the `dev` service
    #[serde(default)]
    pub ports: Vec<String>,
    /// Version slots and their defaults, in declaration order
    #[serde(default)]
    pub versions: Mapping,
    /// Placeholders filled with generated secrets
    #[serde(default)]
    pub secrets: Vec<String>,
    /// Additional required non-version variables
    #[serde(default)]
    pub variables: Vec<String>,
    /// Lowest-precedence placeholder values
    #[serde(default)]
    pub defaults: BTreeMap<String, String>,
    #[serde(default)]
    pub proxy: Option<ProxyRoute>,
    /// Compose service skeleton, copied verbatim
    #[serde(default)]
    pub services: Mapping,
    /// Named volumes used by `services`
    #[serde(default)]
    pub volumes: Vec<String>,
    /// Environment file entries, in declaration order
    #[serde(default)]
    pub environment: Mapping,
    /// Extra artifacts beyond the synthesized ones
    #[serde(default)]
    pub artifacts: Vec<ArtifactSpec>,
}

impl TemplateDefinition {
    /// Parse a definition from YAML text.
    pub fn from_yaml(content: &str) -> TemplateResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }
}

/// Listing view of a template.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateSummary {
    pub name: String,
    pub description: String,
    pub tech_stack: Vec<String>,
    pub features: Vec<String>,
    /// Slot defaults in declaration order
    pub versions: Vec<(String, String)>,
}

/// A validated, immutable template.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    description: String,
    base_overlay: String,
    tech_stack: Vec<String>,
    features: Vec<String>,
    ports: Vec<PortMapping>,
    version_slots: Vec<VersionSlot>,
    secrets: BTreeSet<String>,
    variables: BTreeSet<String>,
    defaults: BTreeMap<String, String>,
    proxy: Option<ProxyRoute>,
    artifacts: Vec<ArtifactSpec>,
    placeholders: BTreeSet<String>,
}

impl Template {
    /// Validate a definition and synthesize its artifacts.
    pub fn from_definition(
        def: TemplateDefinition,
        supported: &SupportedVersions,
    ) -> TemplateResult<Self> {
        let name = def.name.trim().to_string();
        if !is_template_id(&name) {
            return Err(TemplateError::invalid(
                &def.name,
                "name must be lower-case alphanumerics and dashes",
            ));
        }
        if def.base_overlay.trim().is_empty() {
            return Err(TemplateError::invalid(&name, "base_overlay is empty"));
        }

        let version_slots = parse_version_slots(&name, &def.versions, supported)?;
        let ports = parse_ports(&name, &def.ports)?;

        if let Some(proxy) = def.proxy {
            if !ports.iter().any(|p| p.container == proxy.port) {
                return Err(TemplateError::invalid(
                    &name,
                    format!("proxy port {} is not a published container port", proxy.port),
                ));
            }
        }

        for var in def.secrets.iter().chain(&def.variables).chain(def.defaults.keys()) {
            if !crate::renderer::is_placeholder_name(var) {
                return Err(TemplateError::invalid(
                    &name,
                    format!("'{}' is not a valid placeholder name", var),
                ));
            }
        }

        for (var, value) in &def.defaults {
            match scan_placeholders(value) {
                Ok(names) if names.is_empty() => {}
                Ok(_) => {
                    return Err(TemplateError::invalid(
                        &name,
                        format!("default for {} must be a literal value, not a placeholder", var),
                    ))
                }
                Err(e) => {
                    return Err(TemplateError::invalid(
                        &name,
                        format!("default for {}: {}", var, e),
                    ))
                }
            }
        }

        if def.services.contains_key("dev") {
            return Err(TemplateError::invalid(
                &name,
                "service name 'dev' is reserved for the workspace container",
            ));
        }

        let environment = scalar_pairs(&name, "environment", &def.environment)?;

        let mut artifacts = vec![
            ArtifactSpec {
                kind: ArtifactKind::Compose,
                path: artifacts::COMPOSE_FILE.to_string(),
                body: artifacts::compose_body(&def, &version_slots, &ports)?,
            },
            ArtifactSpec {
                kind: ArtifactKind::Env,
                path: artifacts::ENV_FILE.to_string(),
                body: artifacts::env_body(&environment),
            },
        ];
        if let Some(proxy) = def.proxy {
            artifacts.push(ArtifactSpec {
                kind: ArtifactKind::Proxy,
                path: artifacts::PROXY_FILE.to_string(),
                body: artifacts::proxy_body(proxy)?,
            });
        }
        artifacts.extend(def.artifacts.iter().cloned());

        let mut seen_paths = BTreeSet::new();
        let mut placeholders = BTreeSet::new();
        for artifact in &artifacts {
            if !is_relative_inside(&artifact.path) {
                return Err(TemplateError::invalid(
                    &name,
                    format!("artifact path '{}' must stay inside the project", artifact.path),
                ));
            }
            if !seen_paths.insert(artifact.path.as_str()) {
                return Err(TemplateError::invalid(
                    &name,
                    format!("artifact path '{}' is declared twice", artifact.path),
                ));
            }
            let context = |e: String| {
                TemplateError::invalid(
                    &name,
                    format!("{} artifact {}: {}", artifact.kind, artifact.path, e),
                )
            };
            for text in [&artifact.path, &artifact.body] {
                let names = scan_placeholders(text).map_err(|e| context(e.to_string()))?;
                placeholders.extend(names);
            }
            if matches!(artifact.kind, ArtifactKind::Compose | ArtifactKind::Proxy) {
                check_yaml_body(&artifact.body).map_err(context)?;
            }
        }

        Ok(Self {
            name,
            description: def.description,
            base_overlay: def.base_overlay,
            tech_stack: def.tech_stack,
            features: def.features,
            ports,
            version_slots,
            secrets: def.secrets.into_iter().collect(),
            variables: def.variables.into_iter().collect(),
            defaults: def.defaults,
            proxy: def.proxy,
            artifacts,
            placeholders,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn base_overlay(&self) -> &str {
        &self.base_overlay
    }

    pub fn tech_stack(&self) -> &[String] {
        &self.tech_stack
    }

    pub fn ports(&self) -> &[PortMapping] {
        &self.ports
    }

    pub fn version_slots(&self) -> &[VersionSlot] {
        &self.version_slots
    }

    /// Look up a declared slot by name.
    pub fn version_slot(&self, name: &str) -> Option<&VersionSlot> {
        self.version_slots.iter().find(|s| s.name == name)
    }

    pub fn secrets(&self) -> &BTreeSet<String> {
        &self.secrets
    }

    /// Declared required non-version variables.
    pub fn variables(&self) -> &BTreeSet<String> {
        &self.variables
    }

    pub fn defaults(&self) -> &BTreeMap<String, String> {
        &self.defaults
    }

    pub fn proxy(&self) -> Option<ProxyRoute> {
        self.proxy
    }

    pub fn artifacts(&self) -> &[ArtifactSpec] {
        &self.artifacts
    }

    /// Every placeholder referenced by any artifact body or path.
    pub fn placeholders(&self) -> &BTreeSet<String> {
        &self.placeholders
    }

    /// Whether any artifact references `name`.
    pub fn references(&self, name: &str) -> bool {
        self.placeholders.contains(name)
    }

    pub fn summary(&self) -> TemplateSummary {
        TemplateSummary {
            name: self.name.clone(),
            description: self.description.clone(),
            tech_stack: self.tech_stack.clone(),
            features: self.features.clone(),
            versions: self
                .version_slots
                .iter()
                .map(|s| (s.name.clone(), s.default.clone()))
                .collect(),
        }
    }
}

/// Placeholder carrying the resolved version of `slot` (`php` → `PHP_VERSION`).
pub fn version_placeholder(slot: &str) -> String {
    format!("{}_VERSION", slot.to_ascii_uppercase().replace('-', "_"))
}

/// Placeholder carrying the allocated host port for a container port.
pub fn host_port_placeholder(container: u16) -> String {
    format!("HOST_PORT_{}", container)
}

fn is_template_id(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c.is_ascii_digit())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Whether `path` names a file strictly below the directory it is joined to.
pub(crate) fn is_relative_inside(path: &str) -> bool {
    let mut named = false;
    for component in Path::new(path).components() {
        match component {
            Component::Normal(_) => named = true,
            Component::CurDir => {}
            _ => return false,
        }
    }
    named
}

fn parse_version_slots(
    template: &str,
    versions: &Mapping,
    supported: &SupportedVersions,
) -> TemplateResult<Vec<VersionSlot>> {
    let mut slots = Vec::new();
    for (slot, default) in scalar_pairs(template, "versions", versions)? {
        let Some(table) = supported.get(&slot) else {
            return Err(TemplateError::invalid(
                template,
                format!("no supported-versions table for slot '{}'", slot),
            ));
        };
        if !table.iter().any(|v| v == &default) {
            return Err(TemplateError::invalid(
                template,
                format!("default {} version '{}' is not supported", slot, default),
            ));
        }
        slots.push(VersionSlot {
            name: slot,
            default,
        });
    }
    Ok(slots)
}

fn parse_ports(template: &str, raw: &[String]) -> TemplateResult<Vec<PortMapping>> {
    let mut ports: Vec<PortMapping> = Vec::with_capacity(raw.len());
    for entry in raw {
        let mapping = PortMapping::parse(entry).ok_or_else(|| {
            TemplateError::invalid(template, format!("port '{}' is not host:container", entry))
        })?;
        if ports.iter().any(|p| p.container == mapping.container) {
            return Err(TemplateError::invalid(
                template,
                format!("container port {} published twice", mapping.container),
            ));
        }
        ports.push(mapping);
    }
    Ok(ports)
}

/// Read a mapping of scalars as ordered string pairs.
fn scalar_pairs(
    template: &str,
    field: &str,
    mapping: &Mapping,
) -> TemplateResult<Vec<(String, String)>> {
    mapping
        .iter()
        .map(|(k, v)| match (scalar(k), scalar(v)) {
            (Some(k), Some(v)) => Ok((k, v)),
            _ => Err(TemplateError::invalid(
                template,
                format!(
                    "{} entries must be scalar key/value pairs (quote versions like \"8.0\")",
                    field
                ),
            )),
        })
        .collect()
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        // Floats would silently turn "8.0" into "8"
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(yaml: &str) -> TemplateResult<Template> {
        Template::from_definition(
            TemplateDefinition::from_yaml(yaml).unwrap(),
            &SupportedVersions::builtin(),
        )
    }

    const MINIMAL: &str = r#"
name: demo
description: Demo stack
base_overlay: python
ports: ["8000:8000"]
versions:
  python: "3.11"
environment:
  APP: "{{PROJECT_NAME}}"
"#;

    #[test]
    fn test_minimal_template() {
        let template = load(MINIMAL).unwrap();
        assert_eq!(template.name(), "demo");
        assert_eq!(template.version_slots().len(), 1);
        assert_eq!(template.artifacts().len(), 2);
        assert!(template.references("PROJECT_NAME"));
        assert!(template.references("PYTHON_VERSION"));
        assert!(template.references("HOST_PORT_8000"));
        assert!(!template.references("DOMAIN"));
    }

    #[test]
    fn test_proxy_adds_route_and_domain() {
        let yaml = format!("{}proxy:\n  port: 8000\n", MINIMAL);
        let template = load(&yaml).unwrap();
        assert!(template
            .artifacts()
            .iter()
            .any(|a| a.kind == ArtifactKind::Proxy));
        assert!(template.references("DOMAIN"));
    }

    #[test]
    fn test_proxy_port_must_be_published() {
        let yaml = format!("{}proxy:\n  port: 9999\n", MINIMAL);
        assert!(matches!(load(&yaml), Err(TemplateError::InvalidTemplate { .. })));
    }

    #[test]
    fn test_unknown_slot_family_rejected() {
        let yaml = MINIMAL.replace("python: \"3.11\"", "cobol: \"85\"");
        assert!(matches!(load(&yaml), Err(TemplateError::InvalidTemplate { .. })));
    }

    #[test]
    fn test_unsupported_default_rejected() {
        let yaml = MINIMAL.replace("\"3.11\"", "\"2.7\"");
        assert!(matches!(load(&yaml), Err(TemplateError::InvalidTemplate { .. })));
    }

    #[test]
    fn test_float_version_rejected() {
        let yaml = MINIMAL.replace("\"3.11\"", "3.10");
        assert!(matches!(load(&yaml), Err(TemplateError::InvalidTemplate { .. })));
    }

    #[test]
    fn test_bad_token_rejected() {
        let yaml = MINIMAL.replace("{{PROJECT_NAME}}", "{{ project }}");
        let err = load(&yaml).unwrap_err();
        assert!(err.to_string().contains("unrecognized token"));
    }

    #[test]
    fn test_escaping_artifact_path_rejected() {
        let yaml = format!(
            "{}artifacts:\n  - kind: env\n    path: ../outside.env\n    body: x\n",
            MINIMAL
        );
        assert!(matches!(load(&yaml), Err(TemplateError::InvalidTemplate { .. })));
    }

    #[test]
    fn test_default_with_placeholder_rejected() {
        let yaml = format!(
            "{}defaults:\n  GREETING: \"hello {{{{PROJECT_NAME}}}}\"\n",
            MINIMAL
        );
        let err = load(&yaml).unwrap_err();
        assert!(err.to_string().contains("default for GREETING"));

        let yaml = format!("{}defaults:\n  GREETING: \"hello }}}}\"\n", MINIMAL);
        assert!(matches!(load(&yaml), Err(TemplateError::InvalidTemplate { .. })));
    }

    #[test]
    fn test_literal_default_accepted() {
        let yaml = format!("{}defaults:\n  GREETING: \"{{a: 1}}\"\n", MINIMAL);
        let template = load(&yaml).unwrap();
        assert_eq!(template.defaults()["GREETING"], "{a: 1}");
    }

    #[test]
    fn test_compose_placeholder_outside_string_rejected() {
        let yaml = format!(
            "{}artifacts:\n  - kind: compose\n    path: extra.yml\n    \
             body: \"{{{{PROJECT_NAME}}}}: 1\\n\"\n",
            MINIMAL
        );
        let err = load(&yaml).unwrap_err();
        assert!(matches!(err, TemplateError::InvalidTemplate { .. }));
    }

    #[test]
    fn test_relative_inside() {
        assert!(is_relative_inside("proxy/site.yml"));
        assert!(is_relative_inside("./.env"));
        assert!(!is_relative_inside(""));
        assert!(!is_relative_inside("."));
        assert!(!is_relative_inside("a/../../b"));
        assert!(!is_relative_inside("/etc/passwd"));
    }

    #[test]
    fn test_reserved_dev_service() {
        let yaml = format!("{}services:\n  dev:\n    image: busybox\n", MINIMAL);
        assert!(load(&yaml).is_err());
    }

    #[test]
    fn test_port_parse() {
        assert_eq!(
            PortMapping::parse("8080:80"),
            Some(PortMapping { host: 8080, container: 80 })
        );
        assert_eq!(PortMapping::parse("8080"), None);
        assert_eq!(PortMapping::parse("a:80"), None);
    }

    #[test]
    fn test_placeholder_names() {
        assert_eq!(version_placeholder("php"), "PHP_VERSION");
        assert_eq!(version_placeholder("node-lts"), "NODE_LTS_VERSION");
        assert_eq!(host_port_placeholder(8000), "HOST_PORT_8000");
    }
}
