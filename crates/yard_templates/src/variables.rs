//! Variable resolution.
//!
//! Builds the substitution map for one instantiation by layering, from lowest
//! to highest precedence: template defaults, generated secrets, user and
//! engine supplied variables, resolved versions. The result is checked for
//! completeness against every placeholder the template references.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use rand::distributions::Alphanumeric;
use rand::Rng;
use regex::Regex;
use tracing::debug;

use crate::error::{TemplateError, TemplateResult};
use crate::manifest::{host_port_placeholder, Template};
use crate::versions::VersionSet;

pub const PROJECT_NAME: &str = "PROJECT_NAME";
pub const DOMAIN: &str = "DOMAIN";
pub const OVERLAYS_DIR: &str = "OVERLAYS_DIR";

/// Length of generated secret tokens.
pub const SECRET_LENGTH: usize = 32;

static PROJECT_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9_-]{0,62}$").expect("project name pattern is valid")
});

/// Placeholder name → value bindings for one instantiation.
///
/// Secret entries are tracked so they can be kept out of `Debug` output.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SubstitutionMap {
    values: BTreeMap<String, String>,
    secrets: BTreeSet<String>,
}

impl SubstitutionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a plain value, replacing any earlier binding.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.secrets.remove(&name);
        self.values.insert(name, value.into());
    }

    /// Bind a secret value, replacing any earlier binding.
    pub fn insert_secret(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.secrets.insert(name.clone());
        self.values.insert(name, value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn is_secret(&self, name: &str) -> bool {
        self.secrets.contains(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl std::fmt::Debug for SubstitutionMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (name, value) in &self.values {
            if self.secrets.contains(name) {
                map.entry(name, &"<redacted>");
            } else {
                map.entry(name, value);
            }
        }
        map.finish()
    }
}

/// User and engine supplied inputs for one instantiation.
#[derive(Debug, Clone)]
pub struct ProjectInputs {
    pub project_name: String,
    pub domain: Option<String>,
    /// Directory holding the base overlays the `dev` image is built from
    pub overlays_dir: Option<String>,
    /// Container port → allocated host port; unset ports keep the template's host port
    pub host_ports: BTreeMap<u16, u16>,
}

impl ProjectInputs {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            domain: None,
            overlays_dir: None,
            host_ports: BTreeMap::new(),
        }
    }

    pub fn with_domain(mut self, domain: Option<impl Into<String>>) -> Self {
        self.domain = domain.map(Into::into);
        self
    }

    pub fn with_overlays_dir(mut self, dir: impl Into<String>) -> Self {
        self.overlays_dir = Some(dir.into());
        self
    }

    pub fn with_host_port(mut self, container: u16, host: u16) -> Self {
        self.host_ports.insert(container, host);
        self
    }
}

/// Check a project name against the filesystem-safe identifier pattern.
pub fn validate_project_name(name: &str) -> TemplateResult<()> {
    if PROJECT_NAME_PATTERN.is_match(name) {
        Ok(())
    } else {
        Err(TemplateError::InvalidVariable {
            variable: PROJECT_NAME.to_string(),
            message: format!(
                "'{}' must be 1-63 lower-case letters, digits, '-' or '_', \
                 starting with a letter or digit",
                name
            ),
        })
    }
}

/// Check and normalize a domain name (lower-cased).
pub fn validate_domain(domain: &str) -> TemplateResult<String> {
    let domain = domain.trim().to_ascii_lowercase();
    let labels: Vec<&str> = domain.split('.').collect();
    let valid = domain.len() <= 253
        && labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        });

    if valid {
        Ok(domain)
    } else {
        Err(TemplateError::InvalidVariable {
            variable: DOMAIN.to_string(),
            message: format!("'{}' is not a valid domain name", domain),
        })
    }
}

/// Generate one secret token.
pub fn generate_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SECRET_LENGTH)
        .map(char::from)
        .collect()
}

/// Produces complete substitution maps.
#[derive(Debug, Clone, Default)]
pub struct VariableResolver;

impl VariableResolver {
    pub fn new() -> Self {
        Self
    }

    /// Build the substitution map for `template`.
    ///
    /// Secrets are generated fresh on every call; callers render all
    /// artifacts of one instantiation from the same map.
    pub fn resolve(
        &self,
        template: &Template,
        versions: &VersionSet,
        inputs: &ProjectInputs,
    ) -> TemplateResult<SubstitutionMap> {
        validate_project_name(&inputs.project_name)?;
        let domain = inputs.domain.as_deref().map(validate_domain).transpose()?;

        let mut map = SubstitutionMap::new();

        for (name, value) in template.defaults() {
            map.insert(name.clone(), value.clone());
        }

        for name in template.secrets() {
            map.insert_secret(name.clone(), generate_secret());
        }

        map.insert(PROJECT_NAME, inputs.project_name.clone());
        if let Some(domain) = domain {
            map.insert(DOMAIN, domain);
        }
        if let Some(dir) = &inputs.overlays_dir {
            if dir.contains("{{") || dir.contains("}}") || dir.contains('\n') {
                return Err(TemplateError::InvalidVariable {
                    variable: OVERLAYS_DIR.to_string(),
                    message: format!("{:?} must not contain `{{{{`, `}}}}` or line breaks", dir),
                });
            }
            map.insert(OVERLAYS_DIR, dir.clone());
        }
        for port in template.ports() {
            let host = inputs
                .host_ports
                .get(&port.container)
                .copied()
                .unwrap_or(port.host);
            map.insert(host_port_placeholder(port.container), host.to_string());
        }

        for (placeholder, version) in versions.placeholders() {
            map.insert(placeholder, version);
        }

        let missing: Vec<String> = template
            .placeholders()
            .iter()
            .chain(template.variables())
            .map(String::as_str)
            .chain(std::iter::once(PROJECT_NAME))
            .filter(|name| !map.contains_key(name))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();

        if !missing.is_empty() {
            return Err(TemplateError::MissingRequiredVariable(missing));
        }

        debug!(
            "Resolved {} variables for {} ({} secret)",
            map.len(),
            template.name(),
            template.secrets().len()
        );
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::TemplateDefinition;
    use crate::versions::{SupportedVersions, VersionResolver};

    fn template(extra: &str) -> Template {
        let yaml = format!(
            r#"
name: stack
description: test
base_overlay: php
ports: ["8000:8000"]
versions:
  php: "8.2"
secrets: [DB_PASSWORD]
defaults:
  DB_USER: app
environment:
  NAME: "{{{{PROJECT_NAME}}}}"
  DB_USER: "{{{{DB_USER}}}}"
  DB_PASSWORD: "{{{{DB_PASSWORD}}}}"
{}"#,
            extra
        );
        let def = TemplateDefinition::from_yaml(&yaml).unwrap();
        Template::from_definition(def, &SupportedVersions::builtin()).unwrap()
    }

    fn resolve(template: &Template, inputs: &ProjectInputs) -> TemplateResult<SubstitutionMap> {
        let versions = VersionResolver::default().resolve(template, "").unwrap();
        VariableResolver::new().resolve(template, &versions, inputs)
    }

    fn inputs(name: &str) -> ProjectInputs {
        ProjectInputs::new(name).with_overlays_dir("/opt/overlays")
    }

    #[test]
    fn test_resolve_layers() {
        let map = resolve(&template(""), &inputs("mysite")).unwrap();
        assert_eq!(map.get("PROJECT_NAME"), Some("mysite"));
        assert_eq!(map.get("DB_USER"), Some("app"));
        assert_eq!(map.get("PHP_VERSION"), Some("8.2"));
        assert_eq!(map.get("HOST_PORT_8000"), Some("8000"));
        assert_eq!(map.get("DB_PASSWORD").map(str::len), Some(SECRET_LENGTH));
        assert!(map.is_secret("DB_PASSWORD"));
    }

    #[test]
    fn test_overlays_dir_must_be_literal() {
        for dir in ["/opt/{{PROJECT_NAME}}", "/opt/}}", "/opt/a\nB=1"] {
            let inputs = ProjectInputs::new("mysite").with_overlays_dir(dir);
            let err = resolve(&template(""), &inputs).unwrap_err();
            assert!(
                matches!(
                    &err,
                    TemplateError::InvalidVariable { variable, .. } if variable == OVERLAYS_DIR
                ),
                "accepted {dir:?}"
            );
        }

        let inputs = ProjectInputs::new("mysite").with_overlays_dir("/home/o'neil/{x}");
        assert!(resolve(&template(""), &inputs).is_ok());
    }

    #[test]
    fn test_allocated_host_port_wins() {
        let map = resolve(&template(""), &inputs("mysite").with_host_port(8000, 8001)).unwrap();
        assert_eq!(map.get("HOST_PORT_8000"), Some("8001"));
    }

    #[test]
    fn test_domain_required_only_when_referenced() {
        let with_proxy = template("proxy:\n  port: 8000\n");
        let err = resolve(&with_proxy, &inputs("mysite")).unwrap_err();
        assert!(matches!(
            &err,
            TemplateError::MissingRequiredVariable(names) if names == &vec!["DOMAIN".to_string()]
        ));

        let with_domain = inputs("mysite").with_domain(Some("MySite.co.uk"));
        let map = resolve(&with_proxy, &with_domain).unwrap();
        assert_eq!(map.get("DOMAIN"), Some("mysite.co.uk"));

        assert!(resolve(&template(""), &inputs("mysite")).is_ok());
    }

    #[test]
    fn test_missing_reported_all_at_once() {
        let t = template("variables: [API_TOKEN, REGION]\nproxy:\n  port: 8000\n");
        let err = resolve(&t, &ProjectInputs::new("mysite")).unwrap_err();
        match err {
            TemplateError::MissingRequiredVariable(names) => {
                assert_eq!(names, vec!["API_TOKEN", "DOMAIN", "OVERLAYS_DIR", "REGION"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_secrets_differ_between_resolutions() {
        let t = template("");
        let a = resolve(&t, &inputs("one")).unwrap();
        let b = resolve(&t, &inputs("one")).unwrap();
        assert_ne!(a.get("DB_PASSWORD"), b.get("DB_PASSWORD"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let map = resolve(&template(""), &inputs("mysite")).unwrap();
        let secret = map.get("DB_PASSWORD").unwrap().to_string();
        let debug = format!("{:?}", map);
        assert!(!debug.contains(&secret));
        assert!(debug.contains("<redacted>"));
        assert!(debug.contains("mysite"));
    }

    #[test]
    fn test_project_name_validation() {
        for good in ["mysite", "my-site", "a", "site_2"] {
            assert!(validate_project_name(good).is_ok(), "{good}");
        }
        for bad in ["", "-site", "My Site", "../etc", "site.com", "a".repeat(64).as_str()] {
            assert!(
                matches!(
                    validate_project_name(bad),
                    Err(TemplateError::InvalidVariable { .. })
                ),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_domain_validation() {
        assert_eq!(validate_domain("Example.COM").unwrap(), "example.com");
        assert!(validate_domain("mysite.co.uk").is_ok());
        for bad in ["localhost", "-a.com", "a..com", "a_b.com", "a.com-"] {
            assert!(validate_domain(bad).is_err(), "{bad}");
        }
    }
}
