//! Placeholder grammar and artifact rendering.
//!
//! The only recognised token is `{{NAME}}` where `NAME` matches
//! `[A-Z][A-Z0-9_]*`. Anything else that opens with `{{` or closes with `}}`
//! is rejected when a template is loaded, so rendering never has to guess.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_yaml::Value;

use crate::error::{TemplateError, TemplateResult};
use crate::manifest::{is_relative_inside, ArtifactKind, Template};
use crate::variables::SubstitutionMap;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    // Match {{NAME}} pattern
    Regex::new(r"\{\{([A-Z][A-Z0-9_]*)\}\}").expect("placeholder pattern is valid")
});

/// Whether `name` is usable inside a `{{NAME}}` token.
pub fn is_placeholder_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// A `{{`/`}}` sequence that is not part of a well-formed placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenError {
    pub offset: usize,
    pub fragment: String,
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unrecognized token syntax at byte {}: '{}'",
            self.offset, self.fragment
        )
    }
}

/// Collect every placeholder name referenced by `body`.
///
/// Fails on the first brace pair that does not form a `{{NAME}}` token.
pub fn scan_placeholders(body: &str) -> Result<BTreeSet<String>, TokenError> {
    let mut names = BTreeSet::new();
    // Replace accepted tokens with a neutral marker of equal length so offsets
    // of whatever is left still point into the original body.
    let mut residue = body.as_bytes().to_vec();

    for caps in PLACEHOLDER.captures_iter(body) {
        let whole = caps.get(0).expect("group 0 always exists");
        names.insert(caps[1].to_string());
        for byte in &mut residue[whole.start()..whole.end()] {
            *byte = 0;
        }
    }

    let stray = residue
        .windows(2)
        .position(|pair| pair == b"{{" || pair == b"}}");

    match stray {
        None => Ok(names),
        Some(offset) => {
            let fragment: String = body[offset..]
                .chars()
                .take(24)
                .take_while(|c| *c != '\n')
                .collect();
            Err(TokenError { offset, fragment })
        }
    }
}

/// Substitute every `{{NAME}}` in `body` with its value from `map`.
///
/// # Panics
///
/// Panics if `body` references a name that `map` does not contain. The
/// variable resolver guarantees completeness before rendering starts, so
/// reaching this is an engine bug rather than bad input.
pub fn render(body: &str, map: &SubstitutionMap) -> String {
    PLACEHOLDER
        .replace_all(body, |caps: &Captures| match map.get(&caps[1]) {
            Some(value) => value.to_string(),
            None => panic!(
                "placeholder {{{{{}}}}} reached the renderer unresolved",
                &caps[1]
            ),
        })
        .into_owned()
}

/// One artifact after substitution, ready to be written under a project root.
#[derive(Clone)]
pub struct RenderedArtifact {
    pub kind: ArtifactKind,
    /// Path relative to the project root.
    pub path: PathBuf,
    pub contents: String,
}

impl std::fmt::Debug for RenderedArtifact {
    // Contents may carry generated secrets.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderedArtifact")
            .field("kind", &self.kind)
            .field("path", &self.path)
            .field("len", &self.contents.len())
            .finish()
    }
}

/// Render every artifact of `template`, paths included, in declaration order.
///
/// Compose and proxy artifacts are substituted inside their parsed YAML
/// tree, so a value is always written as a well-formed scalar whatever
/// characters it holds. Rendered paths must stay inside the project root
/// and be distinct.
pub fn render_artifacts(
    template: &Template,
    map: &SubstitutionMap,
) -> TemplateResult<Vec<RenderedArtifact>> {
    let mut seen = BTreeSet::new();
    let mut rendered = Vec::with_capacity(template.artifacts().len());

    for artifact in template.artifacts() {
        let path = render(&artifact.path, map);
        if !is_relative_inside(&path) {
            return Err(TemplateError::InvalidArtifactPath {
                template: template.name().to_string(),
                path,
                reason: "leaves the project root",
            });
        }
        if !seen.insert(path.clone()) {
            return Err(TemplateError::InvalidArtifactPath {
                template: template.name().to_string(),
                path,
                reason: "is produced by more than one artifact",
            });
        }

        let contents = match artifact.kind {
            ArtifactKind::Env => render(&artifact.body, map),
            ArtifactKind::Compose | ArtifactKind::Proxy => render_yaml(&artifact.body, map)?,
        };
        rendered.push(RenderedArtifact {
            kind: artifact.kind,
            path: PathBuf::from(path),
            contents,
        });
    }
    Ok(rendered)
}

fn render_yaml(body: &str, map: &SubstitutionMap) -> TemplateResult<String> {
    let mut doc: Value = serde_yaml::from_str(body)?;
    substitute(&mut doc, map);
    Ok(serde_yaml::to_string(&doc)?)
}

fn substitute(value: &mut Value, map: &SubstitutionMap) {
    match value {
        Value::String(s) => *s = render(s, map),
        Value::Sequence(items) => items.iter_mut().for_each(|item| substitute(item, map)),
        Value::Mapping(mapping) => {
            // Keys may carry placeholders too (proxy router names).
            for (mut key, mut item) in std::mem::take(mapping) {
                substitute(&mut key, map);
                substitute(&mut item, map);
                mapping.insert(key, item);
            }
        }
        Value::Tagged(tagged) => substitute(&mut tagged.value, map),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

/// Check that a YAML artifact body parses and that every placeholder in it
/// sits inside a string scalar, where structural rendering can reach it.
pub(crate) fn check_yaml_body(body: &str) -> Result<(), String> {
    let doc: Value = serde_yaml::from_str(body).map_err(|e| format!("not valid YAML: {}", e))?;

    let in_text = PLACEHOLDER.find_iter(body).count();
    let in_strings = count_in_strings(&doc);
    if in_text == in_strings {
        Ok(())
    } else {
        Err(format!(
            "{} of {} placeholders are outside YAML string values",
            in_text.saturating_sub(in_strings),
            in_text
        ))
    }
}

fn count_in_strings(value: &Value) -> usize {
    match value {
        Value::String(s) => PLACEHOLDER.find_iter(s).count(),
        Value::Sequence(items) => items.iter().map(count_in_strings).sum(),
        Value::Mapping(mapping) => mapping
            .iter()
            .map(|(key, item)| count_in_strings(key) + count_in_strings(item))
            .sum(),
        Value::Tagged(tagged) => count_in_strings(&tagged.value),
        Value::Null | Value::Bool(_) | Value::Number(_) => 0,
    }
}
