//! # yard_templates
//!
//! Template store, version resolution, variable resolution and rendering for
//! stackyard.
//!
//! Templates are declarative YAML definitions. Loading one validates it and
//! synthesizes its artifacts (compose file, environment file, proxy route),
//! each a body of text with `{{NAME}}` placeholders. Instantiating a project
//! then runs three pure steps:
//!
//! - [`VersionResolver`] merges `tool:version` overrides into the template's
//!   default versions
//! - [`VariableResolver`] builds the complete [`SubstitutionMap`]
//! - [`render_artifacts`] substitutes every placeholder
//!
//! ## Example
//!
//! ```rust,no_run
//! use yard_templates::{
//!     render_artifacts, ProjectInputs, TemplateLoader, VariableResolver, VersionResolver,
//! };
//!
//! let store = TemplateLoader::new().load_all().unwrap();
//! let template = store.get("laravel").unwrap();
//!
//! let versions = VersionResolver::default().resolve(template, "php:8.3").unwrap();
//! let inputs = ProjectInputs::new("mysite")
//!     .with_domain(Some("mysite.test"))
//!     .with_overlays_dir("/opt/stackyard/overlays");
//! let map = VariableResolver::new().resolve(template, &versions, &inputs).unwrap();
//!
//! for artifact in render_artifacts(template, &map).unwrap() {
//!     println!("{}", artifact.path.display());
//! }
//! ```

pub mod artifacts;
pub mod error;
pub mod loader;
pub mod manifest;
pub mod renderer;
pub mod store;
pub mod variables;
pub mod versions;

pub use error::{TemplateError, TemplateResult};
pub use loader::TemplateLoader;
pub use manifest::{
    ArtifactKind, ArtifactSpec, PortMapping, ProxyRoute, Template, TemplateDefinition,
    TemplateSummary, VersionSlot,
};
pub use renderer::{render, render_artifacts, scan_placeholders, RenderedArtifact};
pub use store::TemplateStore;
pub use variables::{
    generate_secret, validate_domain, validate_project_name, ProjectInputs, SubstitutionMap,
    VariableResolver,
};
pub use versions::{parse_overrides, SupportedVersions, VersionResolver, VersionSet};
