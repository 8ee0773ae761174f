//! Integration tests for the project engine.
//!
//! The orchestrator is mocked; everything else touches a real temporary
//! directory.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::{tempdir, TempDir};
use yard_core::{Engine, EngineConfig, EngineError, NewProject, ProjectState};
use yard_runner::{ComposeAction, MockOrchestrator, MockResponse};
use yard_templates::{
    SupportedVersions, Template, TemplateDefinition, TemplateError, TemplateLoader, TemplateStore,
};

fn engine_with(mock: &MockOrchestrator) -> (TempDir, Engine) {
    let temp = tempdir().unwrap();
    let config = EngineConfig::load(temp.path()).unwrap();
    let engine = Engine::new(config, Arc::new(mock.clone())).unwrap();
    (temp, engine)
}

fn env_value(root: &Path, key: &str) -> Option<String> {
    fs::read_to_string(root.join(".env"))
        .unwrap()
        .lines()
        .filter_map(|line| line.split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v.to_string())
}

fn laravel_mysite() -> NewProject {
    NewProject::new("laravel", "mysite")
        .domain("mysite.co.uk")
        .versions("php:8.2,mysql:8.0")
}

#[test]
fn test_laravel_instantiation_record() {
    let (_temp, engine) = engine_with(&MockOrchestrator::new());

    let record = engine.instantiate(&laravel_mysite()).unwrap();
    assert_eq!(record.name, "mysite");
    assert_eq!(record.template, "laravel");
    assert_eq!(record.versions.get("php"), Some("8.2"));
    assert_eq!(record.versions.get("mysql"), Some("8.0"));
    assert_eq!(record.state, ProjectState::Created);
    assert_eq!(record.domain.as_deref(), Some("mysite.co.uk"));
    assert_eq!(record.root, engine.config().project_root("mysite"));

    assert_eq!(env_value(&record.root, "DB_DATABASE").as_deref(), Some("mysite"));
    assert!(record.root.join("docker-compose.yml").is_file());
    assert!(record.root.join("proxy").join("mysite.yml").is_file());

    assert_eq!(engine.registry().lookup("mysite").unwrap(), record);
}

#[test]
fn test_duplicate_name_leaves_first_project_untouched() {
    let (_temp, engine) = engine_with(&MockOrchestrator::new());

    let record = engine.instantiate(&laravel_mysite()).unwrap();
    let env_before = fs::read_to_string(record.root.join(".env")).unwrap();

    let err = engine
        .instantiate(&NewProject::new("wordpress", "mysite").domain("other.test"))
        .unwrap_err();
    assert!(matches!(err, EngineError::DuplicateProjectName(name) if name == "mysite"));

    let env_after = fs::read_to_string(record.root.join(".env")).unwrap();
    assert_eq!(env_before, env_after);
    assert_eq!(engine.list().unwrap().len(), 1);
}

#[test]
fn test_unsupported_version_creates_nothing() {
    let (_temp, engine) = engine_with(&MockOrchestrator::new());

    let request = NewProject::new("laravel", "mysite")
        .domain("mysite.test")
        .versions("php:7.0");
    let err = engine.instantiate(&request).unwrap_err();
    match err {
        EngineError::Template(TemplateError::UnsupportedVersion { tool, supported, .. }) => {
            assert_eq!(tool, "php");
            assert!(!supported.is_empty());
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!engine.config().project_root("mysite").exists());
    assert!(engine.list().unwrap().is_empty());
}

#[test]
fn test_missing_domain_creates_nothing() {
    let (_temp, engine) = engine_with(&MockOrchestrator::new());

    let err = engine
        .instantiate(&NewProject::new("laravel", "mysite"))
        .unwrap_err();
    match err {
        EngineError::Template(TemplateError::MissingRequiredVariable(names)) => {
            assert_eq!(names, vec!["DOMAIN"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!engine.config().project_root("mysite").exists());
}

#[test]
fn test_secrets_consistent_within_and_distinct_across_projects() {
    let (_temp, engine) = engine_with(&MockOrchestrator::new());

    let one = engine.instantiate(&laravel_mysite()).unwrap();
    let two = engine
        .instantiate(&NewProject::new("laravel", "othersite").domain("othersite.test"))
        .unwrap();

    let secret_one = env_value(&one.root, "DB_PASSWORD").unwrap();
    let secret_two = env_value(&two.root, "DB_PASSWORD").unwrap();
    assert_ne!(secret_one, secret_two);

    let compose = fs::read_to_string(one.root.join("docker-compose.yml")).unwrap();
    assert!(compose.contains(&secret_one));
    assert!(!compose.contains("{{"));
}

#[test]
fn test_domain_collision_rejected() {
    let (_temp, engine) = engine_with(&MockOrchestrator::new());
    engine.instantiate(&laravel_mysite()).unwrap();

    let err = engine
        .instantiate(&NewProject::new("wordpress", "blog").domain("MySite.co.uk"))
        .unwrap_err();
    assert!(matches!(err, EngineError::DomainInUse { ref project, .. } if project == "mysite"));
    assert!(!engine.config().project_root("blog").exists());
}

/// Engine whose store holds the builtins plus one extra template.
fn engine_with_template(yaml: &str) -> (TempDir, Engine) {
    let temp = tempdir().unwrap();
    let definition = TemplateDefinition::from_yaml(yaml).unwrap();
    let template = Template::from_definition(definition, &SupportedVersions::builtin()).unwrap();
    let mut templates: Vec<Template> =
        TemplateLoader::new().load_all().unwrap().iter().cloned().collect();
    templates.push(template);
    let store = TemplateStore::new(templates).unwrap();

    let config = EngineConfig::load(temp.path()).unwrap();
    let engine = Engine::with_store(config, store, Arc::new(MockOrchestrator::new())).unwrap();
    (temp, engine)
}

#[test]
fn test_write_failure_rolls_back() {
    let (_temp, engine) = engine_with_template(
        r#"
name: clash
description: second artifact cannot be written
base_overlay: node
artifacts:
  - kind: env
    path: conf
    body: "A=1\n"
  - kind: env
    path: conf/inner.env
    body: "B=2\n"
"#,
    );

    let err = engine.instantiate(&NewProject::new("clash", "broken")).unwrap_err();
    assert!(matches!(err, EngineError::ArtifactWriteFailure { .. }));
    assert!(!engine.config().project_root("broken").exists());
    assert!(engine.list().unwrap().is_empty());
}

#[test]
fn test_rendered_path_outside_root_writes_nothing() {
    let (temp, engine) = engine_with_template(
        r#"
name: detour
description: artifact directory taken from a default
base_overlay: node
defaults:
  SUB: "../../outside"
artifacts:
  - kind: env
    path: "{{SUB}}/stray.env"
    body: "A=1\n"
"#,
    );

    let err = engine.instantiate(&NewProject::new("detour", "victim")).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Template(TemplateError::InvalidArtifactPath { .. })
    ));
    assert!(err.is_validation());
    assert!(!temp.path().join("outside").exists());
    assert!(!engine.config().project_root("victim").exists());
    assert!(engine.list().unwrap().is_empty());
}

#[tokio::test]
async fn test_remove_tears_down_the_rendered_compose_file() {
    let mock = MockOrchestrator::new();
    let (_temp, engine) = engine_with(&mock);
    let record = engine.instantiate(&laravel_mysite()).unwrap();

    assert_eq!(yard_runner::COMPOSE_FILE, yard_templates::artifacts::COMPOSE_FILE);
    assert!(record.root.join(yard_runner::COMPOSE_FILE).is_file());

    engine.remove("mysite", false).await.unwrap();
    let calls = mock.get_action_calls(ComposeAction::TearDown);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].root, record.root);
    assert!(record.root.exists());
}

#[tokio::test]
async fn test_start_stop_start_lifecycle() {
    let mock = MockOrchestrator::new();
    let (_temp, engine) = engine_with(&mock);
    let record = engine.instantiate(&laravel_mysite()).unwrap();

    engine.start("mysite").await.unwrap();
    engine.stop("mysite").await.unwrap();
    let last = engine.start("mysite").await.unwrap();

    assert_eq!(last.state, ProjectState::Running);
    assert_eq!(mock.call_count(), 3);
    assert!(mock.get_calls().iter().all(|c| c.root == record.root));
    assert_eq!(
        engine.registry().lookup("mysite").unwrap().state,
        ProjectState::Running
    );
}

#[tokio::test]
async fn test_failed_start_keeps_state() {
    let mock =
        MockOrchestrator::new().add_response(MockResponse::failure(1, "network proxy not found"));
    let (_temp, engine) = engine_with(&mock);
    engine.instantiate(&laravel_mysite()).unwrap();

    let err = engine.start("mysite").await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::OrchestratorFailure { ref diagnostics, .. }
            if diagnostics.contains("network proxy not found")
    ));
    assert_eq!(
        engine.registry().lookup("mysite").unwrap().state,
        ProjectState::Created
    );
}

#[tokio::test]
async fn test_start_unknown_project() {
    let mock = MockOrchestrator::new();
    let (_temp, engine) = engine_with(&mock);

    let err = engine.start("ghost").await.unwrap_err();
    assert!(matches!(err, EngineError::ProjectNotFound(name) if name == "ghost"));
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_remove_with_purge() {
    let mock = MockOrchestrator::new();
    let (_temp, engine) = engine_with(&mock);
    let record = engine.instantiate(&laravel_mysite()).unwrap();

    engine.remove("mysite", true).await.unwrap();
    assert_eq!(mock.get_action_calls(ComposeAction::TearDown).len(), 1);
    assert!(!record.root.exists());
    assert!(engine.list().unwrap().is_empty());

    engine.instantiate(&laravel_mysite()).unwrap();
}

#[tokio::test]
async fn test_remove_failure_keeps_record() {
    let mock = MockOrchestrator::new().simulate_failure("daemon unreachable");
    let (_temp, engine) = engine_with(&mock);
    let record = engine.instantiate(&laravel_mysite()).unwrap();

    let err = engine.remove("mysite", true).await.unwrap_err();
    assert!(matches!(err, EngineError::OrchestratorFailure { .. }));
    assert!(engine.registry().contains("mysite").unwrap());
    assert!(record.root.exists());
}

#[test]
fn test_reconcile_after_manual_delete() {
    let (_temp, engine) = engine_with(&MockOrchestrator::new());
    let record = engine.instantiate(&laravel_mysite()).unwrap();
    fs::remove_dir_all(&record.root).unwrap();

    let report = engine.reconcile(false).unwrap();
    assert_eq!(report.missing, vec!["mysite"]);

    let report = engine.reconcile(true).unwrap();
    assert_eq!(report.pruned, vec!["mysite"]);
    assert!(engine.list().unwrap().is_empty());
}
