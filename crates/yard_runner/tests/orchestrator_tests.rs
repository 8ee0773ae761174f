//! Integration tests for the orchestrator layer.
//!
//! These use the mock orchestrator and dry-run mode, so no container
//! runtime is required.

use std::path::Path;
use std::sync::Arc;

use tempfile::tempdir;
use yard_runner::{
    ComposeAction, ComposeCommand, ComposeOptions, ComposeOrchestrator, MockOrchestrator,
    MockResponse, Orchestrator, COMPOSE_FILE,
};

#[tokio::test]
async fn test_mock_records_roots_in_order() {
    let mock = MockOrchestrator::new();
    let a = Path::new("/srv/a");
    let b = Path::new("/srv/b");

    mock.bring_up(a).await.unwrap();
    mock.tear_down(b).await.unwrap();
    mock.run(ComposeAction::BringUp, b).await.unwrap();

    let calls = mock.get_calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0].action, ComposeAction::BringUp);
    assert_eq!(calls[0].root, a);
    assert_eq!(calls[1].action, ComposeAction::TearDown);
    assert_eq!(calls[2].root, b);
}

#[tokio::test]
async fn test_mock_failure_output() {
    let mock = MockOrchestrator::new()
        .add_response(MockResponse::failure(17, "port is already allocated"));

    let output = mock.bring_up(Path::new("/srv/a")).await.unwrap();
    assert!(!output.success());
    assert_eq!(output.exit_code, 17);
    assert_eq!(output.combined_output(), "port is already allocated");
}

#[tokio::test]
async fn test_mock_behind_trait_object() {
    let mock = MockOrchestrator::new().set_available(false);
    let orchestrator: Arc<dyn Orchestrator> = Arc::new(mock.clone());

    assert!(!orchestrator.is_available().await.unwrap());
    orchestrator.tear_down(Path::new("/srv/a")).await.unwrap();
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn test_dry_run_does_not_spawn() {
    let temp = tempdir().unwrap();
    let orchestrator = ComposeOrchestrator::with_command(
        ComposeCommand::DockerPlugin,
        ComposeOptions::new().dry_run(),
    );

    let output = orchestrator.bring_up(temp.path()).await.unwrap();
    assert!(output.success());
    assert!(output.stdout.starts_with("[DRY-RUN] docker compose -f"));
    assert!(output.stdout.ends_with("up -d"));
    assert!(orchestrator.is_available().await.unwrap());
}

#[test]
fn test_compose_file_is_fixed_per_root() {
    let orchestrator = ComposeOrchestrator::with_command(
        ComposeCommand::DockerCompose,
        ComposeOptions::new().dry_run(),
    );
    let args = orchestrator.build_args(ComposeAction::TearDown, Path::new("/srv/a"));
    assert_eq!(args[0], "-f");
    assert_eq!(Path::new(&args[1]), Path::new("/srv/a").join(COMPOSE_FILE));
}
