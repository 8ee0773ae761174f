//! stackyard CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments / unknown project
//! - 3: Validation failure
//! - 4: Template error
//! - 5: Orchestrator failure

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use yard_core::EngineError;
use yard_templates::TemplateError;

mod commands;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const VALIDATION_FAILURE: u8 = 3;
    pub const TEMPLATE_ERROR: u8 = 4;
    pub const ORCHESTRATOR_ERROR: u8 = 5;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.global.verbose {
        "yard=debug,info"
    } else {
        "yard=info,warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // A subscriber may already be installed; keep it.
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    let global = cli.global;
    let result = match cli.command {
        Commands::New(args) => commands::new::execute(&global, args).await,
        Commands::Start(args) => commands::start::execute(&global, args).await,
        Commands::Stop(args) => commands::stop::execute(&global, args).await,
        Commands::List(args) => commands::list::execute(&global, args).await,
        Commands::Versions(args) => commands::versions::execute(&global, args).await,
        Commands::Templates(args) => commands::templates::execute(&global, args).await,
        Commands::Remove(args) => commands::remove::execute(&global, args).await,
        Commands::Reconcile(args) => commands::reconcile::execute(&global, args).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    let template = match e.downcast_ref::<EngineError>() {
        Some(EngineError::Template(t)) => Some(t),
        Some(engine) => return categorize_engine_error(engine),
        None => e.downcast_ref::<TemplateError>(),
    };

    match template {
        Some(t) => categorize_template_error(t),
        None => ExitCodes::GENERAL_ERROR,
    }
}

fn categorize_engine_error(e: &EngineError) -> u8 {
    match e {
        EngineError::ProjectNotFound(_) => ExitCodes::INVALID_ARGS,
        EngineError::OrchestratorFailure { .. } => ExitCodes::ORCHESTRATOR_ERROR,
        EngineError::Template(t) => categorize_template_error(t),
        e if e.is_validation() => ExitCodes::VALIDATION_FAILURE,
        _ => ExitCodes::GENERAL_ERROR,
    }
}

fn categorize_template_error(e: &TemplateError) -> u8 {
    match e {
        TemplateError::UnknownTemplate(_)
        | TemplateError::InvalidTemplate { .. }
        | TemplateError::DuplicateTemplate(_)
        | TemplateError::Io { .. }
        | TemplateError::Yaml(_) => ExitCodes::TEMPLATE_ERROR,
        _ => ExitCodes::VALIDATION_FAILURE,
    }
}
