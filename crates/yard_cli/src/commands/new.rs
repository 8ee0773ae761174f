//! New command - Create a project from a template.

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use yard_core::NewProject;

use super::GlobalArgs;

#[derive(Args)]
pub struct NewArgs {
    /// Template to use
    template: String,

    /// Name of the project to create
    name: String,

    /// Domain the reverse proxy routes to the project
    #[arg(short, long)]
    domain: Option<String>,

    /// Version overrides, e.g. php:8.2,mysql:8.0
    #[arg(long, default_value = "")]
    versions: String,
}

pub async fn execute(global: &GlobalArgs, args: NewArgs) -> Result<()> {
    info!("Creating project {} from template {}", args.name, args.template);

    let engine = global.engine(false)?;
    let mut request = NewProject::new(&args.template, &args.name).versions(&args.versions);
    if let Some(domain) = &args.domain {
        request = request.domain(domain);
    }

    let record = engine
        .instantiate(&request)
        .with_context(|| format!("Failed to create project '{}'", args.name))?;

    println!("✅ Project '{}' created from template '{}'", record.name, record.template);
    println!();
    println!("Location: {}", record.root.display());
    println!("Versions: {}", record.versions);
    if let Some(domain) = &record.domain {
        println!("Domain:   https://{}", domain);
    }
    for port in &record.ports {
        println!("Port:     localhost:{} -> {}", port.host, port.container);
    }
    println!();
    println!("Next steps:");
    println!("  yard start {}", record.name);

    Ok(())
}
