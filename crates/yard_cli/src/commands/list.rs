//! List command - Show registered projects.

use anyhow::Result;
use clap::Args;

use super::GlobalArgs;

#[derive(Args)]
pub struct ListArgs {
    /// Show project roots and ports
    #[arg(short, long)]
    long: bool,
}

pub async fn execute(global: &GlobalArgs, args: ListArgs) -> Result<()> {
    let engine = global.engine(false)?;
    let projects = engine.list()?;

    if projects.is_empty() {
        println!("No projects yet. Create one with: yard new <template> <name>");
        return Ok(());
    }

    println!(
        "{:<24} {:<16} {:<9} {:<17} VERSIONS",
        "NAME", "TEMPLATE", "STATE", "CREATED"
    );
    for project in &projects {
        println!(
            "{:<24} {:<16} {:<9} {:<17} {}",
            project.name,
            project.template,
            project.state.to_string(),
            project.created_at.format("%Y-%m-%d %H:%M").to_string(),
            project.versions
        );
        if args.long {
            println!("    root:   {}", project.root.display());
            if let Some(domain) = &project.domain {
                println!("    domain: {}", domain);
            }
            for port in &project.ports {
                println!("    port:   {} -> {}", port.host, port.container);
            }
        }
    }

    Ok(())
}
