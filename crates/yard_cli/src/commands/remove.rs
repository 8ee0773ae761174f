//! Remove command - Tear down and unregister a project.

use anyhow::Result;
use clap::Args;
use tracing::info;

use super::GlobalArgs;

#[derive(Args)]
pub struct RemoveArgs {
    /// Name of the project
    name: String,

    /// Also delete the project directory
    #[arg(long)]
    purge: bool,
}

pub async fn execute(global: &GlobalArgs, args: RemoveArgs) -> Result<()> {
    info!("Removing project {}", args.name);

    let engine = global.engine(true)?;
    let record = engine.remove(&args.name, args.purge).await?;

    println!("🗑️  Project '{}' removed", record.name);
    if !args.purge {
        println!("   Files kept at {}", record.root.display());
    }
    Ok(())
}
