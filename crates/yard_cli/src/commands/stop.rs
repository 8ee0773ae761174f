//! Stop command - Tear a project down.

use anyhow::Result;
use clap::Args;

use super::GlobalArgs;

#[derive(Args)]
pub struct StopArgs {
    /// Name of the project
    name: String,
}

pub async fn execute(global: &GlobalArgs, args: StopArgs) -> Result<()> {
    let engine = global.engine(true)?;
    let record = engine.stop(&args.name).await?;

    println!("⏹️  Project '{}' is {}", record.name, record.state);
    Ok(())
}
