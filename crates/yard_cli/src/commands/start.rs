//! Start command - Bring a project up.

use anyhow::Result;
use clap::Args;

use super::GlobalArgs;

#[derive(Args)]
pub struct StartArgs {
    /// Name of the project
    name: String,
}

pub async fn execute(global: &GlobalArgs, args: StartArgs) -> Result<()> {
    let engine = global.engine(true)?;
    let record = engine.start(&args.name).await?;

    println!("🚀 Project '{}' is {}", record.name, record.state);
    if let Some(domain) = &record.domain {
        println!("   https://{}", domain);
    }
    Ok(())
}
