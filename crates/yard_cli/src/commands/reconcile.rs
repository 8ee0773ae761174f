//! Reconcile command - Compare the registry with the projects directory.

use anyhow::{Context, Result};
use clap::Args;

use super::GlobalArgs;

#[derive(Args)]
pub struct ReconcileArgs {
    /// Remove records whose project directory no longer exists
    #[arg(long)]
    prune: bool,
}

pub async fn execute(global: &GlobalArgs, args: ReconcileArgs) -> Result<()> {
    let engine = global.engine(false)?;
    let report = engine
        .reconcile(args.prune)
        .context("Failed to reconcile the registry")?;

    if report.is_clean() && report.pruned.is_empty() {
        println!("✅ Registry and projects directory agree");
        return Ok(());
    }

    for name in &report.missing {
        println!("⚠️  missing:  {} (registered, but its files are gone)", name);
    }
    for path in &report.orphaned {
        println!("⚠️  orphaned: {} (not registered)", path.display());
    }
    for name in &report.pruned {
        println!("🧹 pruned:   {}", name);
    }
    if !args.prune && !report.missing.is_empty() {
        println!();
        println!("Run `yard reconcile --prune` to drop records whose directory is gone.");
    }

    Ok(())
}
