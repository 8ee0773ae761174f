//! Versions command - Show supported tool versions.

use anyhow::Result;
use clap::Args;

use yard_templates::SupportedVersions;

use super::GlobalArgs;

#[derive(Args)]
pub struct VersionsArgs {
    /// Only show the version slots of this template
    #[arg(short, long)]
    template: Option<String>,
}

pub async fn execute(global: &GlobalArgs, args: VersionsArgs) -> Result<()> {
    let engine = global.engine(false)?;
    let supported = SupportedVersions::builtin();

    if let Some(name) = &args.template {
        let template = engine.store().get(name)?;
        println!("Version slots of {}:", template.name());
        for slot in template.version_slots() {
            let versions = supported.get(&slot.name).unwrap_or_default();
            println!(
                "  {:<10} default {:<7} supported: {}",
                slot.name,
                slot.default,
                versions.join(", ")
            );
        }
        return Ok(());
    }

    println!("Supported versions:");
    for (tool, versions) in supported.iter() {
        println!("  {:<10} {}", tool, versions.join(", "));
    }

    println!();
    println!("Template defaults:");
    for summary in engine.store().list() {
        let defaults: Vec<String> = summary
            .versions
            .iter()
            .map(|(slot, version)| format!("{}:{}", slot, version))
            .collect();
        println!("  {:<16} {}", summary.name, defaults.join(","));
    }

    Ok(())
}
