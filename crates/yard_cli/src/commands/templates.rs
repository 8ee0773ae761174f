//! Templates command - List available templates.

use anyhow::Result;
use clap::Args;

use super::GlobalArgs;

#[derive(Args)]
pub struct TemplatesArgs {}

pub async fn execute(global: &GlobalArgs, _args: TemplatesArgs) -> Result<()> {
    let engine = global.engine(false)?;
    let templates = engine.store().list();

    println!("📦 {} template(s) available\n", templates.len());
    for summary in templates {
        println!("{}", summary.name);
        println!("  {}", summary.description);
        if !summary.tech_stack.is_empty() {
            println!("  stack:    {}", summary.tech_stack.join(", "));
        }
        if !summary.features.is_empty() {
            println!("  features: {}", summary.features.join(", "));
        }
        if !summary.versions.is_empty() {
            let defaults: Vec<String> = summary
                .versions
                .iter()
                .map(|(slot, version)| format!("{}:{}", slot, version))
                .collect();
            println!("  versions: {}", defaults.join(","));
        }
        println!();
    }

    Ok(())
}
