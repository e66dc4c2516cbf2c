//! Types command - list the document types bills are checked against.

use clap::Args;
use console::style;

use billfields_core::SchemaRegistry;

/// Arguments for the types command.
#[derive(Args)]
pub struct TypesArgs {
    /// Print the registry as JSON
    #[arg(long)]
    json: bool,
}

pub async fn run(args: TypesArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let registry = SchemaRegistry::new(config.schemas)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(registry.schemas())?);
        return Ok(());
    }

    if registry.schemas().is_empty() {
        println!("{} No document types configured", style("ℹ").blue());
        return Ok(());
    }

    for schema in registry.schemas() {
        println!("{}", style(&schema.type_name).bold());
        println!(
            "  required: {}",
            schema.required_fields.iter().cloned().collect::<Vec<_>>().join(", ")
        );
        println!(
            "  keywords: {}",
            schema.identifying_keywords.iter().cloned().collect::<Vec<_>>().join(", ")
        );
    }

    Ok(())
}
