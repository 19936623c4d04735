//! Show command - Print a template document.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use nimbus_core::Serializer;

use super::{GlobalArgs, Workspace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Yaml,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Template to print (defaults to the only declared template)
    template: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Json)]
    format: Format,
}

pub async fn execute(args: ShowArgs, globals: &GlobalArgs) -> Result<()> {
    let workspace = Workspace::load(&globals.file)?;
    let template = workspace.template(args.template.as_deref())?;
    workspace.warn_dangling(&template)?;

    let document = match args.format {
        Format::Json => Serializer::output(&workspace.registry, &template),
        Format::Yaml => Serializer::output_yaml(&workspace.registry, &template),
    }
    .with_context(|| format!("Failed to render template '{}'", template))?;

    println!("{}", document);
    Ok(())
}
