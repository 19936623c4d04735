//! Create and update commands - Deploy a template as a stack.

use anyhow::Result;
use clap::Args;

use nimbus_core::Prompter;

use super::{GlobalArgs, Workspace};
use crate::prompt::StdinPrompter;

#[derive(Args)]
pub struct DeployArgs {
    /// Ask for every template parameter
    #[arg(long)]
    pub prompt: bool,

    /// Stack name
    pub stack: String,

    /// Template to deploy (defaults to the only declared template)
    pub template: Option<String>,
}

pub async fn create(args: DeployArgs, globals: &GlobalArgs) -> Result<()> {
    let workspace = Workspace::load(&globals.file)?;
    let template = workspace.template(args.template.as_deref())?;
    let driver = globals.driver()?;

    let prompter = args.prompt.then_some(StdinPrompter);
    let id = driver
        .create(
            &workspace.registry,
            &workspace.store,
            &args.stack,
            &template,
            prompter.as_ref().map(|p| p as &dyn Prompter),
        )
        .await?;

    println!("{}", id);
    Ok(())
}

pub async fn update(args: DeployArgs, globals: &GlobalArgs) -> Result<()> {
    let workspace = Workspace::load(&globals.file)?;
    let template = workspace.template(args.template.as_deref())?;
    let driver = globals.driver()?;

    let prompter = args.prompt.then_some(StdinPrompter);
    let id = driver
        .update(
            &workspace.registry,
            &workspace.store,
            &args.stack,
            &template,
            prompter.as_ref().map(|p| p as &dyn Prompter),
        )
        .await?;

    println!("{}", id);
    Ok(())
}
