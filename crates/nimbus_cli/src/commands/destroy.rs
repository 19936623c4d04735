//! Destroy command - Delete a stack.

use anyhow::Result;
use clap::Args;
use tracing::info;

use nimbus_deploy::DeployError;

use super::GlobalArgs;
use crate::prompt::StdinPrompter;

#[derive(Args)]
pub struct DestroyArgs {
    /// Delete without asking for confirmation
    #[arg(long)]
    force: bool,

    /// Stack name
    stack: String,
}

pub async fn execute(args: DestroyArgs, globals: &GlobalArgs) -> Result<()> {
    let driver = globals.driver()?;

    match driver
        .destroy(&args.stack, args.force, Some(&StdinPrompter))
        .await
    {
        Ok(()) => {
            println!("Deleting stack {}", args.stack);
            Ok(())
        }
        Err(DeployError::Aborted(stack)) => {
            info!("Stack '{}' left running", stack);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
