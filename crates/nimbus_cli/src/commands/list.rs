//! List command - Show running stacks.

use anyhow::Result;
use tracing::debug;

use super::GlobalArgs;

pub async fn execute(globals: &GlobalArgs) -> Result<()> {
    let driver = globals.driver()?;
    let stacks = driver.list().await?;
    debug!("Found {} stack(s)", stacks.len());

    for stack in &stacks {
        if let Some(name) = stack.name() {
            println!("{}\t{}", name, stack.stack_status);
        }
    }
    Ok(())
}
