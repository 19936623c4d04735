//! Templates command - List declared templates.

use anyhow::Result;

use super::{GlobalArgs, Workspace};

pub async fn execute(globals: &GlobalArgs) -> Result<()> {
    let workspace = Workspace::load(&globals.file)?;
    let names = workspace.registry.names();

    println!();
    println!("Templates");
    println!("=========");
    if names.is_empty() {
        println!("(no templates defined)");
    }
    for name in names {
        println!("{}", name);
    }
    println!();

    Ok(())
}
