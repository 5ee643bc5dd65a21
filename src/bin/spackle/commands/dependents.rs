//! `spackle dependents` command

use anyhow::Result;

use crate::cli::DependentsArgs;
use spackle::ops::dependents;
use spackle::util::GlobalContext;

pub fn execute(args: DependentsArgs, ctx: &GlobalContext) -> Result<()> {
    let found = dependents(&args.name, &ctx.registry())?;
    if found.is_empty() {
        println!("==> No packages depend on {}", args.name);
    }
    for name in found {
        println!("{}", name);
    }
    Ok(())
}
