//! `spackle list` command

use anyhow::Result;

use crate::cli::ListArgs;
use spackle::ops::{columnize, list};
use spackle::util::GlobalContext;

/// Terminal width assumed for column output.
const WIDTH: usize = 80;

pub fn execute(args: ListArgs, ctx: &GlobalContext) -> Result<()> {
    let registry = ctx.registry();
    let names = list(args.filter.as_deref(), &registry);

    if names.is_empty() {
        println!("==> No packages");
        return Ok(());
    }
    println!("==> {} packages.", names.len());
    print!("{}", columnize(&names, WIDTH));
    Ok(())
}
