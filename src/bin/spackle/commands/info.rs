//! `spackle info` command

use anyhow::Result;

use crate::cli::InfoArgs;
use spackle::ops::info;
use spackle::util::GlobalContext;

pub fn execute(args: InfoArgs, ctx: &GlobalContext) -> Result<()> {
    let info = info(&args.name, &ctx.registry())?;
    print!("{}", info);
    Ok(())
}
