//! `spackle providers` command

use anyhow::{bail, Result};

use crate::cli::ProvidersArgs;
use spackle::ops::providers;
use spackle::util::GlobalContext;

pub fn execute(args: ProvidersArgs, ctx: &GlobalContext) -> Result<()> {
    let registry = ctx.registry();
    let found = providers(&args.spec, &registry)?;
    if found.is_empty() {
        bail!("no package provides `{}`", args.spec);
    }
    for provider in found {
        println!("{}", provider);
    }
    Ok(())
}
