//! `spackle graph` command

use anyhow::{Context, Result};

use crate::cli::GraphArgs;
use spackle::core::Spec;
use spackle::ops::{registry_graph, spec_graph};
use spackle::util::GlobalContext;

pub fn execute(args: GraphArgs, ctx: &GlobalContext) -> Result<()> {
    let registry = ctx.registry();

    if args.spec.is_empty() {
        print!("{}", registry_graph(&registry)?);
        return Ok(());
    }

    let text = args.spec.join(" ");
    let config = ctx.concretizer_config()?;
    let spec = Spec::parse(&text)?
        .concretized(&registry, &config)
        .with_context(|| format!("failed to concretize `{}`", text))?;
    print!("{}", spec_graph(&spec));
    Ok(())
}
