//! `spackle install` command

use anyhow::{bail, Result};

use crate::cli::InstallArgs;
use spackle::builder::FakeBuilder;
use spackle::ops::{install, InstallOutcome};
use spackle::util::GlobalContext;

pub fn execute(args: InstallArgs, ctx: &GlobalContext) -> Result<()> {
    if !args.fake {
        bail!(
            "no build executor is configured\n\
             help: use `spackle install --fake` to create the install prefixes without building"
        );
    }

    let text = args.spec.join(" ");
    let result = install(&text, ctx, &FakeBuilder)?;

    for node in &result.nodes {
        let verb = match node.outcome {
            InstallOutcome::Built => "Installed",
            InstallOutcome::Reused => "Already installed",
        };
        println!("==> {} {} in {}", verb, node.spec.name(), node.prefix.display());
    }

    Ok(())
}
