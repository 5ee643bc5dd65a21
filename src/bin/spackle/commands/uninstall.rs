//! `spackle uninstall` command

use anyhow::Result;

use crate::cli::UninstallArgs;
use spackle::ops::{uninstall, UninstallOptions};
use spackle::util::GlobalContext;

pub fn execute(args: UninstallArgs, ctx: &GlobalContext) -> Result<()> {
    let opts = UninstallOptions {
        all: args.all,
        force: args.force,
    };

    let removed = uninstall(&args.spec.join(" "), ctx, &opts)?;
    for installed in &removed {
        println!(
            "==> Successfully uninstalled {}{}",
            installed.spec.format("$_$@$+$%@$="),
            installed.spec.format("$#")
        );
    }

    Ok(())
}
