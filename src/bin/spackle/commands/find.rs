//! `spackle find` command

use anyhow::Result;

use crate::cli::FindArgs;
use spackle::ops::{find, format_groups};
use spackle::util::GlobalContext;

pub fn execute(args: FindArgs, ctx: &GlobalContext) -> Result<()> {
    let query = (!args.spec.is_empty()).then(|| args.spec.join(" "));
    let groups = find(query.as_deref(), ctx)?;
    print!("{}", format_groups(&groups, args.paths, args.long));
    Ok(())
}
