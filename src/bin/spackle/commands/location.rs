//! `spackle location` command

use anyhow::{bail, Result};

use crate::cli::LocationArgs;
use spackle::ops::find;
use spackle::util::GlobalContext;

pub fn execute(args: LocationArgs, ctx: &GlobalContext) -> Result<()> {
    let query = args.spec.join(" ");
    let matches: Vec<_> = find(Some(&query), ctx)?
        .into_iter()
        .flat_map(|group| group.installs)
        .collect();

    match matches.as_slice() {
        [] => bail!("no installed spec matches `{}`", query),
        [one] => println!("{}", one.prefix.display()),
        many => {
            let listing: Vec<String> = many.iter().map(|m| format!("  {}", m.spec)).collect();
            bail!(
                "`{}` matches {} installed specs:\n{}",
                query,
                many.len(),
                listing.join("\n")
            );
        }
    }
    Ok(())
}
