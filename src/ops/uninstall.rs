//! Implementation of `spackle uninstall`.

use anyhow::{bail, Context, Result};

use crate::core::registry::PackageRegistry;
use crate::core::Spec;
use crate::layout::{Installed, SpecHashLayout};
use crate::util::context::GlobalContext;

/// Options for uninstalling.
#[derive(Debug, Clone, Default)]
pub struct UninstallOptions {
    /// Remove every install matching the query instead of requiring exactly one
    pub all: bool,

    /// Remove even if other installed specs depend on it
    pub force: bool,
}

/// Remove the installs matching `query`. Returns what was removed.
pub fn uninstall(query: &str, ctx: &GlobalContext, opts: &UninstallOptions) -> Result<Vec<Installed>> {
    let registry = ctx.registry();
    let layout = ctx.layout()?;
    let query = Spec::parse(query)?;
    uninstall_matching(&query, &registry, &layout, opts)
}

pub fn uninstall_matching(
    query: &Spec,
    registry: &PackageRegistry,
    layout: &SpecHashLayout,
    opts: &UninstallOptions,
) -> Result<Vec<Installed>> {
    let installs = layout
        .all_installs(registry)
        .context("failed to read the install tree")?;

    let (matches, others): (Vec<_>, Vec<_>) = installs
        .into_iter()
        .partition(|installed| installed.spec.satisfies(query));

    if matches.is_empty() {
        bail!("no installed spec matches `{}`", query);
    }
    if matches.len() > 1 && !opts.all {
        let listing: Vec<String> = matches.iter().map(|m| format!("  {}", m.spec)).collect();
        bail!(
            "`{}` matches {} installed specs:\n{}\nuse --all to remove all of them",
            query,
            matches.len(),
            listing.join("\n")
        );
    }

    if !opts.force {
        for target in &matches {
            let dependents = installed_dependents(&target.spec, &others);
            if !dependents.is_empty() {
                bail!(
                    "cannot remove `{}`, needed by: {}\nuse --force to remove it anyway",
                    target.spec,
                    dependents.join(", ")
                );
            }
        }
    }

    for target in &matches {
        layout
            .remove_prefix(&target.prefix)
            .with_context(|| format!("failed to remove `{}`", target.spec))?;
    }

    Ok(matches)
}

/// Installed specs whose DAG contains exactly `spec`.
fn installed_dependents(spec: &Spec, installs: &[Installed]) -> Vec<String> {
    installs
        .iter()
        .filter(|other| {
            other.spec.name() != spec.name()
                && other.spec.subspec(spec.name()).is_some_and(|sub| sub == *spec)
        })
        .map(|other| other.spec.to_string())
        .collect()
}
