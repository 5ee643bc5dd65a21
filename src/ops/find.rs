//! Implementation of `spackle find`.

use std::collections::BTreeMap;
use std::fmt::Write;

use anyhow::{Context, Result};

use crate::core::registry::PackageRegistry;
use crate::core::Spec;
use crate::layout::{Installed, SpecHashLayout};
use crate::util::context::GlobalContext;

/// Installs sharing an architecture and a compiler.
#[derive(Debug, Clone)]
pub struct InstallGroup {
    pub architecture: String,
    pub compiler: String,
    pub installs: Vec<Installed>,
}

/// Installed specs satisfying `query` (all of them when `None`).
pub fn find(query: Option<&str>, ctx: &GlobalContext) -> Result<Vec<InstallGroup>> {
    let query = query.map(Spec::parse).transpose()?;
    find_installed(query.as_ref(), &ctx.registry(), &ctx.layout()?)
}

pub fn find_installed(
    query: Option<&Spec>,
    registry: &PackageRegistry,
    layout: &SpecHashLayout,
) -> Result<Vec<InstallGroup>> {
    let installs = layout
        .all_installs(registry)
        .context("failed to read the install tree")?;

    let mut groups: BTreeMap<(String, String), Vec<Installed>> = BTreeMap::new();
    for installed in installs {
        if query.is_some_and(|q| !installed.spec.satisfies(q)) {
            continue;
        }
        let root = installed.spec.root();
        let key = (
            root.architecture.clone().unwrap_or_default(),
            root.compiler
                .as_ref()
                .map(|c| c.path_component())
                .unwrap_or_default(),
        );
        groups.entry(key).or_default().push(installed);
    }

    Ok(groups
        .into_iter()
        .map(|((architecture, compiler), mut installs)| {
            installs.sort_by_key(|i| i.spec.format("$_$@$+"));
            InstallGroup {
                architecture,
                compiler,
                installs,
            }
        })
        .collect())
}

/// Render groups as `-- arch / compiler --` sections of `name@version` lines.
pub fn format_groups(groups: &[InstallGroup], show_paths: bool, show_hashes: bool) -> String {
    let total: usize = groups.iter().map(|g| g.installs.len()).sum();
    let mut out = String::new();
    let _ = writeln!(out, "==> {} installed package{}.", total, if total == 1 { "" } else { "s" });

    for group in groups {
        let _ = writeln!(out, "-- {} / {} --", group.architecture, group.compiler);
        for installed in &group.installs {
            let mut line = installed.spec.format("$_$@$+");
            if show_hashes {
                line.push_str(&installed.spec.format("$#"));
            }
            if show_paths {
                let _ = writeln!(out, "    {:<40} {}", line, installed.prefix.display());
            } else {
                let _ = writeln!(out, "    {}", line);
            }
        }
    }
    out
}
