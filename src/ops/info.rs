//! Implementation of `spackle info` and the other registry queries.

use std::fmt::{self, Write};

use anyhow::{Context, Result};

use crate::core::recipe::{Conditional, Recipe};
use crate::core::registry::PackageRegistry;
use crate::core::spec::parser::parse_node;
use crate::core::version::Version;

/// Summary of one recipe.
#[derive(Debug, Clone)]
pub struct PackageInfo {
    pub name: String,
    pub description: Option<String>,
    pub homepage: Option<String>,
    /// Newest first, with their checksums.
    pub versions: Vec<(Version, String)>,
    pub variants: Vec<VariantInfo>,
    /// Rendered dependency declarations, e.g. `metis@5: when +metis`.
    pub dependencies: Vec<String>,
    pub provides: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct VariantInfo {
    pub name: String,
    pub default: String,
    pub values: Vec<String>,
    pub description: String,
}

/// Look up `name` in the registry and summarize its recipe.
pub fn info(name: &str, registry: &PackageRegistry) -> Result<PackageInfo> {
    let recipe = registry.get(name)?;
    Ok(PackageInfo::from_recipe(&recipe))
}

impl PackageInfo {
    pub fn from_recipe(recipe: &Recipe) -> Self {
        PackageInfo {
            name: recipe.name.clone(),
            description: recipe.description.clone(),
            homepage: recipe.homepage.clone(),
            versions: recipe
                .versions
                .iter()
                .rev()
                .map(|(v, checksum)| (v.clone(), checksum.clone()))
                .collect(),
            variants: recipe
                .variants
                .iter()
                .map(|(name, decl)| VariantInfo {
                    name: name.clone(),
                    default: decl.default.to_string(),
                    values: decl.values.clone(),
                    description: decl.description.clone(),
                })
                .collect(),
            dependencies: recipe.dependencies.iter().map(render_conditional).collect(),
            provides: recipe.provides.iter().map(render_conditional).collect(),
        }
    }
}

fn render_conditional(decl: &Conditional) -> String {
    match &decl.when {
        Some(when) => format!("{} when {}", decl.spec, when),
        None => decl.spec.to_string(),
    }
}

impl fmt::Display for PackageInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Package:   {}", self.name)?;
        if let Some(homepage) = &self.homepage {
            writeln!(f, "Homepage:  {}", homepage)?;
        }

        writeln!(f)?;
        writeln!(f, "Safe versions:")?;
        if self.versions.is_empty() {
            writeln!(f, "    None")?;
        }
        for (version, checksum) in &self.versions {
            writeln!(f, "    {:<12} {}", version, checksum)?;
        }

        writeln!(f)?;
        writeln!(f, "Variants:")?;
        if self.variants.is_empty() {
            writeln!(f, "    None")?;
        }
        for variant in &self.variants {
            writeln!(f, "    {:<12} [{}]  {}", variant.name, variant.default, variant.description)?;
            if !variant.values.is_empty() {
                writeln!(f, "    {:<12} values: {}", "", variant.values.join(", "))?;
            }
        }

        writeln!(f)?;
        writeln!(f, "Dependencies:")?;
        write_list(f, &self.dependencies)?;

        writeln!(f)?;
        writeln!(f, "Virtual packages:")?;
        write_list(f, &self.provides)?;

        if let Some(description) = &self.description {
            writeln!(f)?;
            writeln!(f, "Description:")?;
            writeln!(f, "    {}", description)?;
        }
        Ok(())
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[String]) -> fmt::Result {
    if items.is_empty() {
        return writeln!(f, "    None");
    }
    for item in items {
        writeln!(f, "    {}", item)?;
    }
    Ok(())
}

/// Providers of a virtual request such as `mpi@2`, one per line.
pub fn providers(request: &str, registry: &PackageRegistry) -> Result<Vec<String>> {
    let node = parse_node(request)?;
    let providers = registry
        .providers_for(&node)
        .with_context(|| format!("failed to look up providers of `{}`", request))?;
    Ok(providers.iter().map(ToString::to_string).collect())
}

/// Packages whose recipes may depend on `name`.
pub fn dependents(name: &str, registry: &PackageRegistry) -> Result<Vec<String>> {
    registry.get(name)?;
    let graph = registry.compute_dependents()?;
    Ok(graph.dependents(name).into_iter().map(String::from).collect())
}

/// Names of every package in the registry, optionally filtered by substring.
pub fn list(filter: Option<&str>, registry: &PackageRegistry) -> Vec<String> {
    registry
        .all_package_names()
        .iter()
        .filter(|name| filter.map_or(true, |f| name.contains(f)))
        .cloned()
        .collect()
}

/// Render a list of names in columns no wider than `width`.
pub fn columnize(names: &[String], width: usize) -> String {
    let cell = names.iter().map(String::len).max().unwrap_or(0) + 2;
    let per_line = (width / cell.max(1)).max(1);
    let mut out = String::new();
    for row in names.chunks(per_line) {
        let line: String = row.iter().map(|n| format!("{:<cell$}", n, cell = cell)).collect();
        let _ = writeln!(out, "{}", line.trim_end());
    }
    out
}
