//! Implementation of `spackle install`.
//!
//! Installing concretizes the request and then walks the DAG bottom-up:
//! every dependency gets its own prefix before anything that links against
//! it. Prefixes that already hold the same spec are reused.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::builder::Builder;
use crate::core::registry::PackageRegistry;
use crate::core::Spec;
use crate::layout::{LayoutError, SpecHashLayout};
use crate::resolver::ConcretizerConfig;
use crate::util::context::GlobalContext;

/// What happened to one node of an install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// A new prefix was created and built.
    Built,
    /// The prefix already held this spec.
    Reused,
}

/// One installed node.
#[derive(Debug, Clone)]
pub struct InstalledNode {
    pub spec: Spec,
    pub prefix: PathBuf,
    pub outcome: InstallOutcome,
}

/// Result of an install.
#[derive(Debug, Clone)]
pub struct InstallResult {
    /// The concretized request.
    pub spec: Spec,
    /// Every node in install order, root last.
    pub nodes: Vec<InstalledNode>,
}

impl InstallResult {
    /// Prefix of the requested package.
    pub fn prefix(&self) -> Option<&PathBuf> {
        self.nodes.last().map(|node| &node.prefix)
    }

    /// Number of nodes that were actually built.
    pub fn built_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| node.outcome == InstallOutcome::Built)
            .count()
    }
}

/// Parse, concretize and install `spec_text` with the context's registry,
/// layout and concretizer settings.
pub fn install(spec_text: &str, ctx: &GlobalContext, builder: &dyn Builder) -> Result<InstallResult> {
    let registry = ctx.registry();
    let layout = ctx.layout()?;
    let config = ctx.concretizer_config()?;

    let abstract_spec = Spec::parse(spec_text)?;
    let spec = abstract_spec
        .concretized(&registry, &config)
        .with_context(|| format!("failed to concretize `{}`", spec_text))?;
    tracing::debug!("concretized `{}` to `{}`", spec_text, spec);

    install_spec(&spec, &registry, &layout, builder)
}

/// Install an already concrete spec, dependencies first.
pub fn install_spec(
    spec: &Spec,
    registry: &PackageRegistry,
    layout: &SpecHashLayout,
    builder: &dyn Builder,
) -> Result<InstallResult> {
    let mut nodes = Vec::with_capacity(spec.len());

    for name in spec.post_order() {
        let sub = spec
            .subspec(name)
            .with_context(|| format!("`{}` is missing from `{}`", name, spec))?;
        nodes.push(install_node(&sub, registry, layout, builder)?);
    }

    Ok(InstallResult {
        spec: spec.clone(),
        nodes,
    })
}

fn install_node(
    spec: &Spec,
    registry: &PackageRegistry,
    layout: &SpecHashLayout,
    builder: &dyn Builder,
) -> Result<InstalledNode> {
    let prefix = match layout.create_path_for(spec, registry) {
        Ok(prefix) => prefix,
        Err(LayoutError::AlreadyExists { path, .. }) => {
            tracing::info!("{} is already installed in {}", spec.name(), path.display());
            return Ok(InstalledNode {
                spec: spec.clone(),
                prefix: path,
                outcome: InstallOutcome::Reused,
            });
        }
        Err(e) => {
            return Err(e).with_context(|| format!("failed to create install prefix for `{}`", spec))
        }
    };

    tracing::info!("installing {} in {}", spec.name(), prefix.display());
    if let Err(e) = builder.build(spec, &prefix) {
        if let Err(cleanup) = layout.remove_prefix(&prefix) {
            tracing::warn!("failed to clean up {}: {}", prefix.display(), cleanup);
        }
        return Err(e.context(format!("failed to build `{}`", spec)));
    }

    Ok(InstalledNode {
        spec: spec.clone(),
        prefix,
        outcome: InstallOutcome::Built,
    })
}
