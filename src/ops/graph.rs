//! Implementation of `spackle graph`.

use std::fmt::Write;

use anyhow::{Context, Result};

use crate::core::registry::PackageRegistry;
use crate::core::Spec;

/// Dot graph of every package in the registry and the packages its recipe may depend on.
pub fn registry_graph(registry: &PackageRegistry) -> Result<String> {
    registry
        .graph_dependencies()
        .context("failed to compute the registry dependency graph")
}

/// Dot graph of one spec's DAG, nodes labelled with their full constraints.
pub fn spec_graph(spec: &Spec) -> String {
    let mut out = String::new();
    out.push_str("digraph G {\n");
    let _ = writeln!(out, "  label = \"{}\"", spec.name());
    out.push_str("  labelloc = \"b\"\n");
    out.push_str("  rankdir = \"TB\"\n");
    out.push('\n');

    let order = spec.traverse();
    for name in &order {
        if let Some(node) = spec.node(name) {
            let _ = writeln!(out, "  \"{}\" [label=\"{}\"]", name, node);
        }
    }
    out.push('\n');

    for name in &order {
        if let Some(node) = spec.node(name) {
            for dep in &node.dependencies {
                let _ = writeln!(out, "  \"{}\" -> \"{}\"", name, dep);
            }
        }
    }
    out.push_str("}\n");
    out
}
