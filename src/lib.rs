//! spackle - a source package manager core for HPC software
//!
//! This crate provides the spec model and grammar, the concretizer and
//! virtual provider index, the package registry, and the hash-qualified
//! install directory layout.

pub mod builder;
pub mod core;
pub mod layout;
pub mod ops;
pub mod resolver;
pub mod util;

/// Test utilities and mocks for spackle unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides a fixture registry and a recording builder.
#[cfg(test)]
pub mod test_support;

pub use core::{PackageRegistry, Recipe, Spec, SpecError, SpecNode, Version, VersionConstraint};

pub use layout::{LayoutError, SpecHashLayout};
pub use resolver::{Concretizer, ConcretizerConfig};
pub use util::context::GlobalContext;
