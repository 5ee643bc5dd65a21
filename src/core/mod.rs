//! Core data structures for spackle.
//!
//! This module contains the foundational types used throughout spackle:
//! - Versions, variants and compiler constraints
//! - The spec model, its grammar and its renderings
//! - Recipes, the package registry and the virtual provider index

pub mod compiler;
pub mod error;
pub mod provider_index;
pub mod recipe;
pub mod registry;
pub mod spec;
pub mod variant;
pub mod version;

pub use compiler::CompilerSpec;
pub use error::{ParseError, SpecError, SpecResult};
pub use provider_index::ProviderIndex;
pub use recipe::Recipe;
pub use registry::PackageRegistry;
pub use spec::{Spec, SpecNode};
pub use variant::{VariantMap, VariantValue};
pub use version::{Version, VersionConstraint};
