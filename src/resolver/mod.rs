//! Dependency resolution.
//!
//! Normalization builds a spec's dependency DAG from the package recipes;
//! concretization then decides every remaining open field. Both only ever
//! narrow constraints, and both read recipes through a [`PackageRegistry`].

pub mod concretize;
pub mod normalize;

pub use concretize::{host_architecture, Concretizer, ConcretizerConfig};
pub use normalize::check_concrete;

use crate::core::error::SpecResult;
use crate::core::registry::PackageRegistry;
use crate::core::spec::Spec;

impl Spec {
    /// Build the dependency DAG from recipes, see [`normalize::normalize`].
    pub fn normalize(&mut self, registry: &PackageRegistry) -> SpecResult<()> {
        normalize::normalize(self, registry)
    }

    /// Concretize in place. On error the spec is unchanged.
    pub fn concretize(&mut self, registry: &PackageRegistry, config: &ConcretizerConfig) -> SpecResult<()> {
        Concretizer::new(registry, config).concretize(self)
    }

    /// A concretized copy of this spec.
    pub fn concretized(&self, registry: &PackageRegistry, config: &ConcretizerConfig) -> SpecResult<Spec> {
        let mut spec = self.clone();
        spec.concretize(registry, config)?;
        Ok(spec)
    }
}
