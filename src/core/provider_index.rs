//! Index from virtual package names to the packages that provide them.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::recipe::Recipe;
use crate::core::spec::SpecNode;

/// One `provides` declaration of a recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEntry {
    /// What is provided, e.g. `mpi@:3`.
    pub provided: SpecNode,
    /// The providing package, narrowed by the declaration's condition, e.g. `mpich@3:`.
    pub provider: SpecNode,
}

/// Virtual name -> provider declarations, built once from every recipe.
#[derive(Debug, Clone, Default)]
pub struct ProviderIndex {
    providers: BTreeMap<String, Vec<ProviderEntry>>,
}

impl ProviderIndex {
    pub fn new() -> Self {
        ProviderIndex::default()
    }

    pub fn build<'a>(recipes: impl IntoIterator<Item = &'a Recipe>) -> Self {
        let mut index = ProviderIndex::new();
        for recipe in recipes {
            index.update(recipe);
        }
        index
    }

    /// Add the declarations of one recipe.
    pub fn update(&mut self, recipe: &Recipe) {
        for decl in &recipe.provides {
            let provider = decl
                .when
                .clone()
                .unwrap_or_else(|| SpecNode::new(&recipe.name));
            self.providers
                .entry(decl.spec.name.clone())
                .or_default()
                .push(ProviderEntry {
                    provided: decl.spec.clone(),
                    provider,
                });
        }
    }

    /// Whether anything provides `virtual_name`.
    pub fn contains(&self, virtual_name: &str) -> bool {
        self.providers.contains_key(virtual_name)
    }

    /// Every virtual name, sorted.
    pub fn virtual_names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    /// Declarations whose provided spec is compatible with `request`.
    pub fn entries_for<'a>(&'a self, request: &'a SpecNode) -> impl Iterator<Item = &'a ProviderEntry> {
        self.providers
            .get(&request.name)
            .into_iter()
            .flatten()
            .filter(move |entry| entry.provided.satisfies(request))
    }

    /// Provider specs that can satisfy `request`, sorted by provider name.
    pub fn providers_for(&self, request: &SpecNode) -> Vec<SpecNode> {
        let mut providers: Vec<SpecNode> = self
            .entries_for(request)
            .map(|entry| entry.provider.clone())
            .collect();
        providers.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.to_string().cmp(&b.to_string())));
        providers.dedup();
        providers
    }

    /// Names of the packages that can satisfy `request`.
    pub fn provider_names_for(&self, request: &SpecNode) -> BTreeSet<String> {
        self.entries_for(request)
            .map(|entry| entry.provider.name.clone())
            .collect()
    }
}
