//! Concretization: fill in every open field of a normalized spec.
//!
//! The concretizer repeats three steps until nothing changes:
//! normalize the DAG, replace virtual nodes by a provider, and then decide
//! version, variants, compiler and architecture of every node in pre-order
//! so that children can inherit from their first parent.
//!
//! Work happens on a copy; the caller's spec is only replaced on success.

use std::collections::BTreeMap;

use crate::core::compiler::CompilerSpec;
use crate::core::error::{SpecError, SpecResult};
use crate::core::registry::PackageRegistry;
use crate::core::spec::{Spec, SpecNode};
use crate::core::version::{Version, VersionConstraint, VersionItem};
use crate::resolver::normalize::{concreteness_gaps, normalize};

/// Upper bound on fixpoint rounds.
const MAX_ROUNDS: usize = 64;

/// `<os>-<arch>` of the machine running spackle.
pub fn host_architecture() -> String {
    format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH)
}

/// Site policy used to fill in open fields.
#[derive(Debug, Clone)]
pub struct ConcretizerConfig {
    /// Compiler for root nodes that name none; may omit the version.
    pub default_compiler: CompilerSpec,
    /// Architecture for root nodes that name none.
    pub default_architecture: String,
    /// Available compilers and their versions.
    pub compilers: BTreeMap<String, Vec<Version>>,
    /// Virtual name -> providers in order of preference.
    pub provider_preferences: BTreeMap<String, Vec<String>>,
    /// Fail instead of picking the lexicographically first of several providers.
    pub require_explicit_provider: bool,
}

impl Default for ConcretizerConfig {
    fn default() -> Self {
        let compilers = [("gcc", "4.9.2"), ("clang", "3.5")]
            .into_iter()
            .map(|(name, version)| {
                let versions: Vec<Version> = Version::parse(version).into_iter().collect();
                (name.to_string(), versions)
            })
            .collect();

        ConcretizerConfig {
            default_compiler: CompilerSpec::new("gcc", VersionConstraint::any()),
            default_architecture: host_architecture(),
            compilers,
            provider_preferences: BTreeMap::new(),
            require_explicit_provider: false,
        }
    }
}

/// Turns abstract specs into concrete ones.
pub struct Concretizer<'a> {
    registry: &'a PackageRegistry,
    config: &'a ConcretizerConfig,
}

impl<'a> Concretizer<'a> {
    pub fn new(registry: &'a PackageRegistry, config: &'a ConcretizerConfig) -> Self {
        Concretizer { registry, config }
    }

    /// Concretize `spec` in place. On error `spec` is left untouched.
    pub fn concretize(&self, spec: &mut Spec) -> SpecResult<()> {
        if spec.is_concrete() {
            return Ok(());
        }

        let mut work = spec.clone();
        for round in 1..=MAX_ROUNDS {
            normalize(&mut work, self.registry)?;
            let expanded = self.expand_virtuals(&mut work)?;
            let decided = !expanded && self.concretize_nodes(&mut work)?;
            tracing::debug!(round, expanded, decided, "concretizing {}", work.name());

            if !expanded && !decided {
                let gaps = concreteness_gaps(&work, self.registry)?;
                if !gaps.is_empty() {
                    return Err(SpecError::concretization(&*spec, gaps.join("; ")));
                }
                work.set_concrete(true);
                *spec = work;
                return Ok(());
            }
        }

        Err(SpecError::concretization(&*spec, "no fixed point reached"))
    }

    /// Replace every virtual node by a provider. Returns whether any was replaced.
    fn expand_virtuals(&self, spec: &mut Spec) -> SpecResult<bool> {
        let virtuals: Vec<SpecNode> = spec
            .traverse()
            .into_iter()
            .filter_map(|name| spec.node(name))
            .filter(|node| node.is_virtual)
            .cloned()
            .collect();

        for vnode in &virtuals {
            let candidates = self.registry.providers_for(&vnode.without_dependencies())?;
            let provider = self.choose_provider(spec, vnode, &candidates)?;
            tracing::debug!("providing {} with {}", vnode.name, provider);

            let mut replacement = provider_constraint(&provider, &candidates);
            replacement.compiler = vnode.compiler.clone();
            replacement.architecture = vnode.architecture.clone();

            let parents: Vec<String> = spec
                .dependents_of(&vnode.name)
                .into_iter()
                .map(str::to_string)
                .collect();

            spec.merge_node(replacement)?;
            if spec.name() == vnode.name {
                spec.set_root(&provider);
            }
            spec.remove_node(&vnode.name);
            for parent in parents {
                if let Some(p) = spec.node_mut(&parent) {
                    p.dependencies.insert(provider.clone());
                }
            }
            spec.record_provider(&vnode.name, &provider);
        }

        Ok(!virtuals.is_empty())
    }

    fn choose_provider(&self, spec: &Spec, vnode: &SpecNode, candidates: &[SpecNode]) -> SpecResult<String> {
        let mut names: Vec<&str> = candidates.iter().map(|c| c.name.as_str()).collect();
        names.dedup();

        if names.is_empty() {
            return Err(SpecError::unknown(&vnode.name));
        }
        if let Some(present) = names.iter().find(|n| spec.contains(n)) {
            return Ok(present.to_string());
        }
        if let Some(preferred) = self
            .config
            .provider_preferences
            .get(&vnode.name)
            .and_then(|prefs| prefs.iter().find(|p| names.contains(&p.as_str())))
        {
            return Ok(preferred.clone());
        }
        if names.len() > 1 && self.config.require_explicit_provider {
            return Err(SpecError::AmbiguousProvider {
                name: vnode.name.clone(),
                providers: names.iter().map(|n| n.to_string()).collect(),
            });
        }
        Ok(names[0].to_string())
    }

    /// Decide open fields of every node. Returns whether anything changed.
    fn concretize_nodes(&self, spec: &mut Spec) -> SpecResult<bool> {
        let order: Vec<String> = spec.traverse().into_iter().map(str::to_string).collect();
        let parents = first_parents(spec);
        let mut changed = false;

        for name in &order {
            let Some(node) = spec.node(name) else {
                continue;
            };
            if node.is_virtual {
                continue;
            }
            let parent = parents.get(name).and_then(|p| spec.node(p)).cloned();

            let mut next = node.clone();
            self.concretize_version(&mut next)?;
            self.concretize_variants(&mut next)?;
            self.concretize_compiler(&mut next, parent.as_ref())?;
            self.concretize_architecture(&mut next, parent.as_ref());

            if let Some(current) = spec.node_mut(name) {
                changed |= *current != next;
                *current = next;
            }
        }

        Ok(changed)
    }

    fn concretize_version(&self, node: &mut SpecNode) -> SpecResult<()> {
        let recipe = self.registry.get(&node.name)?;
        let declared = node
            .versions
            .concrete()
            .and_then(|v| recipe.versions.get_key_value(v))
            .map(|(declared, _)| declared.clone());
        if let Some(declared) = declared {
            // Equal versions may be spelled differently; keep the recipe's spelling.
            node.versions = VersionConstraint::exact(declared);
            return Ok(());
        }
        let version = recipe.highest_version_in(&node.versions).ok_or_else(|| {
            SpecError::concretization(
                &*node,
                format!("no declared version of `{}` satisfies {}", node.name, node.versions),
            )
        })?;
        tracing::debug!("{} -> version {}", node.name, version);
        node.versions = VersionConstraint::exact(version.clone());
        Ok(())
    }

    fn concretize_variants(&self, node: &mut SpecNode) -> SpecResult<()> {
        let recipe = self.registry.get(&node.name)?;

        for (name, value) in node.variants.iter() {
            match recipe.variant(name) {
                None => {
                    return Err(SpecError::concretization(
                        &*node,
                        format!("`{}` has no variant `{}`", node.name, name),
                    ))
                }
                Some(decl) if !decl.allows(value) => {
                    return Err(SpecError::concretization(
                        &*node,
                        format!("`{}` is not an allowed value of variant `{}`", value, name),
                    ))
                }
                Some(_) => {}
            }
        }
        for (name, decl) in &recipe.variants {
            if !node.variants.contains(name) {
                node.variants.insert(name.clone(), decl.default.clone());
            }
        }
        Ok(())
    }

    fn concretize_compiler(&self, node: &mut SpecNode, parent: Option<&SpecNode>) -> SpecResult<()> {
        let wanted = match (&node.compiler, parent.and_then(|p| p.compiler.as_ref())) {
            (Some(own), _) => own.clone(),
            (None, Some(inherited)) => inherited.clone(),
            (None, None) => self.config.default_compiler.clone(),
        };
        if let Some(configured) = node.compiler.as_ref().and_then(|c| self.configured_version(c)) {
            node.compiler = Some(CompilerSpec::new(
                wanted.name.clone(),
                VersionConstraint::exact(configured.clone()),
            ));
            return Ok(());
        }
        let resolved = self.resolve_compiler(&wanted).ok_or_else(|| {
            SpecError::concretization(
                &*node,
                format!("no configured compiler matches {}", wanted),
            )
        })?;
        node.compiler = Some(resolved);
        Ok(())
    }

    /// The configured version equal to the compiler's concrete version.
    fn configured_version(&self, compiler: &CompilerSpec) -> Option<&Version> {
        let wanted = compiler.versions.concrete()?;
        self.config
            .compilers
            .get(&compiler.name)?
            .iter()
            .find(|v| *v == wanted)
    }

    /// Highest configured compiler version matching `wanted`.
    fn resolve_compiler(&self, wanted: &CompilerSpec) -> Option<CompilerSpec> {
        let versions = self.config.compilers.get(&wanted.name)?;
        let version = wanted.versions.highest_in(versions)?;
        Some(CompilerSpec::new(
            wanted.name.clone(),
            VersionConstraint::exact(version.clone()),
        ))
    }

    fn concretize_architecture(&self, node: &mut SpecNode, parent: Option<&SpecNode>) {
        if node.architecture.is_some() {
            return;
        }
        node.architecture = Some(
            parent
                .and_then(|p| p.architecture.clone())
                .unwrap_or_else(|| self.config.default_architecture.clone()),
        );
    }
}

/// For every non-root node, the first node reaching it in pre-order.
fn first_parents(spec: &Spec) -> BTreeMap<String, String> {
    let mut parents = BTreeMap::new();
    for name in spec.traverse() {
        if let Some(node) = spec.node(name) {
            for dep in &node.dependencies {
                parents.entry(dep.clone()).or_insert_with(|| name.to_string());
            }
        }
    }
    parents
}

/// The constraint a chosen provider must meet: the union of the versions
/// under which it provides the requested virtual.
fn provider_constraint(provider: &str, candidates: &[SpecNode]) -> SpecNode {
    let entries: Vec<&SpecNode> = candidates.iter().filter(|c| c.name == provider).collect();
    match entries.as_slice() {
        [one] => (*one).without_dependencies(),
        _ => {
            let mut node = SpecNode::new(provider);
            if !entries.iter().any(|e| e.versions.is_any()) {
                let items: Vec<VersionItem> = entries
                    .iter()
                    .flat_map(|e| e.versions.items().iter().cloned())
                    .collect();
                node.versions = VersionConstraint::from_items(items);
            }
            node
        }
    }
}
