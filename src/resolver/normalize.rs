//! Normalization: rebuild a spec's dependency DAG from its recipes.
//!
//! The nodes of the incoming spec are treated as a flat pool of user
//! constraints. Starting from the root, every declared dependency whose
//! condition holds is added as an edge, and the matching pool node (if
//! any) is merged into it. Pool nodes that are never reached are an error.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::core::error::{SpecError, SpecResult};
use crate::core::registry::PackageRegistry;
use crate::core::spec::{Spec, SpecNode};

/// Upper bound on rebuild passes; each pass can only add constraints.
const MAX_PASSES: usize = 32;

/// Normalize `spec` in place against `registry`.
pub fn normalize(spec: &mut Spec, registry: &PackageRegistry) -> SpecResult<()> {
    for _ in 0..MAX_PASSES {
        let before = spec.clone();
        rebuild(spec, registry)?;
        if *spec == before {
            spec.set_normal(true);
            let concrete = check_concrete(spec, registry)?;
            spec.set_concrete(concrete);
            return Ok(());
        }
    }
    Err(SpecError::concretization(
        spec.to_string(),
        "dependency conditions did not settle",
    ))
}

fn rebuild(spec: &mut Spec, registry: &PackageRegistry) -> SpecResult<()> {
    let root_name = spec.name().to_string();
    let mut pool: BTreeMap<String, SpecNode> = spec
        .nodes()
        .map(|n| (n.name.clone(), n.without_dependencies()))
        .collect();

    let root = pool
        .remove(&root_name)
        .unwrap_or_else(|| SpecNode::new(&root_name));
    let mut rebuilt = spec.clone();
    for name in spec.nodes().map(|n| n.name.clone()).collect::<Vec<_>>() {
        if name != root_name {
            rebuilt.remove_node(&name);
        }
    }
    rebuilt.clear_edges();
    *rebuilt.root_mut() = root;

    if !registry.exists(&root_name) {
        if registry.is_virtual(&root_name)? {
            rebuilt.root_mut().is_virtual = true;
        } else {
            return Err(SpecError::unknown(&root_name));
        }
    }

    let mut queue = VecDeque::from([root_name.clone()]);
    let mut seen = BTreeSet::from([root_name.clone()]);

    while let Some(name) = queue.pop_front() {
        let node = match rebuilt.node(&name) {
            Some(node) if !node.is_virtual => node.clone(),
            _ => continue,
        };
        let recipe = registry.get(&name)?;

        for dep in recipe.dependencies_for(&node) {
            let target = dependency_target(&rebuilt, &pool, registry, dep)?;

            if target == dep.name {
                let is_virtual = !registry.exists(&dep.name);
                rebuilt.add_dependency(&name, dep.without_dependencies())?;
                if let Some(user) = pool.remove(&target) {
                    rebuilt.merge_node(user)?;
                }
                if let Some(n) = rebuilt.node_mut(&target) {
                    n.is_virtual = is_virtual;
                }
            } else {
                pool.remove(&dep.name);
                rebuilt.add_dependency(&name, SpecNode::new(&target))?;
                if let Some(user) = pool.remove(&target) {
                    rebuilt.merge_node(user)?;
                }
                rebuilt.record_provider(&dep.name, &target);
            }

            if seen.insert(target.clone()) {
                queue.push_back(target);
            }
        }
    }

    if !pool.is_empty() {
        return Err(SpecError::InvalidDependency {
            package: root_name,
            extra: pool.into_keys().collect(),
        });
    }

    *spec = rebuilt;
    Ok(())
}

/// The package a declared dependency resolves to: itself, or the provider
/// chosen for a virtual one. A virtual without a decidable provider stays
/// virtual for the concretizer.
fn dependency_target(
    spec: &Spec,
    pool: &BTreeMap<String, SpecNode>,
    registry: &PackageRegistry,
    dep: &SpecNode,
) -> SpecResult<String> {
    if registry.exists(&dep.name) {
        return Ok(dep.name.clone());
    }
    if !registry.is_virtual(&dep.name)? {
        return Err(SpecError::unknown(&dep.name));
    }
    if let Some(provider) = spec.provider_of(&dep.name) {
        return Ok(provider.to_string());
    }

    let mut request = dep.without_dependencies();
    if let Some(user) = pool.get(&dep.name) {
        request.constrain(user)?;
    }
    let candidates = registry.provider_names_for(&request)?;

    // A provider the user or another dependency already named wins.
    let present: Vec<String> = candidates
        .iter()
        .filter(|c| pool.contains_key(c.as_str()) || spec.contains(c))
        .cloned()
        .collect();
    match present.as_slice() {
        [one] => return Ok(one.clone()),
        [] => {}
        _ => {
            return Err(SpecError::AmbiguousProvider {
                name: dep.name.clone(),
                providers: present,
            })
        }
    }

    if candidates.len() == 1 {
        if let Some(only) = candidates.into_iter().next() {
            return Ok(only);
        }
    }
    Ok(dep.name.clone())
}

/// Whether every node of `spec` is fully determined with respect to its recipe.
pub fn check_concrete(spec: &Spec, registry: &PackageRegistry) -> SpecResult<bool> {
    Ok(concreteness_gaps(spec, registry)?.is_empty())
}

/// Human readable reasons why `spec` is not concrete yet.
pub(crate) fn concreteness_gaps(spec: &Spec, registry: &PackageRegistry) -> SpecResult<Vec<String>> {
    let mut gaps = Vec::new();

    for node in spec.nodes() {
        if node.is_virtual {
            gaps.push(format!("`{}` is virtual", node.name));
            continue;
        }
        let recipe = registry.get(&node.name)?;

        match node.versions.concrete() {
            Some(v) if recipe.has_version(v) => {}
            Some(v) => gaps.push(format!("`{}` has no version {}", node.name, v)),
            None => gaps.push(format!("`{}` has no exact version", node.name)),
        }
        if !node.compiler.as_ref().is_some_and(|c| c.is_concrete()) {
            gaps.push(format!("`{}` has no exact compiler", node.name));
        }
        if node.architecture.is_none() {
            gaps.push(format!("`{}` has no architecture", node.name));
        }
        for (variant, decl) in &recipe.variants {
            match node.variants.get(variant) {
                Some(value) if decl.allows(value) => {}
                Some(value) => gaps.push(format!(
                    "`{}` does not allow {}={}",
                    node.name, variant, value
                )),
                None => gaps.push(format!("`{}` leaves variant `{}` unset", node.name, variant)),
            }
        }
        for (variant, _) in node.variants.iter() {
            if recipe.variant(variant).is_none() {
                gaps.push(format!("`{}` has no variant `{}`", node.name, variant));
            }
        }
    }

    Ok(gaps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RegistryFixture;

    fn normalized(fixture: &RegistryFixture, text: &str) -> SpecResult<Spec> {
        let mut spec = Spec::parse(text)?;
        normalize(&mut spec, &fixture.registry())?;
        Ok(spec)
    }

    #[test]
    fn test_builds_edges_from_recipes() {
        let fixture = RegistryFixture::standard();
        let spec = normalized(&fixture, "dyninst").unwrap();

        assert!(spec.is_normal());
        assert!(!spec.is_concrete());
        assert_eq!(spec.traverse(), vec!["dyninst", "libdwarf", "libelf"]);
        assert_eq!(spec.dependents_of("libelf"), vec!["dyninst", "libdwarf"]);
    }

    #[test]
    fn test_merges_user_constraints() {
        let fixture = RegistryFixture::standard();
        let spec = normalized(&fixture, "dyninst ^libelf@0.8.12").unwrap();
        assert_eq!(spec.node("libelf").unwrap().versions.to_string(), "0.8.12");
    }

    #[test]
    fn test_recipe_constraint_applied() {
        let fixture = RegistryFixture::standard();
        let spec = normalized(&fixture, "hdf5").unwrap();
        assert_eq!(spec.node("zlib").unwrap().versions.to_string(), "1.2:");
        assert!(!spec.contains("mpi"));
    }

    #[test]
    fn test_conditional_dependency() {
        let fixture = RegistryFixture::standard();
        let spec = normalized(&fixture, "mfem+metis").unwrap();
        assert_eq!(spec.node("metis").unwrap().versions.to_string(), "5:");

        let spec = normalized(&fixture, "mfem").unwrap();
        assert!(!spec.contains("metis"));
    }

    #[test]
    fn test_virtual_kept_when_ambiguous() {
        let fixture = RegistryFixture::standard();
        let spec = normalized(&fixture, "hypre").unwrap();
        assert!(spec.node("mpi").unwrap().is_virtual);
    }

    #[test]
    fn test_user_named_provider() {
        let fixture = RegistryFixture::standard();
        let spec = normalized(&fixture, "hypre ^openmpi").unwrap();
        assert!(!spec.contains("mpi"));
        assert_eq!(spec.dependents_of("openmpi"), vec!["hypre"]);
        assert_eq!(spec.provider_of("mpi"), Some("openmpi"));
    }

    #[test]
    fn test_two_named_providers_are_ambiguous() {
        let fixture = RegistryFixture::standard();
        let err = normalized(&fixture, "hypre ^openmpi ^mpich").unwrap_err();
        assert!(matches!(err, SpecError::AmbiguousProvider { .. }));
    }

    #[test]
    fn test_unreachable_dependency() {
        let fixture = RegistryFixture::standard();
        let err = normalized(&fixture, "zlib ^libelf").unwrap_err();
        match err {
            SpecError::InvalidDependency { package, extra } => {
                assert_eq!(package, "zlib");
                assert_eq!(extra, vec!["libelf"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_package() {
        let fixture = RegistryFixture::standard();
        let err = normalized(&fixture, "fooproto").unwrap_err();
        assert!(matches!(err, SpecError::UnknownPackage { ref name } if name == "fooproto"));
    }

    #[test]
    fn test_idempotent() {
        let fixture = RegistryFixture::standard();
        let once = normalized(&fixture, "mfem ^hypre@2.9.0b").unwrap();
        let mut twice = once.clone();
        normalize(&mut twice, &fixture.registry()).unwrap();
        assert_eq!(once, twice);
    }
}
