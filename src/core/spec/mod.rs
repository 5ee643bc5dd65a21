//! The spec model: a (possibly partial) package request and its dependency DAG.
//!
//! A [`Spec`] is an arena of [`SpecNode`]s keyed by package name. Each name
//! appears at most once in the whole DAG, so two requirements on the same
//! dependency are always merged into one node and edges are just sets of
//! names. Abstract specs come from [`Spec::parse`]; the resolver narrows
//! them in place until every node is fully determined.

pub mod format;
pub mod parser;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::core::compiler::CompilerSpec;
use crate::core::error::{SpecError, SpecResult};
use crate::core::variant::VariantMap;
use crate::core::version::VersionConstraint;
use crate::util::hash::sha256_str;

pub use format::{Cover, TreeOptions, DEFAULT_HASH_LENGTH};

/// One package node of a spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecNode {
    pub name: String,
    pub versions: VersionConstraint,
    pub variants: VariantMap,
    pub compiler: Option<CompilerSpec>,
    pub architecture: Option<String>,
    /// Names of direct dependencies.
    pub dependencies: BTreeSet<String>,
    /// The node names a capability rather than an installable package.
    #[serde(rename = "virtual")]
    pub is_virtual: bool,
}

impl SpecNode {
    pub fn new(name: impl Into<String>) -> Self {
        SpecNode {
            name: name.into(),
            versions: VersionConstraint::any(),
            variants: VariantMap::new(),
            compiler: None,
            architecture: None,
            dependencies: BTreeSet::new(),
            is_virtual: false,
        }
    }

    /// The constraints of this node are compatible with `other`'s.
    ///
    /// Fields `other` leaves open always match; fields this node leaves
    /// open match anything `other` asks for, since they may still be narrowed.
    pub fn satisfies(&self, other: &SpecNode) -> bool {
        self.name == other.name
            && self.versions.satisfies(&other.versions)
            && self.variants.satisfies(&other.variants)
            && match (&self.compiler, &other.compiler) {
                (Some(mine), Some(theirs)) => mine.satisfies(theirs),
                _ => true,
            }
            && match (&self.architecture, &other.architecture) {
                (Some(mine), Some(theirs)) => mine == theirs,
                _ => true,
            }
    }

    /// Like [`satisfies`](Self::satisfies), but everything `other` asks for
    /// must already be decided here. Used to evaluate `when` predicates.
    pub fn satisfies_strict(&self, other: &SpecNode) -> bool {
        let versions_ok = other.versions.is_any()
            || self
                .versions
                .concrete()
                .is_some_and(|v| other.versions.contains(v));
        let compiler_ok = match (&self.compiler, &other.compiler) {
            (_, None) => true,
            (Some(mine), Some(theirs)) => {
                mine.name == theirs.name
                    && (theirs.versions.is_any()
                        || mine
                            .versions
                            .concrete()
                            .is_some_and(|v| theirs.versions.contains(v)))
            }
            (None, Some(_)) => false,
        };
        let arch_ok = match (&self.architecture, &other.architecture) {
            (_, None) => true,
            (mine, Some(theirs)) => mine.as_deref() == Some(theirs.as_str()),
        };

        versions_ok && self.variants.satisfies_strict(&other.variants) && compiler_ok && arch_ok
    }

    /// Narrow this node by `other`. Returns whether anything changed.
    ///
    /// Narrowing never widens: a field that is already fixed may only be
    /// confirmed, and any conflict is an error.
    pub fn constrain(&mut self, other: &SpecNode) -> SpecResult<bool> {
        if self.name != other.name {
            return Err(SpecError::unsatisfiable(
                &self.name,
                format!("cannot merge constraints for `{}`", other.name),
            ));
        }

        let mut changed = false;

        let versions = self.versions.intersect(&other.versions).ok_or_else(|| {
            SpecError::unsatisfiable(
                &self.name,
                format!("versions `{}` and `{}` do not overlap", self.versions, other.versions),
            )
        })?;
        if versions != self.versions {
            self.versions = versions;
            changed = true;
        }

        changed |= self.variants.constrain(&other.variants).map_err(|variant| {
            SpecError::unsatisfiable(&self.name, format!("conflicting values for variant `{}`", variant))
        })?;

        match (&self.compiler, &other.compiler) {
            (_, None) => {}
            (None, Some(theirs)) => {
                self.compiler = Some(theirs.clone());
                changed = true;
            }
            (Some(mine), Some(theirs)) => {
                let merged = mine.intersect(theirs).ok_or_else(|| {
                    SpecError::unsatisfiable(
                        &self.name,
                        format!("compilers `{}` and `{}` conflict", mine, theirs),
                    )
                })?;
                if &merged != mine {
                    self.compiler = Some(merged);
                    changed = true;
                }
            }
        }

        match (&self.architecture, &other.architecture) {
            (_, None) => {}
            (None, Some(theirs)) => {
                self.architecture = Some(theirs.clone());
                changed = true;
            }
            (Some(mine), Some(theirs)) if mine != theirs => {
                return Err(SpecError::unsatisfiable(
                    &self.name,
                    format!("architectures `{}` and `{}` conflict", mine, theirs),
                ));
            }
            _ => {}
        }

        Ok(changed)
    }

    /// The same constraints, without any edges.
    pub fn without_dependencies(&self) -> SpecNode {
        SpecNode {
            dependencies: BTreeSet::new(),
            ..self.clone()
        }
    }
}

impl fmt::Display for SpecNode {
    /// `name@versions+variants k=v%compiler=arch`, omitting open fields.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.versions.is_any() {
            write!(f, "@{}", self.versions)?;
        }
        write!(f, "{}", self.variants)?;
        if let Some(compiler) = &self.compiler {
            write!(f, "{}", compiler)?;
        }
        if let Some(arch) = &self.architecture {
            write!(f, "={}", arch)?;
        }
        Ok(())
    }
}

/// A package request plus its dependency DAG.
#[derive(Debug, Clone, Serialize)]
pub struct Spec {
    root: String,
    nodes: BTreeMap<String, SpecNode>,
    /// Virtual name -> provider chosen for it.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    provided_by: BTreeMap<String, String>,
    #[serde(skip)]
    normal: bool,
    #[serde(skip)]
    concrete: bool,
}

impl Spec {
    /// A spec consisting of a single node.
    pub fn from_node(node: SpecNode) -> Self {
        let root = node.name.clone();
        let mut nodes = BTreeMap::new();
        nodes.insert(root.clone(), node);
        Spec {
            root,
            nodes,
            provided_by: BTreeMap::new(),
            normal: false,
            concrete: false,
        }
    }

    /// A spec naming only a package.
    pub fn named(name: impl Into<String>) -> Self {
        Spec::from_node(SpecNode::new(name))
    }

    /// Parse spec text, see [`parser`] for the grammar.
    pub fn parse(text: &str) -> SpecResult<Self> {
        parser::parse(text)
    }

    /// Name of the root package.
    pub fn name(&self) -> &str {
        &self.root
    }

    pub fn root(&self) -> &SpecNode {
        &self.nodes[&self.root]
    }

    pub fn root_mut(&mut self) -> &mut SpecNode {
        self.nodes
            .get_mut(&self.root)
            .unwrap_or_else(|| unreachable!("root node is always present"))
    }

    pub fn node(&self, name: &str) -> Option<&SpecNode> {
        self.nodes.get(name)
    }

    pub fn node_mut(&mut self, name: &str) -> Option<&mut SpecNode> {
        self.nodes.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// All nodes in name order, root included.
    pub fn nodes(&self) -> impl Iterator<Item = &SpecNode> {
        self.nodes.values()
    }

    /// All nodes except the root, in name order.
    pub fn dependency_nodes(&self) -> impl Iterator<Item = &SpecNode> {
        self.nodes.values().filter(move |n| n.name != self.root)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add `child` as a dependency of `parent`, merging it into an existing
    /// node of the same name.
    pub fn add_dependency(&mut self, parent: &str, child: SpecNode) -> SpecResult<()> {
        if !self.nodes.contains_key(parent) {
            return Err(SpecError::unknown(parent));
        }
        let child_name = child.name.clone();
        self.merge_node(child)?;
        if let Some(p) = self.nodes.get_mut(parent) {
            p.dependencies.insert(child_name);
        }
        self.invalidate();
        Ok(())
    }

    /// Merge `node`'s constraints into the node of the same name, inserting it
    /// when absent. Edges of `node` are ignored.
    pub fn merge_node(&mut self, node: SpecNode) -> SpecResult<bool> {
        match self.nodes.get_mut(&node.name) {
            Some(existing) => existing.constrain(&node),
            None => {
                self.nodes.insert(node.name.clone(), node.without_dependencies());
                Ok(true)
            }
        }
    }

    /// Remove a node and every edge pointing at it.
    pub(crate) fn remove_node(&mut self, name: &str) -> Option<SpecNode> {
        let removed = self.nodes.remove(name)?;
        for node in self.nodes.values_mut() {
            node.dependencies.remove(name);
        }
        self.invalidate();
        Some(removed)
    }

    /// Drop every edge; used before the DAG is rebuilt from recipes.
    pub(crate) fn clear_edges(&mut self) {
        for node in self.nodes.values_mut() {
            node.dependencies.clear();
        }
    }

    /// Replace the root name, used when a virtual root is swapped for a provider.
    pub(crate) fn set_root(&mut self, name: &str) {
        self.root = name.to_string();
    }

    pub(crate) fn record_provider(&mut self, virtual_name: &str, provider: &str) {
        self.provided_by
            .insert(virtual_name.to_string(), provider.to_string());
    }

    /// The provider chosen for a virtual package, if concretization picked one.
    pub fn provider_of(&self, virtual_name: &str) -> Option<&str> {
        self.provided_by.get(virtual_name).map(String::as_str)
    }

    /// Node names reachable from the root in pre-order, children in name order.
    pub fn traverse(&self) -> Vec<&str> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut seen = BTreeSet::new();
        self.visit(&self.root, &mut seen, &mut order);
        order
    }

    fn visit<'a>(&'a self, name: &'a str, seen: &mut BTreeSet<&'a str>, order: &mut Vec<&'a str>) {
        if !seen.insert(name) {
            return;
        }
        order.push(name);
        if let Some(node) = self.nodes.get(name) {
            for dep in &node.dependencies {
                self.visit(dep, seen, order);
            }
        }
    }

    /// Nodes with an edge to `name`, in name order.
    pub fn dependents_of(&self, name: &str) -> Vec<&str> {
        self.nodes
            .values()
            .filter(|n| n.dependencies.contains(name))
            .map(|n| n.name.as_str())
            .collect()
    }

    /// The sub-DAG rooted at `name`, keeping this spec's normal and concrete state.
    pub fn subspec(&self, name: &str) -> Option<Spec> {
        let node = self.nodes.get(name)?;
        let mut sub = Spec::from_node(node.clone());
        let mut stack: Vec<&str> = node.dependencies.iter().map(String::as_str).collect();
        while let Some(dep) = stack.pop() {
            if sub.nodes.contains_key(dep) {
                continue;
            }
            if let Some(dep_node) = self.nodes.get(dep) {
                stack.extend(dep_node.dependencies.iter().map(String::as_str));
                sub.nodes.insert(dep.to_string(), dep_node.clone());
            }
        }
        sub.provided_by = self
            .provided_by
            .iter()
            .filter(|(_, provider)| sub.nodes.contains_key(*provider))
            .map(|(v, p)| (v.clone(), p.clone()))
            .collect();
        sub.normal = self.normal;
        sub.concrete = self.concrete;
        Some(sub)
    }

    /// Node names reachable from the root with every node after its dependencies.
    pub fn post_order(&self) -> Vec<&str> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut seen = BTreeSet::new();
        self.visit_post(&self.root, &mut seen, &mut order);
        order
    }

    fn visit_post<'a>(&'a self, name: &'a str, seen: &mut BTreeSet<&'a str>, order: &mut Vec<&'a str>) {
        if !seen.insert(name) {
            return;
        }
        if let Some(node) = self.nodes.get(name) {
            for dep in &node.dependencies {
                self.visit_post(dep, seen, order);
            }
        }
        order.push(name);
    }

    /// Whether this spec is compatible with `other`.
    ///
    /// The roots must satisfy each other's constraints and every other node
    /// `other` names must be present here (possibly narrower). A virtual
    /// dependency in `other` is matched by the provider chosen for it, and
    /// so is a virtual root. A virtual's version constraint refers to the
    /// interface, so only the other fields are compared against the provider.
    pub fn satisfies(&self, other: &Spec) -> bool {
        let root_ok = if self.provider_of(other.name()) == Some(self.name()) {
            let mut wanted = other.root().without_dependencies();
            wanted.name = self.root.clone();
            wanted.versions = VersionConstraint::any();
            self.root().satisfies(&wanted)
        } else {
            self.root().satisfies(other.root())
        };
        if !root_ok {
            return false;
        }
        other.dependency_nodes().all(|theirs| match self.nodes.get(&theirs.name) {
            Some(mine) => mine.satisfies(theirs),
            None => self
                .provided_by
                .get(&theirs.name)
                .is_some_and(|p| self.nodes.contains_key(p)),
        })
    }

    /// Merge every node of `other` into this spec. Returns whether anything changed.
    pub fn constrain(&mut self, other: &Spec) -> SpecResult<bool> {
        if self.root != other.root {
            return Err(SpecError::unsatisfiable(
                &self.root,
                format!("cannot constrain with a spec for `{}`", other.root),
            ));
        }
        let mut changed = false;
        for node in other.nodes() {
            changed |= self.merge_node(node.clone())?;
            if node.name != self.root && !self.root().dependencies.contains(&node.name) {
                let reachable = self.traverse().contains(&node.name.as_str());
                if !reachable {
                    self.root_mut().dependencies.insert(node.name.clone());
                    changed = true;
                }
            }
        }
        if changed {
            self.invalidate();
        }
        Ok(changed)
    }

    /// Virtual dependencies have been expanded and the DAG built from recipes.
    pub fn is_normal(&self) -> bool {
        self.normal
    }

    /// Every field of every node is exactly determined.
    pub fn is_concrete(&self) -> bool {
        self.concrete
    }

    pub(crate) fn set_normal(&mut self, normal: bool) {
        self.normal = normal;
        if !normal {
            self.concrete = false;
        }
    }

    pub(crate) fn set_concrete(&mut self, concrete: bool) {
        self.concrete = concrete;
        if concrete {
            self.normal = true;
        }
    }

    /// Mark the spec concrete and normal without checking.
    ///
    /// Only for records read back from an install whose recipe is gone.
    pub(crate) fn assume_concrete(&mut self) {
        self.set_concrete(true);
    }

    fn invalidate(&mut self) {
        self.normal = false;
        self.concrete = false;
    }

    /// Full SHA-256 digest of the canonical record rendering.
    pub fn dag_hash(&self) -> String {
        sha256_str(&self.tree(&TreeOptions::record()))
    }

    /// The first `len` hex characters of [`dag_hash`](Self::dag_hash).
    pub fn hash_prefix(&self, len: usize) -> String {
        let hash = self.dag_hash();
        hash[..len.min(hash.len())].to_string()
    }
}

impl PartialEq for Spec {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root && self.nodes == other.nodes
    }
}

impl Eq for Spec {}

impl fmt::Display for Spec {
    /// The root node followed by ` ^dep` for every other node in name order.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root())?;
        for dep in self.dependency_nodes() {
            write!(f, " ^{}", dep)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Spec {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Spec::parse(s)
    }
}
