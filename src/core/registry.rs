//! The package registry: a directory of recipes, loaded lazily.
//!
//! Recipes live at `<root>/<name>/package.toml`. Each recipe is parsed at
//! most once per registry and shared as an `Rc<Recipe>`; the provider
//! index, the name list and the reverse-dependency graph are computed on
//! first use and cached for the registry's lifetime.

use std::cell::{OnceCell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::LazyLock;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use regex::Regex;
use walkdir::WalkDir;

use crate::core::error::{SpecError, SpecResult};
use crate::core::provider_index::ProviderIndex;
use crate::core::recipe::{Recipe, RECIPE_FILE};
use crate::core::spec::SpecNode;

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w[\w-]*$").expect("package name pattern is valid"));
static DOUBLED_SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[_-][_-]").expect("separator pattern is valid"));

/// Whether `name` is usable as a package name.
///
/// Names start with a word character, continue with word characters or
/// `-`, and never contain two separators in a row.
pub fn valid_package_name(name: &str) -> bool {
    NAME_RE.is_match(name) && !DOUBLED_SEPARATOR_RE.is_match(name)
}

/// Like [`valid_package_name`], as an error.
pub fn validate_package_name(name: &str) -> SpecResult<()> {
    if valid_package_name(name) {
        Ok(())
    } else {
        Err(SpecError::InvalidPackageName {
            name: name.to_string(),
        })
    }
}

/// Static dependency relation between packages, over every declared
/// dependency regardless of its condition.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    graph: DiGraph<String, ()>,
    indices: BTreeMap<String, NodeIndex>,
}

impl DependencyGraph {
    fn index(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.indices.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.to_string());
        self.indices.insert(name.to_string(), idx);
        idx
    }

    fn add_edge(&mut self, package: &str, dependency: &str) {
        let from = self.index(package);
        let to = self.index(dependency);
        self.graph.update_edge(from, to, ());
    }

    fn neighbors(&self, name: &str, direction: Direction) -> Vec<&str> {
        let Some(&idx) = self.indices.get(name) else {
            return Vec::new();
        };
        let mut names: Vec<&str> = self
            .graph
            .neighbors_directed(idx, direction)
            .map(|n| self.graph[n].as_str())
            .collect();
        names.sort_unstable();
        names
    }

    /// Packages declaring a dependency on `name`, sorted.
    pub fn dependents(&self, name: &str) -> Vec<&str> {
        self.neighbors(name, Direction::Incoming)
    }

    /// Packages `name` declares a dependency on, sorted.
    pub fn dependencies(&self, name: &str) -> Vec<&str> {
        self.neighbors(name, Direction::Outgoing)
    }

    /// Every `(package, dependency)` pair, sorted.
    pub fn edges(&self) -> Vec<(&str, &str)> {
        let mut edges: Vec<_> = self
            .graph
            .edge_indices()
            .filter_map(|e| self.graph.edge_endpoints(e))
            .map(|(a, b)| (self.graph[a].as_str(), self.graph[b].as_str()))
            .collect();
        edges.sort_unstable();
        edges
    }
}

/// A directory of package recipes.
#[derive(Debug)]
pub struct PackageRegistry {
    root: PathBuf,
    recipes: RefCell<BTreeMap<String, Rc<Recipe>>>,
    names: OnceCell<Vec<String>>,
    provider_index: OnceCell<ProviderIndex>,
    dependency_graph: OnceCell<DependencyGraph>,
}

impl PackageRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        PackageRegistry {
            root: root.into(),
            recipes: RefCell::new(BTreeMap::new()),
            names: OnceCell::new(),
            provider_index: OnceCell::new(),
            dependency_graph: OnceCell::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the recipe file for `name`, whether or not it exists.
    pub fn recipe_path(&self, name: &str) -> PathBuf {
        self.root.join(name).join(RECIPE_FILE)
    }

    /// The recipe for `name`, loading it on first use.
    pub fn get(&self, name: &str) -> SpecResult<Rc<Recipe>> {
        validate_package_name(name)?;

        if let Some(recipe) = self.recipes.borrow().get(name) {
            return Ok(Rc::clone(recipe));
        }

        let path = self.recipe_path(name);
        if !path.is_file() {
            return Err(SpecError::unknown(name));
        }

        tracing::debug!("loading recipe {}", path.display());
        let recipe = Rc::new(Recipe::load(name, &path)?);
        self.recipes
            .borrow_mut()
            .insert(name.to_string(), Rc::clone(&recipe));
        Ok(recipe)
    }

    /// Whether a recipe exists for `name`. Invalid names are simply absent.
    pub fn exists(&self, name: &str) -> bool {
        valid_package_name(name) && self.recipe_path(name).is_file()
    }

    /// Whether `name` is a virtual package: no recipe, but something provides it.
    pub fn is_virtual(&self, name: &str) -> SpecResult<bool> {
        Ok(!self.exists(name) && self.provider_index()?.contains(name))
    }

    /// Names of every package with a recipe, sorted.
    pub fn all_package_names(&self) -> &[String] {
        self.names.get_or_init(|| self.scan_names())
    }

    fn scan_names(&self) -> Vec<String> {
        if !self.root.is_dir() {
            tracing::warn!("package registry {} does not exist", self.root.display());
            return Vec::new();
        }

        WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_dir())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .filter(|name| valid_package_name(name) && self.recipe_path(name).is_file())
            .collect()
    }

    /// Every recipe, in name order.
    pub fn all_recipes(&self) -> SpecResult<Vec<Rc<Recipe>>> {
        self.all_package_names()
            .iter()
            .map(|name| self.get(name))
            .collect()
    }

    pub fn provider_index(&self) -> SpecResult<&ProviderIndex> {
        if let Some(index) = self.provider_index.get() {
            return Ok(index);
        }
        let recipes = self.all_recipes()?;
        let index = ProviderIndex::build(recipes.iter().map(Rc::as_ref));
        Ok(self.provider_index.get_or_init(|| index))
    }

    /// Provider specs able to satisfy the virtual `request`.
    pub fn providers_for(&self, request: &SpecNode) -> SpecResult<Vec<SpecNode>> {
        Ok(self.provider_index()?.providers_for(request))
    }

    /// Names of the packages able to satisfy the virtual `request`.
    pub fn provider_names_for(&self, request: &SpecNode) -> SpecResult<BTreeSet<String>> {
        Ok(self.provider_index()?.provider_names_for(request))
    }

    /// The reverse-dependency graph over every recipe.
    pub fn compute_dependents(&self) -> SpecResult<&DependencyGraph> {
        if let Some(graph) = self.dependency_graph.get() {
            return Ok(graph);
        }
        let mut graph = DependencyGraph::default();
        for recipe in self.all_recipes()? {
            graph.index(&recipe.name);
            for dep in recipe.dependency_names() {
                graph.add_edge(&recipe.name, dep);
            }
        }
        Ok(self.dependency_graph.get_or_init(|| graph))
    }

    /// Render the dependency graph of every package in Graphviz dot format.
    pub fn graph_dependencies(&self) -> SpecResult<String> {
        let graph = self.compute_dependents()?;
        let mut out = String::new();

        out.push_str("digraph G {\n");
        out.push_str("  label = \"Package Dependencies\"\n");
        out.push_str("  labelloc = \"b\"\n");
        out.push_str("  rankdir = \"LR\"\n");
        out.push_str("  ranksep = \"5\"\n");
        out.push('\n');

        for name in self.all_package_names() {
            let _ = writeln!(out, "  {:<30} [label=\"{}\"]", format!("\"{}\"", name), name);
        }
        out.push('\n');

        for (package, dependency) in graph.edges() {
            let _ = writeln!(out, "  \"{}\" -> \"{}\"", package, dependency);
        }
        out.push_str("}\n");

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixtures::RegistryFixture;

    #[test]
    fn test_package_names() {
        assert!(valid_package_name("mpich"));
        assert!(valid_package_name("netlib-blas"));
        assert!(valid_package_name("py_yaml"));
        assert!(valid_package_name("3dtk"));
        assert!(!valid_package_name(""));
        assert!(!valid_package_name("-foo"));
        assert!(!valid_package_name("foo--bar"));
        assert!(!valid_package_name("foo_-bar"));
        assert!(!valid_package_name("foo.bar"));
        assert!(!valid_package_name("../etc"));
    }

    #[test]
    fn test_get_caches_recipes() {
        let fixture = RegistryFixture::standard();
        let registry = fixture.registry();

        let a = registry.get("mpich").unwrap();
        let b = registry.get("mpich").unwrap();
        assert!(Rc::ptr_eq(&a, &b));
        assert!(registry.exists("mpich"));
        assert!(!registry.exists("no-such-package"));
    }

    #[test]
    fn test_get_errors() {
        let fixture = RegistryFixture::standard();
        let registry = fixture.registry();

        assert!(matches!(
            registry.get("foo--bar"),
            Err(SpecError::InvalidPackageName { .. })
        ));
        assert!(matches!(
            registry.get("nothing"),
            Err(SpecError::UnknownPackage { .. })
        ));
    }

    #[test]
    fn test_virtuals_and_providers() {
        let fixture = RegistryFixture::standard();
        let registry = fixture.registry();

        assert!(registry.is_virtual("mpi").unwrap());
        assert!(!registry.is_virtual("mpich").unwrap());
        assert!(!registry.is_virtual("fooproto").unwrap());

        let names = registry
            .provider_names_for(&SpecNode::new("mpi"))
            .unwrap();
        assert!(names.contains("mpich"));
        assert!(names.contains("openmpi"));
    }

    #[test]
    fn test_all_package_names_sorted() {
        let fixture = RegistryFixture::standard();
        let registry = fixture.registry();
        let names = registry.all_package_names();
        let mut sorted = names.to_vec();
        sorted.sort();
        assert_eq!(names, sorted.as_slice());
        assert!(names.iter().any(|n| n == "hypre"));
    }

    #[test]
    fn test_dependents() {
        let fixture = RegistryFixture::standard();
        let registry = fixture.registry();
        let graph = registry.compute_dependents().unwrap();

        assert!(graph.dependents("mpi").contains(&"hypre"));
        assert!(graph.dependencies("mfem").contains(&"hypre"));
        assert!(graph.dependents("no-such-package").is_empty());
    }

    #[test]
    fn test_graph_dependencies_dot() {
        let fixture = RegistryFixture::standard();
        let dot = fixture.registry().graph_dependencies().unwrap();
        assert!(dot.starts_with("digraph G {\n"));
        assert!(dot.contains("  \"hypre\" -> \"mpi\"\n"));
        assert!(dot.ends_with("}\n"));
    }

    #[test]
    fn test_missing_root_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let registry = PackageRegistry::new(dir.path().join("missing"));
        assert!(registry.all_package_names().is_empty());
        assert!(registry.all_recipes().unwrap().is_empty());
    }
}
