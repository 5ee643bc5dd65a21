//! Package recipes: the declarative `package.toml` describing one package.
//!
//! A recipe lists the versions that can be built, the variants the package
//! understands, its (possibly conditional) dependencies and the virtual
//! packages it provides.
//!
//! ```toml
//! description = "Scalable linear solvers"
//!
//! [[versions]]
//! version = "2.9.0b"
//! checksum = "b1d0b4d6ad6e8d2a8f8e5d5b1e7b4c11"
//!
//! [variants.debug]
//! default = false
//!
//! [[dependencies]]
//! spec = "metis"
//! when = "+mpipar"
//!
//! [[provides]]
//! spec = "mpi@:3"
//! when = "@3:"
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::core::error::{SpecError, SpecResult};
use crate::core::spec::parser::parse_node;
use crate::core::spec::SpecNode;
use crate::core::variant::VariantValue;
use crate::core::version::{Version, VersionConstraint};

/// File name of a recipe inside its package directory.
pub const RECIPE_FILE: &str = "package.toml";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRecipe {
    description: Option<String>,
    homepage: Option<String>,
    #[serde(default)]
    versions: Vec<RawVersion>,
    #[serde(default)]
    variants: BTreeMap<String, RawVariant>,
    #[serde(default)]
    dependencies: Vec<RawConditional>,
    #[serde(default)]
    provides: Vec<RawConditional>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawVersion {
    version: String,
    checksum: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawVariant {
    default: VariantValue,
    #[serde(default)]
    values: Vec<String>,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConditional {
    spec: String,
    when: Option<String>,
}

/// A variant declared by a recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantDecl {
    pub default: VariantValue,
    /// Allowed values of a valued variant; empty means any value.
    pub values: Vec<String>,
    pub description: String,
}

impl VariantDecl {
    /// `value` has the same kind as the default and is among the allowed values.
    pub fn allows(&self, value: &VariantValue) -> bool {
        match (&self.default, value) {
            (VariantValue::Bool(_), VariantValue::Bool(_)) => true,
            (VariantValue::Value(_), VariantValue::Value(v)) => {
                self.values.is_empty() || self.values.iter().any(|allowed| allowed == v)
            }
            _ => false,
        }
    }
}

/// A dependency or `provides` declaration, active only when `when` holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conditional {
    pub spec: SpecNode,
    pub when: Option<SpecNode>,
}

impl Conditional {
    /// The predicate holds for `node`. Every field it asks for must already be decided.
    pub fn applies_to(&self, node: &SpecNode) -> bool {
        self.when
            .as_ref()
            .map_or(true, |when| node.satisfies_strict(when))
    }
}

/// A loaded and validated recipe.
#[derive(Debug, Clone)]
pub struct Recipe {
    pub name: String,
    pub path: PathBuf,
    pub description: Option<String>,
    pub homepage: Option<String>,
    /// Declared versions and their archive checksums.
    pub versions: BTreeMap<Version, String>,
    pub variants: BTreeMap<String, VariantDecl>,
    pub dependencies: Vec<Conditional>,
    pub provides: Vec<Conditional>,
}

impl Recipe {
    /// Read and validate the recipe file at `path` for package `name`.
    pub fn load(name: &str, path: &Path) -> SpecResult<Recipe> {
        let content = std::fs::read_to_string(path).map_err(|source| SpecError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Recipe::parse(name, path, &content)
    }

    /// Validate recipe TOML text. `path` is only used in error messages.
    pub fn parse(name: &str, path: &Path, content: &str) -> SpecResult<Recipe> {
        let invalid = |message: String| SpecError::InvalidRecipe {
            name: name.to_string(),
            path: path.to_path_buf(),
            message,
        };

        let raw: RawRecipe = toml::from_str(content).map_err(|e| invalid(e.message().to_string()))?;

        let mut versions = BTreeMap::new();
        for entry in raw.versions {
            let version = Version::parse(&entry.version).map_err(|e| invalid(e.to_string()))?;
            if !is_checksum(&entry.checksum) {
                return Err(invalid(format!(
                    "checksum for version {} is not an md5, sha1 or sha256 hex digest",
                    version
                )));
            }
            if versions.insert(version.clone(), entry.checksum).is_some() {
                return Err(invalid(format!("version {} is declared twice", version)));
            }
        }

        let mut variants = BTreeMap::new();
        for (variant, decl) in raw.variants {
            match &decl.default {
                VariantValue::Bool(_) if !decl.values.is_empty() => {
                    return Err(invalid(format!(
                        "boolean variant `{}` cannot list values",
                        variant
                    )));
                }
                VariantValue::Value(v) if !decl.values.is_empty() && !decl.values.contains(v) => {
                    return Err(invalid(format!(
                        "default `{}` of variant `{}` is not one of its values",
                        v, variant
                    )));
                }
                _ => {}
            }
            variants.insert(
                variant,
                VariantDecl {
                    default: decl.default,
                    values: decl.values,
                    description: decl.description,
                },
            );
        }

        let dependencies = raw
            .dependencies
            .iter()
            .map(|dep| conditional(name, dep).map_err(|e| invalid(e.to_string())))
            .collect::<SpecResult<Vec<_>>>()?;
        if let Some(dep) = dependencies.iter().find(|d| d.spec.name == name) {
            return Err(invalid(format!("`{}` cannot depend on itself", dep.spec.name)));
        }

        let provides = raw
            .provides
            .iter()
            .map(|p| conditional(name, p).map_err(|e| invalid(e.to_string())))
            .collect::<SpecResult<Vec<_>>>()?;

        Ok(Recipe {
            name: name.to_string(),
            path: path.to_path_buf(),
            description: raw.description,
            homepage: raw.homepage,
            versions,
            variants,
            dependencies,
            provides,
        })
    }

    /// Declared versions, oldest first.
    pub fn versions(&self) -> impl DoubleEndedIterator<Item = &Version> {
        self.versions.keys()
    }

    pub fn has_version(&self, version: &Version) -> bool {
        self.versions.contains_key(version)
    }

    pub fn checksum(&self, version: &Version) -> Option<&str> {
        self.versions.get(version).map(String::as_str)
    }

    /// The highest declared version admitted by `constraint`.
    pub fn highest_version_in(&self, constraint: &VersionConstraint) -> Option<&Version> {
        constraint.highest_in(self.versions.keys())
    }

    pub fn variant(&self, name: &str) -> Option<&VariantDecl> {
        self.variants.get(name)
    }

    /// Dependencies whose `when` predicate holds for `node`.
    pub fn dependencies_for<'a>(&'a self, node: &'a SpecNode) -> impl Iterator<Item = &'a SpecNode> {
        self.dependencies
            .iter()
            .filter(move |d| d.applies_to(node))
            .map(|d| &d.spec)
    }

    /// Names of every package this recipe may depend on, whatever the conditions.
    pub fn dependency_names(&self) -> BTreeSet<&str> {
        self.dependencies.iter().map(|d| d.spec.name.as_str()).collect()
    }

    /// Names of every virtual package this recipe may provide.
    pub fn provides(&self, virtual_name: &str) -> bool {
        self.provides.iter().any(|p| p.spec.name == virtual_name)
    }
}

/// Parse a declaration. A `when` without a package name refers to the recipe itself.
fn conditional(package: &str, raw: &RawConditional) -> SpecResult<Conditional> {
    let spec = parse_node(&raw.spec)?;
    let when = match raw.when.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(text) if text.starts_with(['@', '+', '~', '%', '=']) => {
            Some(parse_node(&format!("{}{}", package, text))?)
        }
        Some(text) if text.contains('=') && !text.starts_with(package) => {
            Some(parse_node(&format!("{} {}", package, text))?)
        }
        Some(text) => Some(parse_node(text)?),
    };
    if let Some(when) = &when {
        if when.name != package {
            return Err(SpecError::InvalidDependency {
                package: package.to_string(),
                extra: vec![format!("condition on `{}`", when.name)],
            });
        }
    }
    Ok(Conditional { spec, when })
}

fn is_checksum(s: &str) -> bool {
    matches!(s.len(), 32 | 40 | 64) && s.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HYPRE: &str = r#"
description = "Scalable linear solvers and multigrid methods"
homepage = "https://computation.llnl.gov/project/linear_solvers/software.php"

[[versions]]
version = "2.9.0b"
checksum = "b1d0b4d6ad6e8d2a8f8e5d5b1e7b4c11"

[[versions]]
version = "2.10.0b"
checksum = "378e2cd19f944bb0ed01e1d486277b9c"

[variants.debug]
default = false
description = "Build with debugging symbols"

[variants.blas]
default = "openblas"
values = ["openblas", "atlas"]

[[dependencies]]
spec = "mpi"

[[dependencies]]
spec = "metis@5:"
when = "+debug"

[[provides]]
spec = "solver"
when = "@2.10:"
"#;

    fn hypre() -> Recipe {
        Recipe::parse("hypre", Path::new("hypre/package.toml"), HYPRE).unwrap()
    }

    #[test]
    fn test_parse_recipe() {
        let r = hypre();
        let versions: Vec<_> = r.versions().map(Version::as_str).collect();
        assert_eq!(versions, vec!["2.9.0b", "2.10.0b"]);
        assert_eq!(
            r.checksum(&Version::parse("2.9.0b").unwrap()),
            Some("b1d0b4d6ad6e8d2a8f8e5d5b1e7b4c11")
        );
        assert!(r.checksum(&Version::parse("2.11.0b").unwrap()).is_none());
        assert_eq!(r.dependency_names().into_iter().collect::<Vec<_>>(), vec!["metis", "mpi"]);
        assert!(r.provides("solver"));
        assert_eq!(
            r.highest_version_in(&VersionConstraint::any()).map(Version::as_str),
            Some("2.10.0b")
        );
    }

    #[test]
    fn test_conditional_dependencies() {
        let r = hypre();
        let plain = parse_node("hypre").unwrap();
        let names: Vec<_> = r.dependencies_for(&plain).map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["mpi"]);

        let debug = parse_node("hypre+debug").unwrap();
        let names: Vec<_> = r.dependencies_for(&debug).map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["mpi", "metis"]);
    }

    #[test]
    fn test_variant_values() {
        let r = hypre();
        let blas = r.variant("blas").unwrap();
        assert!(blas.allows(&VariantValue::Value("atlas".into())));
        assert!(!blas.allows(&VariantValue::Value("mkl".into())));
        assert!(!blas.allows(&VariantValue::Bool(true)));
        assert!(r.variant("debug").unwrap().allows(&VariantValue::Bool(true)));
    }

    #[test]
    fn test_invalid_recipes() {
        let path = Path::new("x/package.toml");
        let bad_checksum = "[[versions]]\nversion = \"1.0\"\nchecksum = \"xyz\"\n";
        assert!(matches!(
            Recipe::parse("x", path, bad_checksum),
            Err(SpecError::InvalidRecipe { .. })
        ));

        let missing_checksum = "[[versions]]\nversion = \"1.0\"\n";
        assert!(matches!(
            Recipe::parse("x", path, missing_checksum),
            Err(SpecError::InvalidRecipe { .. })
        ));

        let twice = "[[versions]]\nversion = \"1.0\"\nchecksum = \"44d667c142d7cda120332623eab69f40\"\n\
                     [[versions]]\nversion = \"1.0\"\nchecksum = \"44d667c142d7cda120332623eab69f40\"\n";
        assert!(Recipe::parse("x", path, twice).is_err());

        let bad_default = "[variants.blas]\ndefault = \"mkl\"\nvalues = [\"atlas\"]\n";
        assert!(Recipe::parse("x", path, bad_default).is_err());

        let self_dep = "[[dependencies]]\nspec = \"x@1:\"\n";
        assert!(Recipe::parse("x", path, self_dep).is_err());

        let foreign_when = "[[dependencies]]\nspec = \"y\"\nwhen = \"z+debug\"\n";
        assert!(Recipe::parse("x", path, foreign_when).is_err());

        assert!(Recipe::parse("x", path, "unknown = 1\n").is_err());
    }
}
