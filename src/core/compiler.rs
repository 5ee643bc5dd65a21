//! Compiler constraints (`%gcc@4.9`).

use std::fmt;

use serde::Serialize;

use crate::core::version::VersionConstraint;

/// A compiler name plus a version constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CompilerSpec {
    pub name: String,
    pub versions: VersionConstraint,
}

impl CompilerSpec {
    pub fn new(name: impl Into<String>, versions: VersionConstraint) -> Self {
        CompilerSpec {
            name: name.into(),
            versions,
        }
    }

    /// Name and exact version are both known.
    pub fn is_concrete(&self) -> bool {
        self.versions.concrete().is_some()
    }

    pub fn satisfies(&self, other: &CompilerSpec) -> bool {
        self.name == other.name && self.versions.satisfies(&other.versions)
    }

    /// Narrow this compiler by `other`; `None` if they cannot both hold.
    pub fn intersect(&self, other: &CompilerSpec) -> Option<CompilerSpec> {
        if self.name != other.name {
            return None;
        }
        let versions = self.versions.intersect(&other.versions)?;
        Some(CompilerSpec::new(self.name.clone(), versions))
    }

    /// Render as `name@version` without the leading `%`, as used in install paths.
    pub fn path_component(&self) -> String {
        if self.versions.is_any() {
            self.name.clone()
        } else {
            format!("{}@{}", self.name, self.versions)
        }
    }
}

impl fmt::Display for CompilerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.path_component())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compiler_display() {
        let gcc = CompilerSpec::new("gcc", VersionConstraint::parse("4.9.2").unwrap());
        assert_eq!(gcc.to_string(), "%gcc@4.9.2");
        assert!(gcc.is_concrete());

        let any = CompilerSpec::new("clang", VersionConstraint::any());
        assert_eq!(any.to_string(), "%clang");
        assert!(!any.is_concrete());
    }

    #[test]
    fn test_compiler_intersect() {
        let a = CompilerSpec::new("gcc", VersionConstraint::parse("4:").unwrap());
        let b = CompilerSpec::new("gcc", VersionConstraint::parse("4.9.2").unwrap());
        assert_eq!(a.intersect(&b), Some(b.clone()));
        assert!(b.satisfies(&a));

        let c = CompilerSpec::new("clang", VersionConstraint::any());
        assert_eq!(a.intersect(&c), None);
    }
}
