//! Rendering specs: `$`-templates, dependency trees, and reading trees back.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use crate::core::error::{ParseError, SpecResult};
use crate::core::spec::parser::parse_node;
use crate::core::spec::Spec;

/// Length of the hash rendered by the `$#` template token.
pub const DEFAULT_HASH_LENGTH: usize = 8;

/// Spaces per tree level.
const TREE_INDENT: usize = 4;

/// Which parts of the DAG a tree rendering covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cover {
    /// Each node once.
    #[default]
    Nodes,
    /// Every edge; a node's children are only expanded the first time.
    Edges,
}

/// Options for [`Spec::tree`].
#[derive(Debug, Clone, Default)]
pub struct TreeOptions {
    pub cover: Cover,
    /// Extra spaces in front of every line.
    pub indent: usize,
    /// Stop below this depth.
    pub max_depth: Option<usize>,
}

impl TreeOptions {
    /// The rendering persisted in install records and hashed for install paths.
    pub fn record() -> Self {
        TreeOptions {
            cover: Cover::Edges,
            indent: 0,
            max_depth: None,
        }
    }
}

impl Spec {
    /// Render the root node through a template.
    ///
    /// | token | renders                               |
    /// |-------|---------------------------------------|
    /// | `$_`  | package name                          |
    /// | `$@`  | `@versions`, empty when unconstrained |
    /// | `$%`  | `%compiler` without its version       |
    /// | `$%@` | `%compiler@versions`                  |
    /// | `$+`  | variants                              |
    /// | `$=`  | `=architecture`                       |
    /// | `$#`  | `-` and the first 8 hash characters   |
    /// | `$$`  | a literal `$`                         |
    pub fn format(&self, template: &str) -> String {
        let root = self.root();
        let mut out = String::new();
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('_') => out.push_str(&root.name),
                Some('@') => {
                    if !root.versions.is_any() {
                        let _ = write!(out, "@{}", root.versions);
                    }
                }
                Some('%') => {
                    let with_version = chars.peek() == Some(&'@');
                    if with_version {
                        chars.next();
                    }
                    if let Some(compiler) = &root.compiler {
                        if with_version {
                            let _ = write!(out, "{}", compiler);
                        } else {
                            let _ = write!(out, "%{}", compiler.name);
                        }
                    }
                }
                Some('+') => {
                    let _ = write!(out, "{}", root.variants);
                }
                Some('=') => {
                    if let Some(arch) = &root.architecture {
                        let _ = write!(out, "={}", arch);
                    }
                }
                Some('#') => {
                    let _ = write!(out, "-{}", self.hash_prefix(DEFAULT_HASH_LENGTH));
                }
                Some('$') => out.push('$'),
                Some(other) => {
                    out.push('$');
                    out.push(other);
                }
                None => out.push('$'),
            }
        }

        out
    }

    /// Multi-line dependency tree, one node per line, children sorted by name.
    ///
    /// ```text
    /// hypre@2.9.0b%gcc@4.9.2=linux-x86_64
    ///     ^mpich@3.0.4%gcc@4.9.2=linux-x86_64
    /// ```
    pub fn tree(&self, options: &TreeOptions) -> String {
        let mut out = String::new();
        let mut expanded = BTreeSet::new();
        self.tree_node(self.name(), 0, options, &mut expanded, &mut out);
        out
    }

    fn tree_node<'a>(
        &'a self,
        name: &'a str,
        depth: usize,
        options: &TreeOptions,
        expanded: &mut BTreeSet<&'a str>,
        out: &mut String,
    ) {
        let first_visit = expanded.insert(name);
        if options.cover == Cover::Nodes && !first_visit {
            return;
        }
        let Some(node) = self.node(name) else {
            return;
        };

        let _ = writeln!(
            out,
            "{}{}{}",
            " ".repeat(options.indent + depth * TREE_INDENT),
            if depth > 0 { "^" } else { "" },
            node
        );

        if !first_visit || options.max_depth.is_some_and(|max| depth >= max) {
            return;
        }
        for dep in &node.dependencies {
            self.tree_node(dep, depth + 1, options, expanded, out);
        }
    }

    /// Rebuild a spec, edges included, from a [`Cover::Edges`] tree rendering.
    pub fn from_tree(text: &str) -> SpecResult<Spec> {
        let mut spec: Option<Spec> = None;
        let mut stack: Vec<String> = Vec::new();
        let mut base_indent = 0;
        let mut offset = 0;

        for line in text.split('\n') {
            let line_offset = offset;
            offset += line.len() + 1;

            let body = line.trim();
            if body.is_empty() {
                continue;
            }
            let indent = line.len() - line.trim_start().len();
            let error = |message: &str| ParseError::new(message, text, line_offset, line.len());

            let Some(spec) = spec.as_mut() else {
                if body.starts_with('^') {
                    return Err(error("tree must start with the root node").into());
                }
                base_indent = indent;
                let root = parse_node(body)?;
                stack.push(root.name.clone());
                spec = Some(Spec::from_node(root));
                continue;
            };

            let Some(body) = body.strip_prefix('^') else {
                return Err(error("only the first line may be a root node").into());
            };
            if indent < base_indent + TREE_INDENT || (indent - base_indent) % TREE_INDENT != 0 {
                return Err(error("dependency line is not indented by a whole level").into());
            }
            let depth = (indent - base_indent) / TREE_INDENT;
            if depth > stack.len() {
                return Err(error("dependency line is indented too deeply").into());
            }

            let node = parse_node(body)?;
            let parent = stack[depth - 1].clone();
            stack.truncate(depth);
            stack.push(node.name.clone());
            spec.add_dependency(&parent, node)?;
        }

        spec.ok_or_else(|| ParseError::new("empty spec tree", text, 0, 0).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::spec::SpecNode;

    fn diamond() -> Spec {
        let mut s = Spec::parse("app@1.0+debug%gcc@4.9.2=linux").unwrap();
        let leaf = || SpecNode::new("zlib");
        s.add_dependency("app", SpecNode::new("left")).unwrap();
        s.add_dependency("app", SpecNode::new("right")).unwrap();
        s.add_dependency("left", leaf()).unwrap();
        s.add_dependency("right", leaf()).unwrap();
        s
    }

    #[test]
    fn test_format_tokens() {
        let s = Spec::parse("mfem@3.0.1+debug~shared%gcc@4.9.2=linux-x86_64").unwrap();
        assert_eq!(s.format("$_$@"), "mfem@3.0.1");
        assert_eq!(s.format("$_$+"), "mfem+debug~shared");
        assert_eq!(s.format("$%"), "%gcc");
        assert_eq!(s.format("$%@"), "%gcc@4.9.2");
        assert_eq!(s.format("$="), "=linux-x86_64");
        assert_eq!(s.format("cost: $$5"), "cost: $5");
        assert_eq!(s.format("$#").len(), 1 + DEFAULT_HASH_LENGTH);
    }

    #[test]
    fn test_format_omits_open_fields() {
        let s = Spec::parse("zlib").unwrap();
        assert_eq!(s.format("$_$@$%@$+$="), "zlib");
    }

    #[test]
    fn test_tree_nodes_vs_edges() {
        let s = diamond();
        let nodes = s.tree(&TreeOptions::default());
        assert_eq!(nodes.lines().filter(|l| l.contains("zlib")).count(), 1);

        let edges = s.tree(&TreeOptions::record());
        assert_eq!(edges.lines().filter(|l| l.contains("zlib")).count(), 2);
        assert!(edges.starts_with("app@1.0+debug%gcc@4.9.2=linux\n    ^left\n        ^zlib\n"));
    }

    #[test]
    fn test_tree_round_trip_keeps_edges() {
        let s = diamond();
        let back = Spec::from_tree(&s.tree(&TreeOptions::record())).unwrap();
        assert_eq!(back, s);
        assert_eq!(back.dependents_of("zlib"), vec!["left", "right"]);
    }

    #[test]
    fn test_tree_with_indent_and_depth() {
        let s = diamond();
        let opts = TreeOptions {
            cover: Cover::Edges,
            indent: 2,
            max_depth: Some(1),
        };
        let tree = s.tree(&opts);
        assert!(tree.starts_with("  app"));
        assert!(!tree.contains("zlib"));
    }

    #[test]
    fn test_from_tree_rejects_malformed() {
        assert!(Spec::from_tree("").is_err());
        assert!(Spec::from_tree("^zlib").is_err());
        assert!(Spec::from_tree("app\nzlib").is_err());
        assert!(Spec::from_tree("app\n        ^zlib").is_err());
        assert!(Spec::from_tree("app\n  ^zlib").is_err());
    }
}
