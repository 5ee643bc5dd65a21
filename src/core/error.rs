//! Error types for spec parsing, the registry and concretization.

use std::path::PathBuf;

use miette::{Diagnostic as MietteDiagnostic, SourceSpan};
use thiserror::Error;

/// Malformed spec text.
#[derive(Debug, Clone, Error, MietteDiagnostic)]
#[error("{message} in `{src}`")]
#[diagnostic(code(spackle::spec::parse))]
pub struct ParseError {
    pub message: String,
    #[source_code]
    pub src: String,
    #[label("here")]
    pub span: SourceSpan,
}

impl ParseError {
    pub fn new(message: impl Into<String>, src: &str, offset: usize, len: usize) -> Self {
        ParseError {
            message: message.into(),
            src: src.to_string(),
            span: (offset, len).into(),
        }
    }
}

/// Errors raised while parsing, normalizing or concretizing specs.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum SpecError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error("invalid package name: {name}")]
    #[diagnostic(
        code(spackle::registry::invalid_name),
        help("package names start with a letter, digit or `_` and may contain single `-` or `_` separators")
    )]
    InvalidPackageName { name: String },

    #[error("package `{name}` not found")]
    #[diagnostic(code(spackle::registry::unknown_package))]
    UnknownPackage { name: String },

    #[error("virtual package `{name}` has several providers: {}", .providers.join(", "))]
    #[diagnostic(
        code(spackle::concretize::ambiguous_provider),
        help("name the provider explicitly with `^<provider>` or set a preference under [providers]")
    )]
    AmbiguousProvider { name: String, providers: Vec<String> },

    #[error("cannot concretize `{spec}`: {reason}")]
    #[diagnostic(code(spackle::concretize::failed))]
    Concretization { spec: String, reason: String },

    #[error("unsatisfiable constraints on `{name}`: {reason}")]
    #[diagnostic(code(spackle::concretize::unsatisfiable))]
    Unsatisfiable { name: String, reason: String },

    #[error("`{package}` does not depend on {}", .extra.join(", "))]
    #[diagnostic(code(spackle::spec::invalid_dependency))]
    InvalidDependency { package: String, extra: Vec<String> },

    #[error("invalid recipe for `{name}` at {}: {message}", .path.display())]
    #[diagnostic(code(spackle::registry::invalid_recipe))]
    InvalidRecipe {
        name: String,
        path: PathBuf,
        message: String,
    },

    #[error("failed to read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SpecError {
    pub(crate) fn unknown(name: impl Into<String>) -> Self {
        SpecError::UnknownPackage { name: name.into() }
    }

    pub(crate) fn concretization(spec: impl ToString, reason: impl Into<String>) -> Self {
        SpecError::Concretization {
            spec: spec.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unsatisfiable(name: impl Into<String>, reason: impl Into<String>) -> Self {
        SpecError::Unsatisfiable {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

pub type SpecResult<T> = std::result::Result<T, SpecError>;
