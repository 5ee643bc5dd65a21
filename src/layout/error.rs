//! Errors raised by the install directory layout.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::core::error::SpecError;

#[derive(Debug, Error, Diagnostic)]
pub enum LayoutError {
    #[error("`{spec}` is not concrete; install paths exist only for concrete specs")]
    #[diagnostic(code(spackle::layout::not_concrete))]
    NotConcrete { spec: String },

    #[error("`{requested}` and installed `{installed}` share the hash prefix of {}", .path.display())]
    #[diagnostic(
        code(spackle::layout::hash_collision),
        help("raise `hash_length` under [layout] and reinstall")
    )]
    HashCollision {
        path: PathBuf,
        installed: String,
        requested: String,
    },

    #[error("inconsistent install directory {}: {reason}", .path.display())]
    #[diagnostic(code(spackle::layout::inconsistent))]
    InconsistentInstall { path: PathBuf, reason: String },

    #[error("install directory {} already exists for `{spec}`", .path.display())]
    #[diagnostic(code(spackle::layout::already_exists))]
    AlreadyExists { path: PathBuf, spec: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Spec(#[from] SpecError),

    #[error("i/o error at {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LayoutError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> LayoutError {
        let path = path.into();
        move |source| LayoutError::Io { path, source }
    }
}

pub type LayoutResult<T> = std::result::Result<T, LayoutError>;
