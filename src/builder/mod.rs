//! Build execution interface.
//!
//! spackle does not fetch sources or drive build tools itself. Installing a
//! concrete spec hands it and its prefix to a [`Builder`]; the prefix and its
//! record already exist when `build` is called, and a failed build makes the
//! caller remove the prefix again.

use std::path::Path;

use anyhow::{Context, Result};

use crate::core::Spec;
use crate::util::fs::ensure_dir;

/// Builds one concrete spec into an existing prefix.
pub trait Builder {
    fn build(&self, spec: &Spec, prefix: &Path) -> Result<()>;
}

/// Directories a fake install creates.
pub const FAKE_INSTALL_DIRS: &[&str] = &["bin", "lib", "include"];

/// Creates an empty install tree without building anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct FakeBuilder;

impl Builder for FakeBuilder {
    fn build(&self, spec: &Spec, prefix: &Path) -> Result<()> {
        tracing::debug!("fake install of {} into {}", spec.name(), prefix.display());
        for dir in FAKE_INSTALL_DIRS {
            ensure_dir(&prefix.join(dir))
                .with_context(|| format!("fake install of {} failed", spec.name()))?;
        }
        Ok(())
    }
}
