//! Test utilities and mocks for spackle unit tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use spackle::test_support::{MockBuilder, RegistryFixture};
//!
//! #[test]
//! fn test_example() {
//!     let fixture = RegistryFixture::standard();
//!     let builder = MockBuilder::new().fail_on("mpich");
//!
//!     // Install through the fixture's registry and layout...
//! }
//! ```

pub mod fixtures;

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::builder::Builder;
use crate::core::Spec;

pub use fixtures::*;

/// Builder that records every call instead of building anything.
#[derive(Debug, Default)]
pub struct MockBuilder {
    calls: RefCell<Vec<(String, PathBuf)>>,
    fail_on: Option<String>,
}

impl MockBuilder {
    pub fn new() -> Self {
        MockBuilder::default()
    }

    /// Fail when asked to build the named package.
    pub fn fail_on(mut self, name: impl Into<String>) -> Self {
        self.fail_on = Some(name.into());
        self
    }

    /// Package names built so far, in call order.
    pub fn built(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|(name, _)| name.clone()).collect()
    }

    /// Every `(package, prefix)` pair built so far.
    pub fn calls(&self) -> Vec<(String, PathBuf)> {
        self.calls.borrow().clone()
    }
}

impl Builder for MockBuilder {
    fn build(&self, spec: &Spec, prefix: &Path) -> Result<()> {
        self.calls
            .borrow_mut()
            .push((spec.name().to_string(), prefix.to_path_buf()));
        if self.fail_on.as_deref() == Some(spec.name()) {
            bail!("mock build of {} failed", spec.name());
        }
        Ok(())
    }
}
