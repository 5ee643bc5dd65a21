//! High-level operations.
//!
//! This module contains the implementation of spackle commands.

pub mod find;
pub mod graph;
pub mod info;
pub mod install;
pub mod uninstall;

pub use find::{find, find_installed, format_groups, InstallGroup};
pub use graph::{registry_graph, spec_graph};
pub use info::{columnize, dependents, info, list, providers, PackageInfo, VariantInfo};
pub use install::{install, install_spec, InstallOutcome, InstallResult, InstalledNode};
pub use uninstall::{uninstall, uninstall_matching, UninstallOptions};
