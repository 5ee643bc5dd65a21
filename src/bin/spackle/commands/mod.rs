//! Command implementations

pub mod dependents;
pub mod find;
pub mod graph;
pub mod info;
pub mod install;
pub mod list;
pub mod location;
pub mod providers;
pub mod spec;
pub mod uninstall;
