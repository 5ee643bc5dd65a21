//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// spackle - a source package manager for HPC software
#[derive(Parser)]
#[command(name = "spackle")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Package registry directory
    #[arg(long, global = true, env = "SPACKLE_REGISTRY", value_name = "DIR")]
    pub registry: Option<PathBuf>,

    /// Root of the install tree
    #[arg(long, global = true, env = "SPACKLE_INSTALL_ROOT", value_name = "DIR")]
    pub install_root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show how a spec is normalized and concretized
    Spec(SpecArgs),

    /// Concretize a spec and install it with its dependencies
    Install(InstallArgs),

    /// Remove installed packages
    Uninstall(UninstallArgs),

    /// List installed packages
    Find(FindArgs),

    /// List packages available in the registry
    List(ListArgs),

    /// Show details of a package recipe
    Info(InfoArgs),

    /// List the packages that provide a virtual package
    Providers(ProvidersArgs),

    /// Output a dependency graph in dot format
    Graph(GraphArgs),

    /// List packages whose recipes depend on a package
    Dependents(DependentsArgs),

    /// Print the install prefix of an installed spec
    Location(LocationArgs),
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum SpecFormat {
    /// Indented dependency tree
    #[default]
    Tree,
    /// JSON document of every node
    Json,
    /// Single line
    Flat,
}

#[derive(Args)]
pub struct SpecArgs {
    /// Spec to show, e.g. `mpileaks@1.2 ^mpich`
    #[arg(required = true, num_args = 1..)]
    pub spec: Vec<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    pub format: SpecFormat,

    /// Stop after normalization
    #[arg(long)]
    pub normalize: bool,

    /// Show the hash prefix of every node
    #[arg(short = 'l', long)]
    pub long: bool,
}

#[derive(Args)]
pub struct InstallArgs {
    /// Spec to install
    #[arg(required = true, num_args = 1..)]
    pub spec: Vec<String>,

    /// Create empty install prefixes instead of building
    #[arg(long)]
    pub fake: bool,
}

#[derive(Args)]
pub struct UninstallArgs {
    /// Spec of the installs to remove
    #[arg(required = true, num_args = 1..)]
    pub spec: Vec<String>,

    /// Remove every install matching the spec
    #[arg(short, long)]
    pub all: bool,

    /// Remove even if other installs depend on it
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args)]
pub struct FindArgs {
    /// Only show installs satisfying this spec
    pub spec: Vec<String>,

    /// Show install prefixes
    #[arg(short, long)]
    pub paths: bool,

    /// Show hash prefixes
    #[arg(short, long)]
    pub long: bool,
}

#[derive(Args)]
pub struct ListArgs {
    /// Only show packages whose name contains this text
    pub filter: Option<String>,
}

#[derive(Args)]
pub struct InfoArgs {
    /// Package name
    pub name: String,
}

#[derive(Args)]
pub struct ProvidersArgs {
    /// Virtual package, optionally with a version constraint, e.g. `mpi@2`
    pub spec: String,
}

#[derive(Args)]
pub struct GraphArgs {
    /// Graph this spec's concretized DAG instead of the whole registry
    pub spec: Vec<String>,
}

#[derive(Args)]
pub struct DependentsArgs {
    /// Package name
    pub name: String,
}

#[derive(Args)]
pub struct LocationArgs {
    /// Spec of an installed package
    #[arg(required = true, num_args = 1..)]
    pub spec: Vec<String>,
}
