//! Test fixtures for common test scenarios.
//!
//! [`RegistryFixture`] materialises a package registry and an empty install
//! root inside a temporary directory.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::core::registry::PackageRegistry;
use crate::layout::SpecHashLayout;
use crate::util::config::Config;
use crate::util::context::GlobalContext;

/// The recipes of [`RegistryFixture::standard`].
pub const STANDARD_PACKAGES: &[(&str, &str)] = &[
    (
        "zlib",
        r#"
description = "Compression library"

[[versions]]
version = "1.2.8"
checksum = "44d667c142d7cda120332623eab69f40"

[[versions]]
version = "1.2.7"
checksum = "1e9732edcf4aa5805a48e54722816e41"
"#,
    ),
    (
        "mpich",
        r#"
description = "High-performance MPI implementation"

[[versions]]
version = "3.0.4"
checksum = "9c5d5d4fe1e17dd12153f40bc5b6dbc0"

[[versions]]
version = "3.0.3"
checksum = "0da0d0046b1add563062a0ac4ddabc6e"

[[versions]]
version = "1.0"
checksum = "cf0465e19d125a82e19fe3f205df8b69"

[[provides]]
spec = "mpi@:3"
when = "@3:"

[[provides]]
spec = "mpi@:1"
when = "@1:"
"#,
    ),
    (
        "openmpi",
        r#"
[[versions]]
version = "1.8.1"
checksum = "1e9b4360f0bed854ee908b78e379b278"

[[versions]]
version = "1.6.5"
checksum = "911f2294dabb7e55aa84f44947841adf"

[[provides]]
spec = "mpi@:2.2"
"#,
    ),
    (
        "hypre",
        r#"
description = "Scalable linear solvers and multigrid methods"

[[versions]]
version = "2.9.0b"
checksum = "b1d0b4d6ad6e8d2a8f8e5d5b1e7b4c11"

[[versions]]
version = "2.8.0b"
checksum = "5a229832a2c2f655b6e82b2f020c1879"

[variants.debug]
default = false

[[dependencies]]
spec = "mpi"
"#,
    ),
    (
        "metis",
        r#"
[[versions]]
version = "5.1.0"
checksum = "e84ae670cc144770de1c3cda5f9d15f6"

[[versions]]
version = "4.0.3"
checksum = "a66d132fabb6e545128621ba893ea832"
"#,
    ),
    (
        "mfem",
        r#"
description = "Finite element discretization library"

[[versions]]
version = "3.0.1"
checksum = "66cc46bf4e351d60d89cebe59cd646f6"

[[versions]]
version = "2.0"
checksum = "7e4c68bcb0cbab80bfe7771dfcdfad0d"

[variants.debug]
default = false

[variants.metis]
default = false
description = "Partition meshes with METIS"

[[dependencies]]
spec = "hypre"

[[dependencies]]
spec = "lapack"

[[dependencies]]
spec = "metis@5:"
when = "+metis"
"#,
    ),
    (
        "atlas",
        r#"
[[versions]]
version = "3.11.34"
checksum = "f260a70cdd6053a124b4d46c3138399d"

[[provides]]
spec = "blas"

[[provides]]
spec = "lapack"
"#,
    ),
    (
        "netlib-blas",
        r#"
[[versions]]
version = "3.5.0"
checksum = "1593844d6040fa6602ffd5ce592115c0"

[[provides]]
spec = "blas"
"#,
    ),
    (
        "netlib-lapack",
        r#"
[[versions]]
version = "3.5.0"
checksum = "866e763e890d1448bb717afa4d2c857e"

[[dependencies]]
spec = "blas"

[[provides]]
spec = "lapack"
"#,
    ),
    (
        "libelf",
        r#"
[[versions]]
version = "0.8.13"
checksum = "63ff1e71f9e22a2002b922164376f6ed"

[[versions]]
version = "0.8.12"
checksum = "405d8f0ea6469218b957cf54aed4dca4"
"#,
    ),
    (
        "libdwarf",
        r#"
[[versions]]
version = "20130729"
checksum = "7fcef64887727ffa39a4a974b575ae33"

[[dependencies]]
spec = "libelf"
"#,
    ),
    (
        "dyninst",
        r#"
[[versions]]
version = "8.1.2"
checksum = "90ee2e6f073779d42f6707d94d615862"

[[versions]]
version = "8.1.1"
checksum = "6952277848df0deaea3d7b7c79618dc4"

[[dependencies]]
spec = "libelf"

[[dependencies]]
spec = "libdwarf"
"#,
    ),
    (
        "hdf5",
        r#"
[[versions]]
version = "1.8.13"
checksum = "7d4c8b8b28780ba200c01c98f81e0d76"

[variants.mpi]
default = false

[variants.api]
default = "v18"
values = ["v16", "v18"]

[[dependencies]]
spec = "zlib@1.2:"

[[dependencies]]
spec = "mpi"
when = "+mpi"
"#,
    ),
    (
        "foo",
        r#"
[[versions]]
version = "1.0"
checksum = "b1dfe87353531b85a414010304788521"

[variants.debug]
default = false
"#,
    ),
];

/// A registry and an install root in a temporary directory.
#[derive(Debug)]
pub struct RegistryFixture {
    dir: TempDir,
}

impl RegistryFixture {
    /// An empty registry.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        std::fs::create_dir_all(dir.path().join("packages")).expect("failed to create registry");
        RegistryFixture { dir }
    }

    /// A registry holding [`STANDARD_PACKAGES`].
    pub fn standard() -> Self {
        STANDARD_PACKAGES
            .iter()
            .fold(RegistryFixture::new(), |fixture, (name, recipe)| {
                fixture.with_package(name, recipe)
            })
    }

    /// Add a recipe.
    pub fn with_package(self, name: &str, recipe: &str) -> Self {
        self.write_package(name, recipe);
        self
    }

    /// Add or overwrite a recipe.
    pub fn write_package(&self, name: &str, recipe: &str) {
        let dir = self.registry_root().join(name);
        std::fs::create_dir_all(&dir).expect("failed to create package dir");
        std::fs::write(dir.join("package.toml"), recipe).expect("failed to write recipe");
    }

    /// Remove a recipe, leaving its installs behind.
    pub fn remove_package(&self, name: &str) {
        std::fs::remove_dir_all(self.registry_root().join(name)).expect("failed to remove recipe");
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn registry_root(&self) -> PathBuf {
        self.dir.path().join("packages")
    }

    pub fn install_root(&self) -> PathBuf {
        self.dir.path().join("opt")
    }

    /// A fresh registry over the fixture's recipes.
    pub fn registry(&self) -> PackageRegistry {
        PackageRegistry::new(self.registry_root())
    }

    /// A layout over the fixture's install root with default settings.
    pub fn layout(&self) -> SpecHashLayout {
        SpecHashLayout::new(self.install_root())
    }

    /// A context whose registry and install root are the fixture's, with
    /// a fixed `linux-x86_64` default architecture.
    pub fn context(&self) -> GlobalContext {
        let mut config = Config::default();
        config.defaults.architecture = Some("linux-x86_64".to_string());

        let mut ctx = GlobalContext::with_home(self.path().to_path_buf(), self.path().join("home"))
            .with_config(config);
        ctx.set_registry_root(Some(self.registry_root()));
        ctx.set_install_root(Some(self.install_root()));
        ctx
    }
}

impl Default for RegistryFixture {
    fn default() -> Self {
        Self::new()
    }
}
