//! CLI integration tests for spackle.
//!
//! These tests drive the binary against a small registry written into a
//! temporary directory, from spec display through install and uninstall.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

const PACKAGES: &[(&str, &str)] = &[
    (
        "zlib",
        r#"
description = "Compression library"

[[versions]]
version = "1.2.8"
checksum = "09551733f9407d4051e6e1e366a46ff7"

[[versions]]
version = "1.2.7"
checksum = "cceb53ad99515ab26d5e7ec0f939c43f"
"#,
    ),
    (
        "mpich",
        r#"
[[versions]]
version = "3.0.4"
checksum = "1dcd975302f2721906c3691697f0c041"

[[provides]]
spec = "mpi@:3"
"#,
    ),
    (
        "openmpi",
        r#"
[[versions]]
version = "1.8.1"
checksum = "703a841721c05104e31c788de9deeafa"

[[provides]]
spec = "mpi@:2.2"
"#,
    ),
    (
        "hypre",
        r#"
description = "Scalable linear solvers"

[[versions]]
version = "2.9.0b"
checksum = "94ac3fcae04ead88568f6ff740065f49"

[variants.debug]
default = false

[[dependencies]]
spec = "mpi"
"#,
    ),
    (
        "needs-proto",
        r#"
[[versions]]
version = "1.0"
checksum = "dcc4bef7920a90eb1fc1e916661fbb3d"

[[dependencies]]
spec = "fooproto"
"#,
    ),
];

/// A working directory with a registry, an install root and a project config.
struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        for (name, recipe) in PACKAGES {
            let pkg = dir.path().join("packages").join(name);
            fs::create_dir_all(&pkg).unwrap();
            fs::write(pkg.join("package.toml"), recipe).unwrap();
        }

        let config_dir = dir.path().join(".spackle");
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(
            config_dir.join("config.toml"),
            "[defaults]\narchitecture = \"test-arch\"\n",
        )
        .unwrap();

        Sandbox { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn install_root(&self) -> PathBuf {
        self.path().join("opt")
    }

    /// Get the spackle binary command, isolated from the real home directory.
    fn spackle(&self) -> Command {
        let mut cmd = Command::cargo_bin("spackle").unwrap();
        cmd.current_dir(self.path())
            .env("HOME", self.path().join("home"))
            .env("SPACKLE_REGISTRY", self.path().join("packages"))
            .env("SPACKLE_INSTALL_ROOT", self.install_root());
        cmd
    }
}

// ============================================================================
// spackle spec
// ============================================================================

#[test]
fn test_spec_concretizes_virtual_dependency() {
    let sandbox = Sandbox::new();

    sandbox
        .spackle()
        .args(["spec", "hypre"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Input spec"))
        .stdout(predicate::str::contains("Concretized"))
        .stdout(predicate::str::contains("hypre@2.9.0b~debug%gcc@4.9.2=test-arch"))
        .stdout(predicate::str::contains("    ^mpich@3.0.4%gcc@4.9.2=test-arch"));
}

#[test]
fn test_spec_with_explicit_provider() {
    let sandbox = Sandbox::new();

    sandbox
        .spackle()
        .args(["spec", "--format", "flat", "hypre", "^openmpi"])
        .assert()
        .success()
        .stdout(predicate::str::contains("^openmpi@1.8.1"))
        .stdout(predicate::str::contains("mpich").not());
}

#[test]
fn test_spec_json() {
    let sandbox = Sandbox::new();

    let output = sandbox
        .spackle()
        .args(["spec", "--format", "json", "zlib@1.2.7"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["root"], "zlib");
    assert_eq!(value["nodes"]["zlib"]["versions"], "1.2.7");
}

#[test]
fn test_spec_parse_error() {
    let sandbox = Sandbox::new();

    sandbox
        .spackle()
        .args(["spec", "hypre@@2"])
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("error:"));
}

#[test]
fn test_spec_unknown_virtual() {
    let sandbox = Sandbox::new();

    sandbox
        .spackle()
        .args(["spec", "needs-proto"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("fooproto"));
}

// ============================================================================
// spackle install / find / location / uninstall
// ============================================================================

#[test]
fn test_install_requires_fake() {
    let sandbox = Sandbox::new();

    sandbox
        .spackle()
        .args(["install", "zlib"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no build executor"));
}

#[test]
fn test_install_find_uninstall() {
    let sandbox = Sandbox::new();

    sandbox
        .spackle()
        .args(["install", "--fake", "hypre"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Installed mpich"))
        .stdout(predicate::str::contains("Installed hypre"));

    let compiler_dir = sandbox.install_root().join("test-arch").join("gcc@4.9.2");
    let prefixes: Vec<String> = fs::read_dir(&compiler_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(prefixes.len(), 2);
    assert!(prefixes.iter().any(|p| p.starts_with("hypre@2.9.0b~debug-")));
    for prefix in &prefixes {
        assert!(compiler_dir.join(prefix).join(".spec").is_file());
        assert!(compiler_dir.join(prefix).join("lib").is_dir());
    }

    sandbox
        .spackle()
        .args(["install", "--fake", "hypre"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Already installed hypre"));

    sandbox
        .spackle()
        .args(["find"])
        .assert()
        .success()
        .stdout(predicate::str::contains("==> 2 installed packages."))
        .stdout(predicate::str::contains("-- test-arch / gcc@4.9.2 --"))
        .stdout(predicate::str::contains("hypre@2.9.0b~debug"));

    sandbox
        .spackle()
        .args(["location", "hypre"])
        .assert()
        .success()
        .stdout(predicate::str::contains(compiler_dir.to_string_lossy().as_ref()));

    sandbox
        .spackle()
        .args(["uninstall", "mpich"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("needed by"));

    sandbox
        .spackle()
        .args(["uninstall", "hypre"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Successfully uninstalled hypre"));

    sandbox
        .spackle()
        .args(["uninstall", "mpich"])
        .assert()
        .success();

    assert!(!sandbox.install_root().join("test-arch").exists());
}

// ============================================================================
// registry queries
// ============================================================================

#[test]
fn test_list_and_info() {
    let sandbox = Sandbox::new();

    sandbox
        .spackle()
        .args(["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("==> 5 packages."))
        .stdout(predicate::str::contains("zlib"));

    sandbox
        .spackle()
        .args(["info", "zlib"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Package:   zlib"))
        .stdout(predicate::str::contains("Compression library"));

    sandbox
        .spackle()
        .args(["info", "nothere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothere"));
}

#[test]
fn test_providers_and_dependents() {
    let sandbox = Sandbox::new();

    sandbox
        .spackle()
        .args(["providers", "mpi@3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mpich"))
        .stdout(predicate::str::contains("openmpi").not());

    sandbox
        .spackle()
        .args(["dependents", "hypre"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No packages depend on hypre"));
}

#[test]
fn test_graph() {
    let sandbox = Sandbox::new();

    sandbox
        .spackle()
        .args(["graph"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("digraph G {"))
        .stdout(predicate::str::contains("\"hypre\" -> \"mpi\""));

    sandbox
        .spackle()
        .args(["graph", "hypre"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"hypre\" -> \"mpich\""));
}
