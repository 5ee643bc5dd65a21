//! Install directory layout.
//!
//! Every concrete spec gets its own prefix:
//!
//! ```text
//! <root>/
//!     <architecture>/
//!         <compiler>/
//!             <name>@<version><variants>-<hash>/
//!                 .spec
//! ```
//!
//! `<hash>` is a prefix of [`Spec::dag_hash`], so specs that differ only in
//! their dependencies still get distinct prefixes. The `.spec` record holds
//! the tree rendering of the installed spec and is the only state the layout
//! keeps.

pub mod error;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::core::registry::PackageRegistry;
use crate::core::spec::{Spec, TreeOptions, DEFAULT_HASH_LENGTH};
use crate::util::fs::{prune_empty_parents, write_atomic};

pub use error::{LayoutError, LayoutResult};

/// Default file name of the install record.
pub const DEFAULT_SPEC_FILE: &str = ".spec";

/// An installed spec and the prefix its record was found in.
#[derive(Debug, Clone)]
pub struct Installed {
    pub spec: Spec,
    pub prefix: PathBuf,
}

/// Hash-qualified install layout rooted at one directory.
#[derive(Debug, Clone)]
pub struct SpecHashLayout {
    root: PathBuf,
    hash_length: usize,
    spec_file_name: String,
}

impl SpecHashLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        SpecHashLayout {
            root: root.into(),
            hash_length: DEFAULT_HASH_LENGTH,
            spec_file_name: DEFAULT_SPEC_FILE.to_string(),
        }
    }

    pub fn with_hash_length(mut self, hash_length: usize) -> Self {
        self.hash_length = hash_length;
        self
    }

    pub fn with_spec_file_name(mut self, name: impl Into<String>) -> Self {
        self.spec_file_name = name.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn hash_length(&self) -> usize {
        self.hash_length
    }

    /// `arch/compiler/name@version+variants-hash`, relative to the root.
    pub fn relative_path_for(&self, spec: &Spec) -> LayoutResult<PathBuf> {
        let not_concrete = || LayoutError::NotConcrete {
            spec: spec.to_string(),
        };
        if !spec.is_concrete() {
            return Err(not_concrete());
        }
        let root = spec.root();
        let arch = root.architecture.as_deref().ok_or_else(not_concrete)?;
        let compiler = root.compiler.as_ref().ok_or_else(not_concrete)?;

        // `~mpi api=v16` becomes `~mpi_api=v16`.
        let mut dir_name: String = spec
            .format("$_$@$+")
            .chars()
            .map(|c| if c.is_whitespace() { '_' } else { c })
            .collect();
        dir_name.push('-');
        dir_name.push_str(&spec.hash_prefix(self.hash_length));

        Ok(PathBuf::from(arch)
            .join(compiler.path_component())
            .join(dir_name))
    }

    /// Absolute install prefix of a concrete spec.
    pub fn path_for(&self, spec: &Spec) -> LayoutResult<PathBuf> {
        Ok(self.root.join(self.relative_path_for(spec)?))
    }

    /// Path of the install record of a concrete spec.
    pub fn spec_file_path(&self, spec: &Spec) -> LayoutResult<PathBuf> {
        Ok(self.record_in(&self.path_for(spec)?))
    }

    fn record_in(&self, prefix: &Path) -> PathBuf {
        prefix.join(&self.spec_file_name)
    }

    /// Whether a record exists at the spec's prefix.
    pub fn is_installed(&self, spec: &Spec) -> bool {
        self.spec_file_path(spec).is_ok_and(|p| p.is_file())
    }

    /// Create the install prefix of `spec` and write its record.
    ///
    /// Creating the leaf directory is the commit point. If it already
    /// exists, the record found there decides the error: the same spec is
    /// [`LayoutError::AlreadyExists`], a different spec with the same hash
    /// prefix is [`LayoutError::HashCollision`], anything else is
    /// [`LayoutError::InconsistentInstall`].
    pub fn create_path_for(&self, spec: &Spec, registry: &PackageRegistry) -> LayoutResult<PathBuf> {
        let path = self.path_for(spec)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(LayoutError::io(parent))?;
        }

        match fs::create_dir(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(self.existing_install_error(&path, spec, registry));
            }
            Err(e) => return Err(LayoutError::io(&path)(e)),
        }

        let record = self.record_in(&path);
        if let Err(e) = write_atomic(&record, &spec.tree(&TreeOptions::record())) {
            let _ = fs::remove_dir_all(&path);
            return Err(LayoutError::io(record)(e));
        }

        tracing::info!("created {}", path.display());
        Ok(path)
    }

    fn existing_install_error(&self, path: &Path, spec: &Spec, registry: &PackageRegistry) -> LayoutError {
        let record = self.record_in(path);
        if !record.is_file() {
            return LayoutError::InconsistentInstall {
                path: path.to_path_buf(),
                reason: format!("no {} record", self.spec_file_name),
            };
        }

        let installed = match self.read_record(&record, registry) {
            Ok(installed) => installed,
            Err(e) => {
                return LayoutError::InconsistentInstall {
                    path: path.to_path_buf(),
                    reason: format!("unreadable record: {}", e),
                }
            }
        };

        if installed == *spec {
            LayoutError::AlreadyExists {
                path: path.to_path_buf(),
                spec: spec.to_string(),
            }
        } else if installed.hash_prefix(self.hash_length) == spec.hash_prefix(self.hash_length) {
            LayoutError::HashCollision {
                path: path.to_path_buf(),
                installed: installed.to_string(),
                requested: spec.to_string(),
            }
        } else {
            LayoutError::InconsistentInstall {
                path: path.to_path_buf(),
                reason: format!("record describes `{}`, which does not belong here", installed),
            }
        }
    }

    /// Read an install record back.
    ///
    /// Records of packages that left the registry are trusted as concrete.
    /// Others are normalized against the current recipes; a record that no
    /// longer normalizes or is no longer concrete only produces a warning.
    pub fn read_record(&self, path: &Path, registry: &PackageRegistry) -> LayoutResult<Spec> {
        let text = fs::read_to_string(path).map_err(LayoutError::io(path))?;
        let mut spec = Spec::from_tree(&text)?;

        if !registry.exists(spec.name()) {
            spec.assume_concrete();
            return Ok(spec);
        }

        let recorded = spec.clone();
        match spec.normalize(registry) {
            Ok(()) if spec.is_concrete() => {}
            Ok(()) => {
                tracing::warn!(
                    "installed spec at {} is not concrete under the current recipes: {}",
                    path.display(),
                    spec
                );
            }
            Err(e) => {
                tracing::warn!("cannot normalize installed spec at {}: {}", path.display(), e);
                spec = recorded;
                spec.assume_concrete();
            }
        }
        Ok(spec)
    }

    /// Delete the prefix of `spec` and any ancestors left empty, up to the root.
    pub fn remove_path_for(&self, spec: &Spec) -> LayoutResult<()> {
        let path = self.path_for(spec)?;
        self.remove_prefix(&path)
    }

    /// Delete an install prefix found under the root, pruning empty ancestors.
    pub fn remove_prefix(&self, prefix: &Path) -> LayoutResult<()> {
        if !prefix.starts_with(&self.root) || prefix == self.root {
            return Err(LayoutError::InconsistentInstall {
                path: prefix.to_path_buf(),
                reason: format!("not inside install root {}", self.root.display()),
            });
        }
        if prefix.exists() {
            fs::remove_dir_all(prefix).map_err(LayoutError::io(prefix))?;
        }
        if let Some(parent) = prefix.parent() {
            prune_empty_parents(parent, &self.root).map_err(LayoutError::io(parent))?;
        }
        tracing::info!("removed {}", prefix.display());
        Ok(())
    }

    /// Every installed spec with its prefix, in directory order.
    ///
    /// Prefix directories without a record are skipped.
    pub fn all_installs(&self, registry: &PackageRegistry) -> LayoutResult<Vec<Installed>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut installs = Vec::new();
        for entry in WalkDir::new(&self.root)
            .min_depth(3)
            .max_depth(3)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                let path = e.path().map_or_else(|| self.root.clone(), Path::to_path_buf);
                LayoutError::Io {
                    path,
                    source: e.into(),
                }
            })?;
            if !entry.file_type().is_dir() {
                continue;
            }
            let record = self.record_in(entry.path());
            if !record.is_file() {
                continue;
            }
            installs.push(Installed {
                spec: self.read_record(&record, registry)?,
                prefix: entry.into_path(),
            });
        }
        Ok(installs)
    }

    /// Every installed spec.
    pub fn all_specs(&self, registry: &PackageRegistry) -> LayoutResult<Vec<Spec>> {
        Ok(self
            .all_installs(registry)?
            .into_iter()
            .map(|installed| installed.spec)
            .collect())
    }
}
