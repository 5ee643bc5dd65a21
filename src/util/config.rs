//! Configuration file support for spackle.
//!
//! spackle supports two configuration file locations:
//! - Global: `~/.spackle/config.toml` - User-wide defaults
//! - Project: `.spackle/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config.
//!
//! ```toml
//! [defaults]
//! compiler = "gcc"
//! architecture = "linux-x86_64"
//!
//! [[compilers]]
//! name = "gcc"
//! versions = ["4.9.2", "4.4.7"]
//!
//! [providers]
//! mpi = ["mpich", "openmpi"]
//!
//! [concretizer]
//! require_explicit_provider = false
//!
//! [layout]
//! hash_length = 8
//! spec_file = ".spec"
//!
//! [paths]
//! registry = "/path/to/packages"
//! install_root = "/path/to/opt"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::compiler::CompilerSpec;
use crate::core::spec::DEFAULT_HASH_LENGTH;
use crate::core::version::{Version, VersionConstraint};
use crate::layout::{SpecHashLayout, DEFAULT_SPEC_FILE};
use crate::resolver::{host_architecture, ConcretizerConfig};

/// Longest usable hash prefix: a hex SHA-256 digest.
const MAX_HASH_LENGTH: usize = 64;

/// spackle configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Defaults for root specs that leave fields open
    pub defaults: DefaultsConfig,

    /// Available compilers
    pub compilers: Vec<CompilerEntry>,

    /// Virtual package -> providers in order of preference
    pub providers: BTreeMap<String, Vec<String>>,

    /// Concretizer policy
    pub concretizer: ConcretizerSettings,

    /// Install layout settings
    pub layout: LayoutConfig,

    /// Registry and install locations
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Compiler for specs that name none, e.g. `gcc` or `gcc@4.9.2`
    pub compiler: Option<String>,

    /// Architecture for specs that name none
    pub architecture: Option<String>,
}

/// One available compiler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilerEntry {
    pub name: String,
    #[serde(default)]
    pub versions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcretizerSettings {
    /// Fail on several equally preferred providers instead of picking the first by name
    pub require_explicit_provider: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Hash characters in install directory names
    pub hash_length: Option<usize>,

    /// Name of the install record file
    pub spec_file: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory of package recipes
    pub registry: Option<PathBuf>,

    /// Root of the install tree
    pub install_root: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.defaults.compiler.is_some() {
            self.defaults.compiler = other.defaults.compiler;
        }
        if other.defaults.architecture.is_some() {
            self.defaults.architecture = other.defaults.architecture;
        }

        // Compilers are merged by name
        for entry in other.compilers {
            match self.compilers.iter_mut().find(|c| c.name == entry.name) {
                Some(existing) => *existing = entry,
                None => self.compilers.push(entry),
            }
        }

        self.providers.extend(other.providers);

        if other.concretizer.require_explicit_provider.is_some() {
            self.concretizer.require_explicit_provider = other.concretizer.require_explicit_provider;
        }

        if other.layout.hash_length.is_some() {
            self.layout.hash_length = other.layout.hash_length;
        }
        if other.layout.spec_file.is_some() {
            self.layout.spec_file = other.layout.spec_file;
        }

        if other.paths.registry.is_some() {
            self.paths.registry = other.paths.registry;
        }
        if other.paths.install_root.is_some() {
            self.paths.install_root = other.paths.install_root;
        }
    }

    /// Concretizer policy described by this config.
    pub fn concretizer_config(&self) -> Result<ConcretizerConfig> {
        let mut config = ConcretizerConfig::default();

        if !self.compilers.is_empty() {
            config.compilers = self
                .compilers
                .iter()
                .map(|entry| {
                    let versions = entry
                        .versions
                        .iter()
                        .map(|v| {
                            Version::parse(v).with_context(|| {
                                format!("invalid version `{}` for compiler `{}`", v, entry.name)
                            })
                        })
                        .collect::<Result<Vec<_>>>()?;
                    Ok((entry.name.clone(), versions))
                })
                .collect::<Result<_>>()?;
        }

        if let Some(text) = &self.defaults.compiler {
            config.default_compiler = parse_compiler(text)?;
        }
        if !config.compilers.contains_key(&config.default_compiler.name) {
            bail!(
                "default compiler `{}` is not among the configured compilers",
                config.default_compiler.name
            );
        }

        config.default_architecture = self
            .defaults
            .architecture
            .clone()
            .unwrap_or_else(host_architecture);
        config.provider_preferences = self.providers.clone();
        config.require_explicit_provider = self.concretizer.require_explicit_provider.unwrap_or(false);

        Ok(config)
    }

    /// Install layout rooted at `root` with this config's settings.
    pub fn layout(&self, root: impl Into<PathBuf>) -> Result<SpecHashLayout> {
        let hash_length = self.layout.hash_length.unwrap_or(DEFAULT_HASH_LENGTH);
        if hash_length == 0 || hash_length > MAX_HASH_LENGTH {
            bail!(
                "layout.hash_length must be between 1 and {}, got {}",
                MAX_HASH_LENGTH,
                hash_length
            );
        }
        let spec_file = self.layout.spec_file.as_deref().unwrap_or(DEFAULT_SPEC_FILE);
        if spec_file.is_empty() || spec_file.contains(['/', '\\']) {
            bail!("layout.spec_file must be a plain file name, got `{}`", spec_file);
        }

        Ok(SpecHashLayout::new(root)
            .with_hash_length(hash_length)
            .with_spec_file_name(spec_file))
    }
}

/// Parse `name` or `name@versions`.
fn parse_compiler(text: &str) -> Result<CompilerSpec> {
    let text = text.trim().trim_start_matches('%');
    let (name, versions) = match text.split_once('@') {
        Some((name, versions)) => (
            name,
            VersionConstraint::parse(versions)
                .with_context(|| format!("invalid compiler versions in `{}`", text))?,
        ),
        None => (text, VersionConstraint::any()),
    };
    if name.is_empty() {
        bail!("empty compiler name in `{}`", text);
    }
    Ok(CompilerSpec::new(name, versions))
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.spackle/config.toml)
/// 2. Global config (~/.spackle/config.toml)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    // Load global config first
    if global_path.exists() {
        let global = Config::load_or_default(global_path);
        config.merge(global);
    }

    // Project config overrides global
    if project_path.exists() {
        let project = Config::load_or_default(project_path);
        config.merge(project);
    }

    config
}

/// Get the project config path (.spackle/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".spackle").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        let concretizer = config.concretizer_config().unwrap();
        assert_eq!(concretizer.default_compiler.name, "gcc");
        assert!(concretizer.compilers.contains_key("clang"));
        assert!(!concretizer.require_explicit_provider);

        let layout = config.layout("/opt").unwrap();
        assert_eq!(layout.hash_length(), DEFAULT_HASH_LENGTH);
    }

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");

        std::fs::write(
            &config_path,
            r#"
[defaults]
compiler = "gcc@4.4"
architecture = "bgq"

[[compilers]]
name = "gcc"
versions = ["4.4.7", "4.9.2"]

[providers]
mpi = ["openmpi", "mpich"]

[concretizer]
require_explicit_provider = true

[layout]
hash_length = 12
"#,
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        let concretizer = config.concretizer_config().unwrap();
        assert_eq!(concretizer.default_compiler.to_string(), "%gcc@4.4");
        assert_eq!(concretizer.default_architecture, "bgq");
        assert_eq!(concretizer.compilers["gcc"].len(), 2);
        assert!(!concretizer.compilers.contains_key("clang"));
        assert_eq!(concretizer.provider_preferences["mpi"], vec!["openmpi", "mpich"]);
        assert!(concretizer.require_explicit_provider);
        assert_eq!(config.layout("/opt").unwrap().hash_length(), 12);
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        base.defaults.architecture = Some("linux-x86_64".to_string());
        base.compilers.push(CompilerEntry {
            name: "gcc".into(),
            versions: vec!["4.9.2".into()],
        });
        base.layout.hash_length = Some(8);

        let mut project = Config::default();
        project.compilers.push(CompilerEntry {
            name: "gcc".into(),
            versions: vec!["5.1".into()],
        });
        project.layout.hash_length = Some(16);

        base.merge(project);

        assert_eq!(base.defaults.architecture.as_deref(), Some("linux-x86_64"));
        assert_eq!(base.compilers.len(), 1);
        assert_eq!(base.compilers[0].versions, vec!["5.1"]);
        assert_eq!(base.layout.hash_length, Some(16));
    }

    #[test]
    fn test_invalid_settings() {
        let mut config = Config::default();
        config.layout.hash_length = Some(0);
        assert!(config.layout("/opt").is_err());

        let mut config = Config::default();
        config.defaults.compiler = Some("icc".into());
        assert!(config.concretizer_config().is_err());

        let mut config = Config::default();
        config.compilers.push(CompilerEntry {
            name: "gcc".into(),
            versions: vec!["4.9!".into()],
        });
        assert!(config.concretizer_config().is_err());
    }

    #[test]
    fn test_load_config_precedence() {
        let tmp = TempDir::new().unwrap();
        let global = tmp.path().join("global.toml");
        let project = tmp.path().join("project.toml");
        std::fs::write(&global, "[defaults]\narchitecture = \"bgq\"\ncompiler = \"clang\"\n").unwrap();
        std::fs::write(&project, "[defaults]\narchitecture = \"linux-ppc64\"\n").unwrap();

        let config = load_config(&global, &project);
        assert_eq!(config.defaults.architecture.as_deref(), Some("linux-ppc64"));
        assert_eq!(config.defaults.compiler.as_deref(), Some("clang"));
    }

    #[test]
    fn test_broken_file_falls_back() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[defaults\n").unwrap();
        assert_eq!(Config::load_or_default(&path), Config::default());
    }
}
