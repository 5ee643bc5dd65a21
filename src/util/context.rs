//! Global context for spackle operations.
//!
//! Provides centralized access to configuration, paths, and environment.
//!
//! Registry and install roots are resolved in this order: an explicit
//! override (the CLI's `--registry`/`--install-root`, which also read
//! `SPACKLE_REGISTRY` and `SPACKLE_INSTALL_ROOT`), then `[paths]` in the merged
//! config, then `packages/` and `opt/` under the spackle home directory.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use directories::BaseDirs;

use crate::core::registry::PackageRegistry;
use crate::layout::SpecHashLayout;
use crate::resolver::ConcretizerConfig;
use crate::util::config::{load_config, project_config_path, Config};

static BASE_DIRS: LazyLock<Option<BaseDirs>> = LazyLock::new(BaseDirs::new);

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Home directory for global spackle data (~/.spackle/)
    home: PathBuf,

    /// Global and project config, merged
    config: Config,

    registry_override: Option<PathBuf>,
    install_root_override: Option<PathBuf>,
}

impl GlobalContext {
    /// Create a new GlobalContext from the current directory and the config files.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(Self::with_cwd(cwd))
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Self {
        let home = BASE_DIRS
            .as_ref()
            .map(|b| b.home_dir().join(".spackle"))
            .unwrap_or_else(|| PathBuf::from(".spackle"));
        Self::with_home(cwd, home)
    }

    /// Create a GlobalContext with explicit working and home directories.
    pub fn with_home(cwd: PathBuf, home: PathBuf) -> Self {
        let config = load_config(&home.join("config.toml"), &project_config_path(&cwd));
        GlobalContext {
            cwd,
            home,
            config,
            registry_override: None,
            install_root_override: None,
        }
    }

    /// Replace the loaded configuration.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Use `root` as the package registry regardless of config.
    pub fn set_registry_root(&mut self, root: Option<PathBuf>) {
        self.registry_override = root;
    }

    /// Use `root` as the install root regardless of config.
    pub fn set_install_root(&mut self, root: Option<PathBuf>) {
        self.install_root_override = root;
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the spackle home directory (~/.spackle/).
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Get the global configuration file path.
    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Directory holding one `<name>/package.toml` per package.
    pub fn registry_root(&self) -> PathBuf {
        self.resolve_root(
            self.registry_override.as_deref(),
            self.config.paths.registry.as_deref(),
            "packages",
        )
    }

    /// Root of the install tree.
    pub fn install_root(&self) -> PathBuf {
        self.resolve_root(
            self.install_root_override.as_deref(),
            self.config.paths.install_root.as_deref(),
            "opt",
        )
    }

    fn resolve_root(&self, explicit: Option<&Path>, configured: Option<&Path>, default: &str) -> PathBuf {
        match explicit.or(configured) {
            Some(path) => self.cwd.join(path),
            None => self.home.join(default),
        }
    }

    pub fn registry(&self) -> PackageRegistry {
        PackageRegistry::new(self.registry_root())
    }

    pub fn layout(&self) -> Result<SpecHashLayout> {
        self.config.layout(self.install_root())
    }

    pub fn concretizer_config(&self) -> Result<ConcretizerConfig> {
        self.config.concretizer_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn context(tmp: &TempDir) -> GlobalContext {
        GlobalContext::with_home(tmp.path().join("work"), tmp.path().join("home"))
    }

    #[test]
    fn test_context_paths() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(&tmp);

        assert_eq!(ctx.home(), tmp.path().join("home"));
        assert_eq!(ctx.config_path(), tmp.path().join("home/config.toml"));
        assert_eq!(ctx.registry_root(), tmp.path().join("home/packages"));
        assert_eq!(ctx.install_root(), tmp.path().join("home/opt"));
    }

    #[test]
    fn test_config_paths_relative_to_cwd() {
        let tmp = TempDir::new().unwrap();
        let home = tmp.path().join("home");
        std::fs::create_dir_all(&home).unwrap();
        std::fs::write(
            home.join("config.toml"),
            "[paths]\nregistry = \"repo\"\ninstall_root = \"/srv/opt\"\n",
        )
        .unwrap();

        let ctx = context(&tmp);

        assert_eq!(ctx.registry_root(), tmp.path().join("work/repo"));
        assert_eq!(ctx.install_root(), PathBuf::from("/srv/opt"));
    }

    #[test]
    fn test_overrides_win() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.paths.registry = Some(PathBuf::from("/from/config"));

        let mut ctx = context(&tmp).with_config(config);
        ctx.set_registry_root(Some(PathBuf::from("/from/env")));
        ctx.set_install_root(Some(PathBuf::from("/elsewhere")));

        assert_eq!(ctx.registry_root(), PathBuf::from("/from/env"));
        assert_eq!(ctx.layout().unwrap().root(), Path::new("/elsewhere"));
    }

    #[test]
    fn test_project_config_overrides_global() {
        let tmp = TempDir::new().unwrap();
        let home = tmp.path().join("home");
        let project = tmp.path().join("work/.spackle");
        std::fs::create_dir_all(&home).unwrap();
        std::fs::create_dir_all(&project).unwrap();
        std::fs::write(home.join("config.toml"), "[layout]\nhash_length = 10\n").unwrap();
        std::fs::write(project.join("config.toml"), "[layout]\nhash_length = 20\n").unwrap();

        let ctx = context(&tmp);

        assert_eq!(ctx.layout().unwrap().hash_length(), 20);
    }
}
