//! Filesystem utilities.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Write `contents` to `path` so that readers see either the old file or the
/// complete new one. The temporary file lives next to `path`.
pub fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Remove empty directories from `start` upward, stopping at `stop`
/// (exclusive) or at the first non-empty directory.
pub fn prune_empty_parents(start: &Path, stop: &Path) -> io::Result<()> {
    let mut current = Some(start);
    while let Some(dir) = current {
        if dir == stop || !dir.starts_with(stop) {
            break;
        }
        if dir.is_dir() {
            if fs::read_dir(dir)?.next().is_some() {
                break;
            }
            fs::remove_dir(dir)?;
        }
        current = dir.parent();
    }
    Ok(())
}
