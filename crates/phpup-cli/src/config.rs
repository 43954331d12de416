//! Configuration directory lookup.

use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;

/// Per-user configuration directory holding the version cache and the PHP
/// shim directory excluded from PATH scans.
pub fn config_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "phpup")
        .context("Unable to determine the configuration directory")?;
    Ok(dirs.config_dir().to_path_buf())
}
