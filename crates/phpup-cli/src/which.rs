//! Which command - resolve the PHP version a directory would use.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use console::style;

use phpup_store::PhpStore;

use crate::config;

#[derive(Args, Debug)]
pub struct WhichArgs {
    /// Directory to resolve, defaults to the current one
    #[arg(value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Ignore the cached list and re-run discovery
    #[arg(long)]
    pub no_cache: bool,
}

pub fn execute(args: WhichArgs) -> Result<i32> {
    let dir = args
        .dir
        .canonicalize()
        .with_context(|| format!("Failed to resolve directory {}", args.dir.display()))?;
    log::debug!("Resolving the PHP version for {}", dir.display());
    let store = PhpStore::new(config::config_dir()?, args.no_cache);

    let m = store.best_version_for_dir(&dir)?;
    if let Some(warning) = &m.warning {
        eprintln!("{} {}", style("Warning:").yellow(), warning);
    }
    println!(
        "{} {} ({})",
        m.version.php_path.display(),
        style(&m.version.version).green(),
        m.source
    );
    Ok(0)
}
