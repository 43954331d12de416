//! List command - show every detected PHP installation.

use anyhow::Result;
use clap::Args;
use console::style;

use phpup_store::PhpStore;

use crate::config;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Ignore the cached list and re-run discovery
    #[arg(long)]
    pub no_cache: bool,
}

pub fn execute(args: ListArgs) -> Result<i32> {
    let store = PhpStore::new(config::config_dir()?, args.no_cache);

    if store.versions().is_empty() {
        eprintln!("{} no PHP binaries detected", style("Warning:").yellow());
        return Ok(1);
    }

    for version in store.versions() {
        print!(
            "{} {} {}",
            style(format!("{:<8}", version.version)).green(),
            format!("{:<10}", version.server_kind()),
            version.php_path.display()
        );
        if version.is_system {
            print!(" {}", style("(system)").cyan());
        }
        println!();
    }
    Ok(0)
}
