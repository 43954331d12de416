//! Refresh command - rebuild the cached version list from scratch.

use anyhow::Result;
use clap::Args;
use console::style;

use phpup_store::PhpStore;

use crate::config;

#[derive(Args, Debug)]
pub struct RefreshArgs {}

pub fn execute(_args: RefreshArgs) -> Result<i32> {
    let store = PhpStore::new(config::config_dir()?, true);
    println!(
        "{} {} PHP installation(s) detected",
        style("Done:").green(),
        store.versions().len()
    );
    Ok(0)
}
