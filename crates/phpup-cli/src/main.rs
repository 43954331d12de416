//! phpup entry point: discovery and resolution of local PHP installations.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod config;
mod list;
mod refresh;
mod which;

#[derive(Parser, Debug)]
#[command(
    name = "phpup",
    version,
    about = "Finds every installed PHP and picks the right one for a project"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List all detected PHP installations
    List(list::ListArgs),

    /// Show which PHP would run a given directory
    Which(which::WhichArgs),

    /// Drop the cached version list and re-run discovery
    Refresh(refresh::RefreshArgs),
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let result: Result<i32> = match cli.command {
        Commands::List(args) => list::execute(args),
        Commands::Which(args) => which::execute(args),
        Commands::Refresh(args) => refresh::execute(args),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{} {:#}", console::style("Error:").red().bold(), err);
            std::process::exit(1);
        }
    }
}
