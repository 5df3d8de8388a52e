mod agents;
mod cli;
mod error;
mod msbuild;
mod nuget;
mod utils;
mod workflow;

use clap::Parser;
use cli::{Cli, Commands};
use colored::Colorize;
use std::process;

fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        unsafe {
            std::env::set_var("DNUP_VERBOSE", "1");
        }
    }

    let result = match cli.command {
        Commands::Update {
            package,
            version,
            source,
            include_unstable,
            no_git,
        } => workflow::execute_update(
            &cli.path,
            &package,
            version.as_deref(),
            source.as_deref(),
            !include_unstable,
            no_git,
        ),
        Commands::Check { include_unstable } => {
            workflow::execute_check(&cli.path, !include_unstable)
        }
        Commands::List => workflow::execute_list(&cli.path),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        process::exit(1);
    }
}
