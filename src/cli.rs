use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "dnup",
    about = "dnup - A tool to manage NuGet package reference updates via the dotnet CLI",
    version,
    author
)]
pub struct Cli {
    /// Path to the project directory (defaults to current directory)
    #[arg(short, long, default_value = ".")]
    pub path: String,

    /// Enable verbose output for debugging
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Update a package reference to a new version in every project that references it
    Update {
        /// NuGet package id to update (e.g. "Newtonsoft.Json")
        #[arg(value_name = "PACKAGE")]
        package: String,

        /// Target version to install; defaults to the latest version found on the feeds
        #[arg(short = 'v', long = "version", value_name = "VERSION")]
        version: Option<String>,

        /// Install from this feed URL instead of the configured sources
        #[arg(short, long, value_name = "URL")]
        source: Option<String>,

        /// Consider pre-release versions (alpha, beta, rc, preview) when resolving
        #[arg(long)]
        include_unstable: bool,

        /// Skip Git operations (don't create branch or commit)
        #[arg(long)]
        no_git: bool,
    },

    /// Check for available package updates without applying them
    Check {
        /// Include pre-release versions (alpha, beta, rc, preview)
        #[arg(long)]
        include_unstable: bool,
    },

    /// List all package references found in the project files
    List,
}
