//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// stencil - scaffold projects from registry-distributed templates
#[derive(Parser, Debug)]
#[command(name = "stencil")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Run command packages from this local path instead of the cache
    #[arg(long, global = true, value_name = "PATH")]
    pub target_path: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new project in the current directory
    Init(InitArgs),

    /// Run any command package configured in config.yaml
    Run(RunArgs),
}

// Init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Project name
    pub project_name: Option<String>,

    /// Initialize even if the current directory is not empty
    #[arg(short, long)]
    pub force: bool,
}

// Run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Configured command name
    pub command: String,

    /// Arguments passed through to the command package
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}
