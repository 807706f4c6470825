//! stencil CLI - project scaffolding from registry-distributed command packages
//!
//! This is the main entry point for the stencil command-line interface.

mod bootstrap;
mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    // Initialize rustls crypto provider (required for rustls 0.23+)
    // This must be done before any TLS operations
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let cli = Cli::parse();
    init_tracing(cli.debug, cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            output::error(&format!("{:#}", e));
            std::process::exit(1);
        }
    }
}

/// Run the selected command, returning the process exit code
async fn run(cli: Cli) -> Result<i32> {
    let settings = bootstrap::prepare(cli.target_path.clone()).await?;

    match cli.command {
        Commands::Init(args) => commands::init::run(args, &settings).await,
        Commands::Run(args) => commands::exec::run_configured(args, &settings).await,
    }
}

/// Initialize tracing with appropriate verbosity
fn init_tracing(debug: bool, verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match (debug, verbose) {
            (false, 0) => EnvFilter::new("info"),
            (true, 0) | (_, 1) => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}
