//! # Block Pipeline CLI
//!
//! Command-line entry point.
//!
//! Provides:
//! - Configuration loading and validation
//! - Pipeline lifecycle and graceful shutdown
//! - Exit status mapping (0 clean, 1 stage failure, 2 other errors)

mod cli;
mod commands;
mod error;
mod pipeline;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_info, run_pipeline, run_validate};
use error::{exit_code_for, EXIT_ERROR, EXIT_OK};

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging based on CLI options
    if let Err(e) = init_logging(&cli) {
        eprintln!("{e:#}");
        return ExitCode::from(EXIT_ERROR);
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Block Pipeline CLI starting"
    );

    // Execute command
    let result = match &cli.command {
        Commands::Run(args) => run_pipeline(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_OK),
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "Command failed");
            ExitCode::from(exit_code_for(&e))
        }
    }
}

/// Initialize logging based on CLI options
///
/// `RUST_LOG` wins over `-v`; `-q` forces warnings only.
fn init_logging(cli: &Cli) -> Result<()> {
    let level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    if cli.quiet {
        observability::init_tracing_with_filter(cli.log_format.into(), level)
    } else {
        observability::init_tracing(cli.log_format.into(), level)
    }
}
