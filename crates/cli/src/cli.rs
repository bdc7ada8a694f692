//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Default configuration path, used silently when absent
pub const DEFAULT_CONFIG: &str = "config.toml";

/// Block Pipeline - fetch, transform and store blocks through bounded concurrent stages
#[derive(Parser, Debug)]
#[command(
    name = "block-pipeline",
    author,
    version,
    about = "Concurrent block processing pipeline",
    long_about = "A staged block processing pipeline.\n\n\
                  Feeds an increasing sequence of block ids through the \n\
                  Fetch -> Transform -> Store stages over bounded queues and \n\
                  shuts every stage down on the first stage failure."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "BLOCK_PIPELINE_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "BLOCK_PIPELINE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the block pipeline until it drains, fails or is interrupted
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display the effective pipeline topology
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = DEFAULT_CONFIG,
        env = "BLOCK_PIPELINE_CONFIG"
    )]
    pub config: PathBuf,

    /// Override the capacity of every inter-stage queue
    #[arg(long, env = "BLOCK_PIPELINE_QUEUE_CAPACITY")]
    pub queue_capacity: Option<usize>,

    /// Stop feeding after this many blocks (0 = unbounded)
    #[arg(long, env = "BLOCK_PIPELINE_MAX_BLOCKS")]
    pub max_blocks: Option<u64>,

    /// Disable all simulated latency and generator pacing
    #[arg(long)]
    pub fast: bool,

    /// Disable failure injection in every stage
    #[arg(long)]
    pub no_failures: bool,

    /// Cancel the run after this many seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "BLOCK_PIPELINE_TIMEOUT")]
    pub timeout: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "BLOCK_PIPELINE_METRICS_PORT")]
    pub metrics_port: u16,

    /// Validate configuration and exit without running pipeline
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}
