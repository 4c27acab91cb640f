//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for provflow using clap.
//! Without a subcommand the polling loop (`run`) starts.

pub mod commands;

use clap::{Parser, Subcommand};

/// provflow - incremental, provenance-tracked batch runner
#[derive(Parser, Debug)]
#[command(name = "provflow")]
#[command(version, about, long_about = None)]
#[command(author = "Provflow Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "provflow.json", env = "PROVFLOW_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long, env = "PROVFLOW_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run pipeline cycles until interrupted
    Run(commands::run::RunArgs),

    /// Run a single pipeline cycle
    Once(commands::once::OnceArgs),

    /// Process one item of an array job (invoked by the scheduler)
    Worker(commands::worker::WorkerArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Show provenance records and pending work
    Status(commands::status::StatusArgs),
}
