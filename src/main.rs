// provflow - Incremental, provenance-tracked batch runner
// Copyright (c) 2025 Provflow Contributors
// Licensed under the MIT License

use clap::Parser;
use provflow::cli::{Cli, Commands};
use provflow::config::{load_config, LoggingConfig};
use provflow::logging::init_logging;
use std::process;
use tokio::sync::watch;

#[tokio::main]
async fn main() {
    // Credentials for the remote store may live in a .env file
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Logging settings come from the config file when it loads; the CLI
    // level wins over the file's level
    let (file_level, logging_config) = match load_config(&cli.config) {
        Ok(config) => (config.log_level, config.logging),
        Err(_) => ("info".to_string(), LoggingConfig::default()),
    };
    // Array workers share the log directory with the submitting process
    let logging_config = match cli.command {
        Some(Commands::Worker(_)) => LoggingConfig {
            local_enabled: false,
            ..logging_config
        },
        _ => logging_config,
    };
    let log_level = cli.log_level.clone().unwrap_or(file_level);
    let guard = match init_logging(&log_level, &logging_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(5);
        }
    };

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "provflow");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to create SIGTERM handler");
                    return;
                }
            };

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received SIGINT (Ctrl+C), stopping after the current cycle");
                }
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, stopping after the current cycle");
                }
            }
            let _ = shutdown_tx.send(true);
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            } else {
                tracing::info!("Received SIGINT (Ctrl+C), stopping after the current cycle");
                let _ = shutdown_tx.send(true);
            }
        }
    });

    let exit_code = match execute_command(&cli, shutdown_rx).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command execution failed");
            eprintln!("Error: {e}");
            5
        }
    };

    // process::exit skips destructors; flush the file writer first
    drop(guard);
    process::exit(exit_code);
}

/// Execute the CLI command
async fn execute_command(cli: &Cli, shutdown_signal: watch::Receiver<bool>) -> anyhow::Result<i32> {
    match &cli.command {
        None => {
            provflow::cli::commands::run::RunArgs::default()
                .execute(&cli.config, shutdown_signal)
                .await
        }
        Some(Commands::Run(args)) => args.execute(&cli.config, shutdown_signal).await,
        Some(Commands::Once(args)) => args.execute(&cli.config).await,
        Some(Commands::Worker(args)) => args.execute(&cli.config).await,
        Some(Commands::ValidateConfig(args)) => args.execute(&cli.config).await,
        Some(Commands::Status(args)) => args.execute(&cli.config).await,
    }
}
