//! Run command implementation
//!
//! The polling loop: reload configuration, run one cycle, sleep for
//! `scan_interval_seconds`, repeat. A failed cycle is logged and the loop
//! continues. A shutdown signal ends the loop between cycles.

use crate::config::ConfigReloader;
use crate::core::pipeline::Pipeline;
use clap::Args;
use std::path::Path;
use tokio::sync::watch;

/// Arguments for the run command
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Stop after this many cycles (runs forever when unset)
    #[arg(long)]
    pub max_cycles: Option<u64>,
}

impl RunArgs {
    /// Execute the run command
    pub async fn execute(
        &self,
        config_path: &str,
        mut shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        let mut reloader = ConfigReloader::new(config_path);
        let mut cycle: u64 = 0;

        loop {
            if *shutdown_signal.borrow() {
                tracing::info!(cycles = cycle, "Shutdown requested, stopping");
                return Ok(0);
            }

            let config = match reloader.reload() {
                Ok(c) => c,
                Err(e) => {
                    tracing::error!(error = %e, "Configuration could not be loaded");
                    eprintln!("Configuration error: {e}");
                    return Ok(2);
                }
            };
            let interval = config.scan_interval();

            cycle += 1;
            tracing::info!(cycle, "Cycle started");
            match Pipeline::new(config, Path::new(config_path)) {
                Ok(pipeline) => match pipeline.run_cycle().await {
                    Ok(report) => tracing::info!(
                        cycle,
                        work_set = report.work_set,
                        failed = report.batch.as_ref().map_or(0, |b| b.failed() + b.timed_out()),
                        duration_ms = report.duration.as_millis() as u64,
                        "Cycle finished"
                    ),
                    Err(e) => crate::log_error_with_context!(&e, "Cycle aborted"),
                },
                Err(e) => crate::log_error_with_context!(&e, "Pipeline could not be created"),
            }

            if self.max_cycles.is_some_and(|max| cycle >= max) {
                return Ok(0);
            }

            tracing::debug!(seconds = interval.as_secs_f64(), "Sleeping until next cycle");
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                Ok(()) = shutdown_signal.changed() => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_args_default() {
        let args = RunArgs::default();
        assert!(args.max_cycles.is_none());
    }

    #[tokio::test]
    async fn test_missing_config_exits_with_config_error() {
        let (_tx, rx) = watch::channel(false);
        let code = RunArgs::default()
            .execute("/nonexistent/provflow.json", rx)
            .await
            .unwrap();
        assert_eq!(code, 2);
    }

    #[tokio::test]
    async fn test_shutdown_before_first_cycle() {
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        let code = RunArgs::default()
            .execute("/nonexistent/provflow.json", rx)
            .await
            .unwrap();
        assert_eq!(code, 0);
    }
}
