//! Once command implementation
//!
//! Runs a single pipeline cycle and prints what it did.

use crate::config::load_config;
use crate::core::pipeline::Pipeline;
use clap::Args;
use std::path::Path;

/// Arguments for the once command
#[derive(Args, Debug, Default)]
pub struct OnceArgs {}

impl OnceArgs {
    /// Execute the once command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let pipeline = match Pipeline::new(config, Path::new(config_path)) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create pipeline");
                eprintln!("Failed to initialize pipeline: {e}");
                return Ok(4);
            }
        };

        let report = match pipeline.run_cycle().await {
            Ok(r) => r,
            Err(e) => {
                crate::log_error_with_context!(&e, "Cycle aborted");
                eprintln!("Cycle failed: {e}");
                return Ok(5);
            }
        };

        println!("📊 Cycle Summary:");
        println!("  Inputs: {}", report.inputs);
        println!("  Outputs: {}", report.outputs);
        println!("  Needing processing: {}", report.work_set);

        let mut exit_code = 0;
        if let Some(batch) = &report.batch {
            println!("  Succeeded: {}", batch.succeeded());
            println!("  Failed: {}", batch.failed());
            println!("  Timed out: {}", batch.timed_out());

            let problems: Vec<_> = batch
                .results
                .iter()
                .filter(|r| r.error.is_some() || r.status != crate::core::batch::ItemStatus::Succeeded)
                .collect();
            if !problems.is_empty() {
                println!();
                println!("⚠️  Items not completed:");
                for result in problems {
                    let name = result
                        .sample
                        .as_ref()
                        .map_or_else(|| result.input_path.display().to_string(), |s| s.to_string());
                    println!(
                        "  - {name} ({}): {}",
                        result.status,
                        result.error.as_deref().unwrap_or("no details")
                    );
                }
                exit_code = 1;
            }
        }
        if let Some(summary) = &report.summary {
            println!("  Summary: {}", summary.display());
        }
        println!("  Duration: {:.2}s", report.duration.as_secs_f64());

        Ok(exit_code)
    }
}
