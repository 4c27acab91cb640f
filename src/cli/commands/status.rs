//! Status command implementation
//!
//! Lists provenance records and the size of the current work set. Nothing is
//! written.

use crate::adapters::storage::LocalBackend;
use crate::config::load_config;
use crate::core::pipeline::Pipeline;
use clap::Args;
use std::sync::Arc;

/// Arguments for the status command
#[derive(Args, Debug, Default)]
pub struct StatusArgs {
    /// Only show records for this sample
    #[arg(long)]
    pub sample: Option<String>,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking pipeline status");

        println!("📊 Pipeline Status");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        // Reads only; the local view is enough for either backend
        let pipeline = Pipeline::with_storage(config, Arc::new(LocalBackend::new()));

        let records = match pipeline.ledger().list().await {
            Ok(r) => r,
            Err(e) => {
                println!("❌ Failed to read provenance records");
                println!("   Error: {e}");
                return Ok(5);
            }
        };
        let records: Vec<_> = records
            .into_iter()
            .filter(|r| {
                self.sample
                    .as_deref()
                    .map_or(true, |s| r.sample_name.as_str() == s)
            })
            .collect();

        if records.is_empty() {
            println!("No provenance records found.");
        } else {
            println!("Found {} provenance record(s):", records.len());
            println!();
            println!("{:<30} {:<22} {:<66}", "Sample", "Completed", "Output");
            println!("{}", "-".repeat(118));
            for record in &records {
                println!(
                    "{:<30} {:<22} {:<66}",
                    record.sample_name.as_str(),
                    record.timestamp_completed.format("%Y-%m-%d %H:%M:%S"),
                    record.output_file_path.display()
                );
            }
        }
        println!();

        match pipeline.scan().await {
            Ok((work_set, inputs, outputs)) => {
                println!("Inputs: {inputs}  Outputs: {outputs}");
                println!("Needing processing: {}", work_set.len());
                for item in work_set.items() {
                    println!("  - {} ({})", item.sample, item.reason);
                }
            }
            Err(e) => {
                println!("❌ Failed to scan directories");
                println!("   Error: {e}");
                return Ok(5);
            }
        }

        println!();
        Ok(0)
    }
}
