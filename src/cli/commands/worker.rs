//! Worker command implementation
//!
//! Entry point of one array task. The task index comes from `--index` or the
//! scheduler's task id variable; the input path is read from the manifest
//! written at submission. Exits non-zero when the item fails so the scheduler
//! records the task as failed.

use crate::adapters::scheduler::{resolve_task_index, TaskManifest};
use crate::adapters::storage::create_storage_backend;
use crate::config::load_config;
use crate::core::pipeline::Pipeline;
use clap::Args;
use std::path::PathBuf;

/// Arguments for the worker command
#[derive(Args, Debug)]
pub struct WorkerArgs {
    /// Task manifest written by the submitting process
    #[arg(long)]
    pub manifest: PathBuf,

    /// Task index (defaults to SLURM_ARRAY_TASK_ID)
    #[arg(long)]
    pub index: Option<usize>,
}

impl WorkerArgs {
    /// Execute the worker command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Worker could not load configuration");
                return Ok(2);
            }
        };

        let manifest = TaskManifest::load(&self.manifest).await?;
        let index = resolve_task_index(self.index)?;
        let input = manifest.item(index)?.to_path_buf();
        tracing::info!(
            task_index = index,
            input_file = %input.display(),
            "Worker started"
        );

        let storage = match create_storage_backend(&config) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Worker could not create storage backend");
                return Ok(4);
            }
        };
        let pipeline = Pipeline::with_storage(config, storage);
        let outcome = pipeline.processor().process(&input).await;

        if outcome.is_success() {
            Ok(0)
        } else {
            let failure = outcome.failure.as_ref().map_or("", |f| f.message.as_str());
            eprintln!("{}: {failure}", outcome.label());
            Ok(1)
        }
    }
}
