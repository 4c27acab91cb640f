//! Pipeline coordinator
//!
//! One cycle: prepare directories, detect the work set, run exactly one batch
//! executor invocation over it, then aggregate a summary when anything was
//! processed. The polling loop in the CLI calls [`Pipeline::run_cycle`] with a
//! freshly loaded configuration each time.

use crate::adapters::scheduler::SlurmScheduler;
use crate::adapters::storage::{create_storage_backend, StorageBackend};
use crate::config::PipelineConfig;
use crate::core::batch::{ArrayExecutor, BatchExecutor, BatchReport, SequentialExecutor};
use crate::core::detect::{discover, reconcile, WorkSet};
use crate::core::process::ItemProcessor;
use crate::core::state::ProvenanceLedger;
use crate::core::summary::SummaryAggregator;
use crate::domain::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// What one cycle did
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Inputs discovered
    pub inputs: usize,
    /// Outputs discovered
    pub outputs: usize,
    /// Items selected for processing
    pub work_set: usize,
    /// Batch results, `None` when nothing needed processing
    pub batch: Option<BatchReport>,
    /// Summary placed this cycle
    pub summary: Option<PathBuf>,
    /// Wall time of the cycle
    pub duration: Duration,
}

/// Wires the components for one configuration
pub struct Pipeline {
    config: PipelineConfig,
    storage: Arc<dyn StorageBackend>,
    ledger: Arc<ProvenanceLedger>,
    processor: Arc<ItemProcessor>,
    executor: Arc<dyn BatchExecutor>,
}

impl Pipeline {
    /// Build the pipeline selected by configuration
    ///
    /// `config_path` is handed to array tasks so that workers load the same
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend or scheduler cannot be created.
    pub fn new(config: PipelineConfig, config_path: &Path) -> Result<Self> {
        let storage = create_storage_backend(&config)?;
        let mut pipeline = Self::with_storage(config, storage);

        if pipeline.config.use_slurm {
            let scheduler = SlurmScheduler::new(pipeline.config.slurm_params.clone(), config_path)?;
            pipeline.executor = Arc::new(ArrayExecutor::from_params(
                Arc::new(scheduler),
                &pipeline.config.slurm_params,
            ));
        }

        tracing::debug!(
            backend = %pipeline.storage.kind(),
            executor = pipeline.executor.name(),
            "Pipeline created"
        );
        Ok(pipeline)
    }

    /// Build a sequential pipeline over an explicit storage backend
    pub fn with_storage(config: PipelineConfig, storage: Arc<dyn StorageBackend>) -> Self {
        let ledger = Arc::new(ProvenanceLedger::new(
            config.provenance_dir.clone(),
            config.tool.name.clone(),
            storage.clone(),
        ));
        let processor = Arc::new(ItemProcessor::new(&config, storage.clone(), ledger.clone()));
        let executor: Arc<dyn BatchExecutor> =
            Arc::new(SequentialExecutor::new(processor.clone()));

        Self {
            config,
            storage,
            ledger,
            processor,
            executor,
        }
    }

    /// Replace the batch executor
    pub fn with_executor(mut self, executor: Arc<dyn BatchExecutor>) -> Self {
        self.executor = executor;
        self
    }

    /// Active configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Provenance ledger
    pub fn ledger(&self) -> &Arc<ProvenanceLedger> {
        &self.ledger
    }

    /// Item processor, shared with the worker command
    pub fn processor(&self) -> &Arc<ItemProcessor> {
        &self.processor
    }

    /// Ensure every directory the cycle writes to exists
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created.
    pub async fn prepare(&self) -> Result<()> {
        self.storage.ensure_directory(&self.config.output_dir).await?;
        self.storage
            .ensure_directory(&self.config.provenance_dir)
            .await?;
        if let Some(summary_dir) = &self.config.summary_dir {
            self.storage.ensure_directory(summary_dir).await?;
        }
        tokio::fs::create_dir_all(&self.config.work_dir).await?;
        Ok(())
    }

    /// Discover files and reconcile them against the ledger
    ///
    /// Returns the work set together with the input and output counts.
    ///
    /// # Errors
    ///
    /// Returns an error if discovery fails.
    pub async fn scan(&self) -> Result<(WorkSet, usize, usize)> {
        let started = Instant::now();
        let snapshot = discover(&self.config).await?;
        let work_set = reconcile(&snapshot.inputs, &snapshot.outputs, self.ledger.as_ref()).await?;

        tracing::info!(
            duration_ms = started.elapsed().as_millis() as u64,
            inputs = snapshot.inputs.len(),
            outputs = snapshot.outputs.len(),
            work_set = work_set.len(),
            "scan_complete"
        );
        Ok((work_set, snapshot.inputs.len(), snapshot.outputs.len()))
    }

    /// Run one full cycle
    ///
    /// # Errors
    ///
    /// Returns batch-level errors only: directory preparation, discovery,
    /// scheduler submission and summary placement. Item failures are part of
    /// the returned report.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let started = Instant::now();
        self.prepare().await?;

        let (work_set, inputs, outputs) = self.scan().await?;
        let mut report = CycleReport {
            inputs,
            outputs,
            work_set: work_set.len(),
            ..CycleReport::default()
        };

        if work_set.is_empty() {
            tracing::info!("No new or changed inputs");
            report.duration = started.elapsed();
            return Ok(report);
        }

        tracing::info!(
            items = work_set.len(),
            executor = self.executor.name(),
            "Starting batch"
        );
        let batch = self.executor.run(&work_set.input_paths()).await?;
        tracing::info!(
            total = batch.total(),
            succeeded = batch.succeeded(),
            failed = batch.failed(),
            timed_out = batch.timed_out(),
            "Batch finished"
        );

        if batch.total() > 0 {
            report.summary = self.summarize().await?;
        }
        report.batch = Some(batch);
        report.duration = started.elapsed();
        Ok(report)
    }

    async fn summarize(&self) -> Result<Option<PathBuf>> {
        let Some(summary_dir) = &self.config.summary_dir else {
            return Ok(None);
        };
        if !self.config.summary.enabled {
            return Ok(None);
        }

        let aggregator = SummaryAggregator::from_config(&self.config, self.storage.clone())?;
        aggregator
            .aggregate(&self.config.output_dir, summary_dir, &self.config.work_dir)
            .await
    }
}
