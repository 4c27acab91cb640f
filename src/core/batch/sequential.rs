//! In-process sequential execution

use super::report::{BatchReport, ItemResult};
use super::BatchExecutor;
use crate::core::process::ItemProcessor;
use crate::domain::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

/// Processes items one at a time in the current process
///
/// A failed item never stops the batch; the processor has already logged it.
pub struct SequentialExecutor {
    processor: Arc<ItemProcessor>,
}

impl SequentialExecutor {
    /// Create an executor around an item processor
    pub fn new(processor: Arc<ItemProcessor>) -> Self {
        Self { processor }
    }
}

#[async_trait]
impl BatchExecutor for SequentialExecutor {
    fn name(&self) -> &'static str {
        "sequential"
    }

    async fn run(&self, items: &[PathBuf]) -> Result<BatchReport> {
        let mut report = BatchReport::default();
        for (position, input) in items.iter().enumerate() {
            tracing::debug!(
                position = position + 1,
                total = items.len(),
                input_file = %input.display(),
                "Processing item"
            );
            let outcome = self.processor.process(input).await;
            report.results.push(ItemResult::from(outcome));
        }
        Ok(report)
    }
}
