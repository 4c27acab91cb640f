//! Batch execution strategies
//!
//! - [`SequentialExecutor`] - items processed one after another in-process
//! - [`ArrayExecutor`] - items submitted as one scheduler array job
//!
//! Both report per-item results; an item failure never fails the batch. Only
//! batch-level problems (such as a failed submission) return an error.

pub mod array;
pub mod report;
pub mod sequential;

pub use array::ArrayExecutor;
pub use report::{BatchReport, ItemResult, ItemStatus};
pub use sequential::SequentialExecutor;

use crate::domain::Result;
use async_trait::async_trait;
use std::path::PathBuf;

/// Runs the item processor over a batch of inputs
#[async_trait]
pub trait BatchExecutor: Send + Sync {
    /// Strategy name for logs
    fn name(&self) -> &'static str;

    /// Process every item and report per-item results
    ///
    /// No retries are made; a failed item simply lacks a provenance record
    /// and is selected again by the next cycle.
    ///
    /// # Errors
    ///
    /// Returns an error only for batch-level failures.
    async fn run(&self, items: &[PathBuf]) -> Result<BatchReport>;
}
