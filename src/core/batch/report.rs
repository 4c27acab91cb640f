//! Batch results

use crate::core::process::ItemOutcome;
use crate::domain::{input_name, SampleName};
use std::fmt;
use std::path::PathBuf;

/// Terminal status of one item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    /// Output and provenance record written
    Succeeded,
    /// Item failed; it will be selected again next cycle
    Failed,
    /// Array task did not finish within the maximum wait
    TimedOut,
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemStatus::Succeeded => write!(f, "succeeded"),
            ItemStatus::Failed => write!(f, "failed"),
            ItemStatus::TimedOut => write!(f, "timed_out"),
        }
    }
}

/// Result of one item within a batch
#[derive(Debug, Clone)]
pub struct ItemResult {
    /// Input file
    pub input_path: PathBuf,
    /// Sample name, when derivable
    pub sample: Option<SampleName>,
    /// Terminal status
    pub status: ItemStatus,
    /// Scheduler task id for array execution
    pub task_id: Option<String>,
    /// Failure description
    pub error: Option<String>,
}

impl ItemResult {
    /// Result for an array task
    pub fn for_task(
        input_path: PathBuf,
        task_id: String,
        status: ItemStatus,
        error: Option<String>,
    ) -> Self {
        Self {
            sample: input_name(&input_path),
            input_path,
            status,
            task_id: Some(task_id),
            error,
        }
    }
}

impl From<ItemOutcome> for ItemResult {
    fn from(outcome: ItemOutcome) -> Self {
        let status = if outcome.is_success() {
            ItemStatus::Succeeded
        } else {
            ItemStatus::Failed
        };
        Self {
            input_path: outcome.input_path,
            sample: outcome.sample,
            status,
            task_id: None,
            error: outcome.failure.map(|f| f.message),
        }
    }
}

/// Results of one batch
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Per-item results
    pub results: Vec<ItemResult>,
}

impl BatchReport {
    /// Number of items with the given status
    pub fn count(&self, status: ItemStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    /// Number of successful items
    pub fn succeeded(&self) -> usize {
        self.count(ItemStatus::Succeeded)
    }

    /// Number of failed items
    pub fn failed(&self) -> usize {
        self.count(ItemStatus::Failed)
    }

    /// Number of timed-out items
    pub fn timed_out(&self) -> usize {
        self.count(ItemStatus::TimedOut)
    }

    /// Total number of items
    pub fn total(&self) -> usize {
        self.results.len()
    }
}
