//! Batch scheduler abstraction
//!
//! The array executor only needs to submit one array job, poll task states,
//! cancel stragglers and know where task logs live.

use crate::domain::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// A submitted array job
#[derive(Debug, Clone)]
pub struct ArrayJob {
    /// Scheduler job id
    pub job_id: String,
    /// Items in task-index order
    pub items: Vec<PathBuf>,
    /// Manifest the tasks read their item from
    pub manifest: Option<PathBuf>,
}

impl ArrayJob {
    /// Scheduler identifier of one task
    pub fn task_id(&self, index: usize) -> String {
        format!("{}_{}", self.job_id, index)
    }
}

/// State of one array task as reported by the scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    /// Queued, not started yet
    Pending,
    /// Executing
    Running,
    /// Finished with exit code zero
    Completed,
    /// Finished unsuccessfully (non-zero exit, cancelled, killed, ...)
    Failed {
        /// Scheduler state and exit code
        reason: String,
    },
}

impl TaskState {
    /// Whether the task will not change state again
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed { .. })
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Pending => write!(f, "pending"),
            TaskState::Running => write!(f, "running"),
            TaskState::Completed => write!(f, "completed"),
            TaskState::Failed { reason } => write!(f, "failed ({reason})"),
        }
    }
}

/// Scheduler log files of one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskLogs {
    /// Captured standard output
    pub stdout: PathBuf,
    /// Captured standard error
    pub stderr: PathBuf,
}

/// External batch scheduler
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Submit every item as one task of a single array job
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Scheduler` when submission fails. This is a
    /// batch-level failure.
    async fn submit(&self, items: &[PathBuf]) -> Result<ArrayJob>;

    /// Current state of the job's tasks, keyed by task index
    ///
    /// Tasks the scheduler does not report yet are omitted.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Scheduler` when the state query fails.
    async fn poll(&self, job: &ArrayJob) -> Result<HashMap<usize, TaskState>>;

    /// Cancel the given tasks
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Scheduler` when the cancel request fails.
    async fn cancel(&self, job: &ArrayJob, indices: &[usize]) -> Result<()>;

    /// Log files written for one task
    fn task_logs(&self, job: &ArrayJob, index: usize) -> TaskLogs;
}
