//! Distributed array execution
//!
//! All items are submitted as one array job. Each task runs the item processor
//! in its own process (see the `worker` command), so failures are isolated per
//! task. The executor polls until every task is terminal or the maximum wait
//! elapses; tasks still running then are cancelled and reported as
//! [`ItemStatus::TimedOut`].

use super::report::{BatchReport, ItemResult, ItemStatus};
use super::BatchExecutor;
use crate::adapters::scheduler::{ArrayJob, Scheduler, TaskState};
use crate::config::SlurmParams;
use crate::domain::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

const STDERR_TAIL_LINES: usize = 20;

/// Per-task progress: `Submitted -> Running -> {Completed | Failed | TimedOut}`
#[derive(Debug, Clone, PartialEq, Eq)]
enum TaskPhase {
    Submitted,
    Running,
    Completed,
    Failed(String),
    TimedOut,
}

impl TaskPhase {
    fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskPhase::Completed | TaskPhase::Failed(_) | TaskPhase::TimedOut
        )
    }
}

/// Runs a batch as a scheduler array job
pub struct ArrayExecutor {
    scheduler: Arc<dyn Scheduler>,
    poll_interval: Duration,
    max_wait: Duration,
}

impl ArrayExecutor {
    /// Create an executor with explicit timings
    pub fn new(scheduler: Arc<dyn Scheduler>, poll_interval: Duration, max_wait: Duration) -> Self {
        Self {
            scheduler,
            poll_interval,
            max_wait,
        }
    }

    /// Create an executor using the configured poll interval and maximum wait
    pub fn from_params(scheduler: Arc<dyn Scheduler>, params: &SlurmParams) -> Self {
        Self::new(
            scheduler,
            Duration::from_secs(params.poll_interval_seconds),
            Duration::from_secs(params.max_wait_seconds),
        )
    }

    async fn wait_for_tasks(&self, job: &ArrayJob) -> Vec<TaskPhase> {
        let mut phases = vec![TaskPhase::Submitted; job.items.len()];
        let started = Instant::now();

        loop {
            match self.scheduler.poll(job).await {
                Ok(states) => {
                    for (index, state) in states {
                        let Some(phase) = phases.get_mut(index) else {
                            continue;
                        };
                        if phase.is_terminal() {
                            continue;
                        }
                        let next = match state {
                            TaskState::Pending => TaskPhase::Submitted,
                            TaskState::Running => TaskPhase::Running,
                            TaskState::Completed => TaskPhase::Completed,
                            TaskState::Failed { reason } => TaskPhase::Failed(reason),
                        };
                        if next != *phase {
                            tracing::debug!(
                                task_id = %job.task_id(index),
                                state = ?next,
                                "Task state changed"
                            );
                            *phase = next;
                        }
                    }
                }
                Err(e) => tracing::warn!(
                    job_id = %job.job_id,
                    error = %e,
                    "Task state query failed, retrying"
                ),
            }

            if phases.iter().all(TaskPhase::is_terminal) {
                return phases;
            }

            let elapsed = started.elapsed();
            if elapsed >= self.max_wait {
                let stuck: Vec<usize> = phases
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| !p.is_terminal())
                    .map(|(i, _)| i)
                    .collect();
                tracing::error!(
                    job_id = %job.job_id,
                    stuck_tasks = stuck.len(),
                    max_wait_seconds = self.max_wait.as_secs(),
                    "Array job exceeded maximum wait"
                );
                if let Err(e) = self.scheduler.cancel(job, &stuck).await {
                    tracing::warn!(job_id = %job.job_id, error = %e, "Failed to cancel stuck tasks");
                }
                for index in stuck {
                    phases[index] = TaskPhase::TimedOut;
                }
                return phases;
            }

            tokio::time::sleep(self.poll_interval.min(self.max_wait - elapsed)).await;
        }
    }

    async fn finalize(&self, job: &ArrayJob, phases: Vec<TaskPhase>) -> BatchReport {
        let mut report = BatchReport::default();

        for (index, phase) in phases.into_iter().enumerate() {
            let input = job.items[index].clone();
            let task_id = job.task_id(index);
            let logs = self.scheduler.task_logs(job, index);

            let result = match phase {
                TaskPhase::Completed => {
                    remove_log(&logs.stdout).await;
                    remove_log(&logs.stderr).await;
                    ItemResult::for_task(input, task_id, ItemStatus::Succeeded, None)
                }
                TaskPhase::Failed(reason) => {
                    let stderr = stderr_tail(&logs.stderr).await;
                    tracing::error!(
                        task_id = %task_id,
                        input_file = %input.display(),
                        reason = %reason,
                        stderr = %stderr,
                        stderr_log = %logs.stderr.display(),
                        "Array task failed"
                    );
                    ItemResult::for_task(input, task_id, ItemStatus::Failed, Some(reason))
                }
                // Loop only exits with every task terminal
                TaskPhase::TimedOut | TaskPhase::Submitted | TaskPhase::Running => {
                    tracing::error!(
                        task_id = %task_id,
                        input_file = %input.display(),
                        stderr_log = %logs.stderr.display(),
                        "Array task timed out"
                    );
                    ItemResult::for_task(
                        input,
                        task_id,
                        ItemStatus::TimedOut,
                        Some(format!("not finished after {}s", self.max_wait.as_secs())),
                    )
                }
            };
            report.results.push(result);
        }

        if report.timed_out() == 0 {
            if let Some(manifest) = &job.manifest {
                let _ = tokio::fs::remove_file(manifest).await;
            }
        }

        report
    }
}

#[async_trait]
impl BatchExecutor for ArrayExecutor {
    fn name(&self) -> &'static str {
        "array"
    }

    async fn run(&self, items: &[PathBuf]) -> Result<BatchReport> {
        if items.is_empty() {
            return Ok(BatchReport::default());
        }

        let job = self.scheduler.submit(items).await?;
        let phases = self.wait_for_tasks(&job).await;
        let report = self.finalize(&job, phases).await;

        tracing::info!(
            job_id = %job.job_id,
            succeeded = report.succeeded(),
            failed = report.failed(),
            timed_out = report.timed_out(),
            "Array job finished"
        );
        Ok(report)
    }
}

async fn remove_log(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(log_file = %path.display(), error = %e, "Failed to remove task log"),
    }
}

async fn stderr_tail(path: &Path) -> String {
    let Ok(content) = tokio::fs::read_to_string(path).await else {
        return String::new();
    };
    let lines: Vec<&str> = content.lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}
