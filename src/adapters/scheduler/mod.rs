//! Batch scheduler integration for array execution
//!
//! - [`traits`] - the [`Scheduler`] abstraction used by the array executor
//! - [`slurm`] - Slurm implementation (`sbatch`/`sacct`/`scancel`)
//! - [`manifest`] - task manifest read by array workers

pub mod manifest;
pub mod slurm;
pub mod traits;

pub use manifest::{resolve_task_index, TaskManifest, TASK_INDEX_ENV};
pub use slurm::SlurmScheduler;
pub use traits::{ArrayJob, Scheduler, TaskLogs, TaskState};
