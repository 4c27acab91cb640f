//! Task manifest shared between the submitting process and array workers
//!
//! The manifest lists the input of every array task; task `i` processes
//! `items[i]`.

use crate::domain::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable carrying the array task index
pub const TASK_INDEX_ENV: &str = "SLURM_ARRAY_TASK_ID";

/// Inputs of one array job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskManifest {
    /// Input path per task index
    pub items: Vec<PathBuf>,
}

impl TaskManifest {
    /// Write the manifest as JSON
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let body = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(path, body).await?;
        Ok(())
    }

    /// Read a manifest
    ///
    /// # Errors
    ///
    /// Returns `MissingFile` if the manifest does not exist and
    /// `Serialization` if it is malformed.
    pub async fn load(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => PipelineError::MissingFile(path.to_path_buf()),
            _ => PipelineError::Io(format!("{}: {e}", path.display())),
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Input of task `index`
    ///
    /// # Errors
    ///
    /// Returns `Scheduler` when the index is out of range.
    pub fn item(&self, index: usize) -> Result<&Path> {
        self.items.get(index).map(PathBuf::as_path).ok_or_else(|| {
            PipelineError::Scheduler(format!(
                "Task index {index} out of range for manifest with {} items",
                self.items.len()
            ))
        })
    }
}

/// Resolve the task index from an explicit value or the environment
///
/// # Errors
///
/// Returns `Scheduler` when neither is available or the variable is not a
/// number.
pub fn resolve_task_index(explicit: Option<usize>) -> Result<usize> {
    if let Some(index) = explicit {
        return Ok(index);
    }
    let raw = std::env::var(TASK_INDEX_ENV).map_err(|_| {
        PipelineError::Scheduler(format!("No --index given and {TASK_INDEX_ENV} is not set"))
    })?;
    raw.trim().parse().map_err(|_| {
        PipelineError::Scheduler(format!("Invalid {TASK_INDEX_ENV} value '{raw}'"))
    })
}
