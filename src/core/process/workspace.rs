//! Per-item scratch workspace
//!
//! Each item runs in `<work_dir>/<sample>`. Everything the item creates
//! locally (working copy, input link, tool outputs, staged provenance record)
//! lives there and is removed when the workspace is released, on success and
//! on failure alike.

use crate::domain::{PipelineError, Result, SampleName};
use std::path::{Path, PathBuf};

/// Name of the private scratch subdirectory inside each workspace
pub const SCRATCH_DIR: &str = ".provflow";

/// Scoped item workspace
///
/// Call [`Workspace::cleanup`] on the normal path; if the value is dropped
/// without it (early return, panic, cancelled future) the directory is removed
/// synchronously in `Drop`.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    released: bool,
}

impl Workspace {
    /// Create a fresh workspace for `sample` under `work_dir`
    ///
    /// Leftovers from an interrupted earlier run are removed first.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory cannot be created.
    pub async fn create(work_dir: &Path, sample: &SampleName) -> Result<Self> {
        let path = work_dir.join(sample.as_str());

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::warn!(workspace = %path.display(), "Removing stale workspace");
            tokio::fs::remove_dir_all(&path)
                .await
                .map_err(|e| workspace_error(&path, e))?;
        }

        tokio::fs::create_dir_all(path.join(SCRATCH_DIR))
            .await
            .map_err(|e| workspace_error(&path, e))?;

        Ok(Self {
            path,
            released: false,
        })
    }

    /// Workspace root; the tool runs here
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Private subdirectory for the working copy and staged files
    ///
    /// Kept out of the root so tool output patterns never match it.
    pub fn scratch_dir(&self) -> PathBuf {
        self.path.join(SCRATCH_DIR)
    }

    /// Remove the workspace and everything in it
    pub async fn cleanup(mut self) {
        self.released = true;
        match tokio::fs::remove_dir_all(&self.path).await {
            Ok(()) => tracing::debug!(workspace = %self.path.display(), "Workspace removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                workspace = %self.path.display(),
                error = %e,
                "Failed to remove workspace"
            ),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if !self.released {
            let _ = std::fs::remove_dir_all(&self.path);
        }
    }
}

fn workspace_error(path: &Path, err: std::io::Error) -> PipelineError {
    PipelineError::Io(format!("workspace {}: {err}", path.display()))
}
