//! Input pre-transform seam
//!
//! Some tools need their input massaged first (for example FASTA header
//! rewriting). The transform writes a working copy inside the item workspace;
//! the original input is never modified.

use crate::domain::{PipelineError, Result};
use async_trait::async_trait;
use std::path::Path;

/// Produces the working copy the tool reads
#[async_trait]
pub trait InputTransform: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Write a transformed copy of `source` to `dest`
    ///
    /// # Errors
    ///
    /// Returns `MissingFile` when `source` does not exist.
    async fn apply(&self, source: &Path, dest: &Path) -> Result<()>;
}

/// Byte-for-byte copy
#[derive(Debug, Default, Clone, Copy)]
pub struct CopyTransform;

#[async_trait]
impl InputTransform for CopyTransform {
    fn name(&self) -> &str {
        "copy"
    }

    async fn apply(&self, source: &Path, dest: &Path) -> Result<()> {
        tokio::fs::copy(source, dest).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => PipelineError::MissingFile(source.to_path_buf()),
            _ => PipelineError::Io(format!("{} -> {}: {e}", source.display(), dest.display())),
        })?;
        Ok(())
    }
}
