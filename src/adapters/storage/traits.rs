//! Storage backend abstraction
//!
//! Every durable write of the pipeline (outputs, provenance records,
//! summaries) goes through a [`StorageBackend`]. The backend is chosen once
//! from configuration and injected; callers never inspect path strings to
//! decide where a write goes.

use crate::domain::Result;
use async_trait::async_trait;
use std::fmt;
use std::path::Path;

/// Which backend variant is in use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Plain filesystem writes
    Local,
    /// HTTP uploads to a WebDAV-style object store
    Remote,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Local => write!(f, "local"),
            BackendKind::Remote => write!(f, "remote"),
        }
    }
}

/// Storage backend trait
///
/// Destination paths are always expressed as the local view of the store
/// (for the remote backend, the path under which the store is mounted);
/// discovery and fingerprinting read from that local view.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Backend variant, for logging
    fn kind(&self) -> BackendKind;

    /// Ensure a directory exists, creating it if necessary
    ///
    /// Succeeds when the directory already exists.
    ///
    /// # Errors
    ///
    /// Returns a `Storage` error if the directory cannot be created.
    async fn ensure_directory(&self, path: &Path) -> Result<()>;

    /// Place a local file at a destination path
    ///
    /// The source file is left in place; the caller removes it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::SourceNotFound` when `source` does not exist and
    /// `StorageError::BackendUnavailable` (or `UnexpectedStatus`) when the
    /// store cannot accept the file.
    async fn place(&self, source: &Path, dest: &Path) -> Result<()>;
}

/// Size of a file in megabytes, rounded to two decimals, for log fields
pub(crate) fn size_mb(bytes: u64) -> f64 {
    (bytes as f64 / 1024.0 / 1024.0 * 100.0).round() / 100.0
}
