//! Domain error types
//!
//! This module defines the error hierarchy for provflow.
//! All errors are domain-specific and don't expose third-party types.

use std::path::PathBuf;
use thiserror::Error;

/// Main provflow error type
///
/// Every fallible operation in the pipeline returns this type. Per-item
/// variants (`MissingFile`, `ToolExecution`, `AmbiguousOutput`, `Storage`)
/// are caught at the item processor boundary and never reach the polling loop.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration-related errors (fatal for the current cycle only)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A file the pipeline expected to read does not exist
    #[error("File not found: {}", .0.display())]
    MissingFile(PathBuf),

    /// The external analysis tool exited unsuccessfully
    #[error("Tool execution failed: `{command}` exited with {}: {stderr}", exit_code.map_or_else(|| "signal".to_string(), |c| c.to_string()))]
    ToolExecution {
        /// Rendered command line
        command: String,
        /// Exit code, `None` when the process was killed by a signal
        exit_code: Option<i32>,
        /// Captured standard error
        stderr: String,
    },

    /// Zero or several files matched an output pattern that must match exactly once
    #[error("Expected exactly one match for pattern '{pattern}', found {}", matches.len())]
    AmbiguousOutput {
        /// Pattern that was searched
        pattern: String,
        /// Paths that matched
        matches: Vec<PathBuf>,
    },

    /// Storage backend errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// A provenance record exists but cannot be parsed
    #[error("Corrupt provenance record {}: {reason}", path.display())]
    CorruptProvenance {
        /// Path to the record
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// Batch scheduler errors (submission or polling)
    #[error("Scheduler error: {0}")]
    Scheduler(String),

    /// An operation exceeded its configured time limit
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

/// Storage backend errors
///
/// Errors that occur while placing files or creating directories.
/// These errors don't expose third-party HTTP client types.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The local file to upload or copy does not exist
    #[error("Source file not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// Network failure or an unexpected response from the remote store
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Remote store rejected the request with a status we do not accept
    #[error("Unexpected response {status} for {path}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Destination path of the request
        path: String,
    },

    /// Local filesystem failure while placing a file
    #[error("Local storage failure for {}: {message}", path.display())]
    Local {
        /// Destination path
        path: PathBuf,
        /// Underlying error message
        message: String,
    },
}

impl PipelineError {
    /// Short machine-friendly label used as the `error_kind` log field
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Configuration(_) => "config_error",
            PipelineError::MissingFile(_) => "missing_file",
            PipelineError::ToolExecution { .. } => "tool_execution_error",
            PipelineError::AmbiguousOutput { .. } => "ambiguous_output",
            PipelineError::Storage(_) => "storage_backend_error",
            PipelineError::CorruptProvenance { .. } => "corrupt_provenance",
            PipelineError::Scheduler(_) => "scheduler_error",
            PipelineError::Timeout(_) => "timeout",
            PipelineError::Serialization(_) => "serialization_error",
            PipelineError::Io(_) => "io_error",
        }
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for PipelineError {
    fn from(err: toml::de::Error) -> Self {
        PipelineError::Configuration(format!("TOML parse error: {err}"))
    }
}
