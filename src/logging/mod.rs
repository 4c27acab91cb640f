//! Logging and observability
//!
//! Structured logging with:
//! - Console output filtered by level (or `RUST_LOG`)
//! - Optional JSON file logging with daily or hourly rotation
//!
//! Events carry structured fields (`sample_name`, `input_file`, `reason`,
//! `duration_ms`, ...) so that both sinks can be filtered and queried.
//!
//! # Example
//!
//! ```no_run
//! use provflow::logging::init_logging;
//! use provflow::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(sample_name = "sampleA", "Sample processed");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log a change-detection decision for one sample
///
/// The message is the decision reason, so events can be filtered by it.
///
/// # Example
///
/// ```no_run
/// use provflow::log_detection;
///
/// log_detection!("sampleA", "input_file_changed_hash_mismatch");
/// ```
#[macro_export]
macro_rules! log_detection {
    ($sample:expr, $reason:expr) => {
        tracing::info!(
            sample_name = %$sample,
            reason = %$reason,
            "Needs processing"
        )
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use provflow::log_error_with_context;
/// use provflow::domain::PipelineError;
///
/// let error = PipelineError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Cycle aborted");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            error_kind = $error.kind(),
            context = $context,
            "Error occurred"
        )
    };
}

#[cfg(test)]
mod tests {
    use crate::domain::{PipelineError, Result};

    fn outcome(result: Result<u32>) -> u32 {
        match result {
            Ok(value) => value,
            Err(e) => {
                crate::log_error_with_context!(&e, "Cycle aborted");
                0
            }
        }
    }

    #[test]
    fn test_macros_usable_as_match_arm_expressions() {
        let result: Result<u32> = Err(PipelineError::Scheduler("down".to_string()));
        match result {
            Ok(_) => crate::log_detection!("sampleA", "provenance_file_missing"),
            Err(e) => crate::log_error_with_context!(&e, "Cycle aborted"),
        }
        assert_eq!(outcome(Ok(3)), 3);
        assert_eq!(outcome(Err(PipelineError::Io("gone".to_string()))), 0);
    }
}
