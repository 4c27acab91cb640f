//! Result type alias for provflow
//!
//! This module provides a convenient Result type alias that uses PipelineError
//! as the error type.

use super::errors::PipelineError;

/// Result type alias for provflow operations
///
/// # Examples
///
/// ```
/// use provflow::domain::result::Result;
/// use provflow::domain::errors::PipelineError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(PipelineError::Configuration("missing input_dir".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, PipelineError>;
