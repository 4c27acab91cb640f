//! Domain models and types for provflow.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Sample naming contract** ([`sample`]) shared by discovery, reconciliation
//!   and the item processor
//! - **Error types** ([`PipelineError`], [`StorageError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, PipelineError>`]:
//!
//! ```rust
//! use provflow::domain::{PipelineError, Result};
//!
//! fn example() -> Result<()> {
//!     let config = provflow::config::load_config("provflow.json")?;
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod result;
pub mod sample;

// Re-export commonly used types for convenience
pub use errors::{PipelineError, StorageError};
pub use result::Result;
pub use sample::{input_name, output_name, SampleName};
