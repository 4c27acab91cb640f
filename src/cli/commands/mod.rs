//! CLI command implementations
//!
//! Commands return a process exit code: 0 success, 1 some items failed,
//! 2 configuration error, 4 backend setup error, 5 fatal error.

pub mod once;
pub mod run;
pub mod status;
pub mod validate;
pub mod worker;
