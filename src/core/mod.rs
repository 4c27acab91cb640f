//! Core business logic for provflow.
//!
//! # Modules
//!
//! - [`fingerprint`] - Streaming SHA-256 content fingerprints
//! - [`state`] - Provenance records and the ledger
//! - [`detect`] - Discovery and change detection
//! - [`process`] - Single-item processing in a scoped workspace
//! - [`batch`] - Sequential and array batch execution
//! - [`summary`] - Summary aggregation and enrichment
//! - [`pipeline`] - One pipeline cycle
//!
//! # Cycle
//!
//! 1. **Prepare**: Ensure output, provenance and summary directories exist
//! 2. **Detect**: Discover inputs and outputs, reconcile against the ledger
//! 3. **Execute**: Run the work set through one batch executor
//! 4. **Record**: Each successful item places its output and provenance record
//! 5. **Summarize**: Combine all outputs into a timestamped summary

pub mod batch;
pub mod detect;
pub mod fingerprint;
pub mod pipeline;
pub mod process;
pub mod state;
pub mod summary;
