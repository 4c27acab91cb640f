//! Change detection: discovery plus reconciliation against the ledger

pub mod discovery;
pub mod reconcile;

pub use discovery::{compile_patterns, discover, list_matching, Snapshot};
pub use reconcile::{reconcile, Reason, WorkItem, WorkSet};
