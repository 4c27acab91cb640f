//! Summary aggregation
//!
//! After a cycle that processed items, all current outputs are combined into
//! one timestamped TSV report and optionally enriched.

pub mod aggregator;
pub mod enrich;

pub use aggregator::SummaryAggregator;
pub use enrich::{Confidence, ConfidenceEnricher, SummaryEnricher, SummaryTable};
