// Provenance ledger and records

pub mod ledger;
pub mod record;

pub use ledger::{LedgerReader, ProvenanceLedger};
pub use record::ProvenanceRecord;
