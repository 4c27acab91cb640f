//! Provenance record model
//!
//! A provenance record is durable proof that a sample was processed
//! successfully, carrying the fingerprints of the input and output observed at
//! completion time.

use crate::core::fingerprint::Fingerprint;
use crate::domain::SampleName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Proof of completion for one sample
///
/// A record is trustworthy only while both stored fingerprints equal the
/// fingerprints of the files currently in place. Otherwise it is stale and
/// treated as absent; stale records are never deleted, only overwritten by the
/// next successful run.
///
/// # Examples
///
/// ```
/// use provflow::core::fingerprint::fingerprint_bytes;
/// use provflow::core::state::ProvenanceRecord;
/// use provflow::domain::SampleName;
///
/// let record = ProvenanceRecord::new(
///     SampleName::new("sampleA").unwrap(),
///     "/data/fasta/sampleA.fasta".into(),
///     fingerprint_bytes(b"input"),
///     "/data/out/sampleA__genoflu.tsv".into(),
///     fingerprint_bytes(b"output"),
/// );
///
/// assert!(record.matches(&fingerprint_bytes(b"input"), &fingerprint_bytes(b"output")));
/// assert!(!record.matches(&fingerprint_bytes(b"edited"), &fingerprint_bytes(b"output")));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    /// Sample this record belongs to
    pub sample_name: SampleName,

    /// When processing finished
    #[serde(alias = "timestamp_analysis_complete")]
    pub timestamp_completed: DateTime<Utc>,

    /// Input file that was processed
    #[serde(alias = "input_file")]
    pub input_file_path: PathBuf,

    /// Fingerprint of the input at completion time
    pub input_hash: Fingerprint,

    /// Final location of the output file
    #[serde(alias = "output_file")]
    pub output_file_path: PathBuf,

    /// Fingerprint of the output bytes that were placed
    pub output_hash: Fingerprint,
}

impl ProvenanceRecord {
    /// Create a record stamped with the current time
    pub fn new(
        sample_name: SampleName,
        input_file_path: PathBuf,
        input_hash: Fingerprint,
        output_file_path: PathBuf,
        output_hash: Fingerprint,
    ) -> Self {
        Self {
            sample_name,
            timestamp_completed: Utc::now(),
            input_file_path,
            input_hash,
            output_file_path,
            output_hash,
        }
    }

    /// Check both stored fingerprints against current ones
    pub fn matches(&self, input: &Fingerprint, output: &Fingerprint) -> bool {
        self.input_hash == *input && self.output_hash == *output
    }
}
