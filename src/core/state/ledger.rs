//! Provenance ledger persistence
//!
//! Records live at `<provenance_dir>/<sample>__<tool>_complete.json`. Reads
//! go through the local filesystem view of the provenance directory; writes
//! are staged locally and handed to the storage backend so a partially
//! written record is never visible at the ledger path.
//!
//! The ledger has no locking. Running more than one pipeline against the same
//! input, output and provenance directories can double-write records, so a
//! single active writer per directory triple is an operating requirement.

use crate::adapters::storage::StorageBackend;
use crate::core::state::record::ProvenanceRecord;
use crate::domain::sample::{provenance_file_name, OUTPUT_DELIMITER, PROVENANCE_SUFFIX};
use crate::domain::{PipelineError, Result, SampleName};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Read access to provenance records
///
/// Change detection depends only on this trait so that it can be exercised
/// against an in-memory ledger.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Load the record for a sample
    ///
    /// Returns `Ok(None)` when no record exists.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::CorruptProvenance` when a record exists but
    /// cannot be parsed. Callers treat this exactly like an absent record.
    async fn read(&self, sample: &SampleName) -> Result<Option<ProvenanceRecord>>;
}

/// Provenance ledger backed by a directory of JSON records
pub struct ProvenanceLedger {
    provenance_dir: PathBuf,
    tool_name: String,
    storage: Arc<dyn StorageBackend>,
}

impl ProvenanceLedger {
    /// Create a ledger for one tool's records in `provenance_dir`
    pub fn new(
        provenance_dir: impl Into<PathBuf>,
        tool_name: impl Into<String>,
        storage: Arc<dyn StorageBackend>,
    ) -> Self {
        Self {
            provenance_dir: provenance_dir.into(),
            tool_name: tool_name.into(),
            storage,
        }
    }

    /// Directory holding the records
    pub fn provenance_dir(&self) -> &Path {
        &self.provenance_dir
    }

    /// Deterministic record path for a sample
    pub fn record_path(&self, sample: &SampleName) -> PathBuf {
        self.provenance_dir
            .join(provenance_file_name(sample, &self.tool_name))
    }

    /// Persist a record
    ///
    /// The record is serialized in full to `staging_dir` and then placed at
    /// its ledger path by the storage backend. The staged copy is left for the
    /// caller's workspace cleanup.
    ///
    /// # Errors
    ///
    /// Returns an error if staging or placement fails; the ledger path is left
    /// untouched in that case.
    pub async fn write(&self, record: &ProvenanceRecord, staging_dir: &Path) -> Result<PathBuf> {
        let file_name = provenance_file_name(&record.sample_name, &self.tool_name);
        let staged = staging_dir.join(&file_name);
        let dest = self.provenance_dir.join(&file_name);

        let body = serde_json::to_vec_pretty(record)?;
        tokio::fs::write(&staged, body).await?;

        self.storage.place(&staged, &dest).await?;

        tracing::info!(
            sample_name = %record.sample_name,
            provenance_file = %dest.display(),
            "Provenance record written"
        );
        Ok(dest)
    }

    /// Load every readable record of this tool
    ///
    /// Corrupt records are skipped with a warning. A missing provenance
    /// directory yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be listed.
    pub async fn list(&self) -> Result<Vec<ProvenanceRecord>> {
        let suffix = format!("{OUTPUT_DELIMITER}{}{PROVENANCE_SUFFIX}", self.tool_name);

        let mut entries = match tokio::fs::read_dir(&self.provenance_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_record = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(&suffix));
            if !is_record {
                continue;
            }

            match read_record(&path).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => tracing::warn!(
                    provenance_file = %path.display(),
                    error = %e,
                    "Skipping unreadable provenance record"
                ),
            }
        }

        records.sort_by(|a, b| a.sample_name.cmp(&b.sample_name));
        Ok(records)
    }
}

#[async_trait]
impl LedgerReader for ProvenanceLedger {
    async fn read(&self, sample: &SampleName) -> Result<Option<ProvenanceRecord>> {
        read_record(&self.record_path(sample)).await
    }
}

async fn read_record(path: &Path) -> Result<Option<ProvenanceRecord>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| PipelineError::CorruptProvenance {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::LocalBackend;
    use crate::core::fingerprint::fingerprint_bytes;
    use tempfile::TempDir;

    fn ledger(dir: &Path) -> ProvenanceLedger {
        ProvenanceLedger::new(dir, "genoflu", Arc::new(LocalBackend::new()))
    }

    fn sample(name: &str) -> SampleName {
        SampleName::new(name).unwrap()
    }

    fn record(name: &str) -> ProvenanceRecord {
        ProvenanceRecord::new(
            sample(name),
            PathBuf::from(format!("/in/{name}.fasta")),
            fingerprint_bytes(b"in"),
            PathBuf::from(format!("/out/{name}__genoflu.tsv")),
            fingerprint_bytes(b"out"),
        )
    }

    #[test]
    fn test_record_path() {
        let ledger = ledger(Path::new("/prov"));
        assert_eq!(
            ledger.record_path(&sample("s1")),
            PathBuf::from("/prov/s1__genoflu_complete.json")
        );
    }

    #[tokio::test]
    async fn test_read_missing_is_none() {
        let tmp = TempDir::new().unwrap();
        let ledger = ledger(tmp.path());
        assert!(ledger.read(&sample("s1")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let tmp = TempDir::new().unwrap();
        let staging = TempDir::new().unwrap();
        let prov = tmp.path().join("prov");
        let ledger = ledger(&prov);
        let original = record("s1");

        let dest = ledger.write(&original, staging.path()).await.unwrap();

        assert_eq!(dest, prov.join("s1__genoflu_complete.json"));
        assert_eq!(ledger.read(&sample("s1")).await.unwrap(), Some(original));
    }

    #[tokio::test]
    async fn test_read_corrupt_record() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("s1__genoflu_complete.json"), "{ truncated").unwrap();

        let err = ledger(tmp.path()).read(&sample("s1")).await.unwrap_err();
        assert!(matches!(err, PipelineError::CorruptProvenance { .. }));
    }

    #[tokio::test]
    async fn test_list_skips_corrupt_and_foreign_records() {
        let tmp = TempDir::new().unwrap();
        let staging = TempDir::new().unwrap();
        let ledger = ledger(tmp.path());

        ledger.write(&record("b"), staging.path()).await.unwrap();
        ledger.write(&record("a"), staging.path()).await.unwrap();
        std::fs::write(tmp.path().join("c__genoflu_complete.json"), "not json").unwrap();
        std::fs::write(tmp.path().join("d__flumut_complete.json"), "{}").unwrap();

        let names: Vec<String> = ledger
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.sample_name.to_string())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_list_missing_directory() {
        let tmp = TempDir::new().unwrap();
        let ledger = ledger(&tmp.path().join("absent"));
        assert!(ledger.list().await.unwrap().is_empty());
    }
}
