//! Change detection
//!
//! Reconciles discovered inputs, discovered outputs and the provenance ledger
//! into the set of samples that need (re)processing.

use crate::core::fingerprint::fingerprint_if_exists;
use crate::core::state::LedgerReader;
use crate::domain::{input_name, output_name, PipelineError, Result, SampleName};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Why a sample needs processing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    /// Input has no output yet
    NeverProcessed,
    /// Output exists without a provenance record
    ProvenanceMissing,
    /// Provenance record exists but cannot be parsed
    ProvenanceCorrupt,
    /// Input bytes differ from the recorded fingerprint
    InputChanged,
    /// Output bytes differ from the recorded fingerprint
    OutputChanged,
    /// Output vanished between discovery and fingerprinting
    OutputMissing,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Reason::NeverProcessed => "never_processed",
            Reason::ProvenanceMissing => "provenance_file_missing",
            Reason::ProvenanceCorrupt => "provenance_file_corrupt",
            Reason::InputChanged => "input_file_changed_hash_mismatch",
            Reason::OutputChanged => "output_file_changed_hash_mismatch",
            Reason::OutputMissing => "output_file_missing",
        };
        f.write_str(s)
    }
}

/// One sample selected for processing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Sample name
    pub sample: SampleName,
    /// Input file to process
    pub input_path: PathBuf,
    /// Decision that selected it
    pub reason: Reason,
}

/// Samples that need processing in the current cycle, sorted by name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkSet {
    items: Vec<WorkItem>,
}

impl WorkSet {
    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when nothing needs processing
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in sample-name order
    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    /// Sample names in order
    pub fn samples(&self) -> Vec<SampleName> {
        self.items.iter().map(|i| i.sample.clone()).collect()
    }

    /// Input paths in order
    pub fn input_paths(&self) -> Vec<PathBuf> {
        self.items.iter().map(|i| i.input_path.clone()).collect()
    }
}

/// Compute the work set
///
/// Paired samples (present as input and output) are checked against their
/// provenance record; unpaired inputs always need processing. Outputs without
/// an input are ignored. On duplicate sample names within one listing the
/// last path wins.
///
/// Running this twice on an unchanged filesystem returns the same work set.
///
/// # Errors
///
/// Returns an error only for unexpected I/O failures. Missing files and
/// corrupt records are decisions, not errors.
pub async fn reconcile(
    inputs: &[PathBuf],
    outputs: &[PathBuf],
    ledger: &dyn LedgerReader,
) -> Result<WorkSet> {
    let inputs_by_name = index_by(inputs, |p| input_name(p));
    let outputs_by_name = index_by(outputs, |p| output_name(p));

    let mut items = Vec::new();
    for (sample, input_path) in &inputs_by_name {
        let reason = match outputs_by_name.get(sample) {
            None => Some(Reason::NeverProcessed),
            Some(output_path) => check_paired(sample, input_path, output_path, ledger).await?,
        };

        if let Some(reason) = reason {
            if reason == Reason::NeverProcessed {
                crate::log_detection!(sample, reason);
            }
            items.push(WorkItem {
                sample: sample.clone(),
                input_path: input_path.clone(),
                reason,
            });
        }
    }

    Ok(WorkSet { items })
}

async fn check_paired(
    sample: &SampleName,
    input_path: &Path,
    output_path: &Path,
    ledger: &dyn LedgerReader,
) -> Result<Option<Reason>> {
    let record = match ledger.read(sample).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            tracing::warn!(
                sample_name = %sample,
                reason = %Reason::ProvenanceMissing,
                "Provenance record missing"
            );
            return Ok(Some(Reason::ProvenanceMissing));
        }
        Err(PipelineError::CorruptProvenance { path, reason }) => {
            tracing::warn!(
                sample_name = %sample,
                provenance_file = %path.display(),
                error = %reason,
                "Provenance record corrupt, treating as absent"
            );
            return Ok(Some(Reason::ProvenanceCorrupt));
        }
        Err(e) => return Err(e),
    };

    let input_hash = fingerprint_if_exists(input_path).await?;
    if input_hash.as_ref() != Some(&record.input_hash) {
        tracing::warn!(
            sample_name = %sample,
            reason = %Reason::InputChanged,
            input_file = %input_path.display(),
            provenance_hash = %record.input_hash,
            input_hash = input_hash.as_ref().map(|h| h.as_str()).unwrap_or("missing"),
            "Input changed since last run"
        );
        return Ok(Some(Reason::InputChanged));
    }

    let output_hash = match fingerprint_if_exists(output_path).await? {
        Some(hash) => hash,
        None => {
            tracing::warn!(
                sample_name = %sample,
                reason = %Reason::OutputMissing,
                output_file = %output_path.display(),
                "Recorded output is missing"
            );
            return Ok(Some(Reason::OutputMissing));
        }
    };
    if output_hash != record.output_hash {
        tracing::warn!(
            sample_name = %sample,
            reason = %Reason::OutputChanged,
            output_file = %output_path.display(),
            provenance_hash = %record.output_hash,
            output_hash = %output_hash,
            "Output changed since last run"
        );
        return Ok(Some(Reason::OutputChanged));
    }

    tracing::debug!(sample_name = %sample, "Sample up to date");
    Ok(None)
}

fn index_by<F>(paths: &[PathBuf], name_of: F) -> BTreeMap<SampleName, PathBuf>
where
    F: Fn(&PathBuf) -> Option<SampleName>,
{
    let mut map = BTreeMap::new();
    for path in paths {
        match name_of(path) {
            Some(name) => {
                map.insert(name, path.clone());
            }
            None => tracing::debug!(file = %path.display(), "Skipping file without a sample name"),
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fingerprint::{fingerprint_bytes, Fingerprint};
    use crate::core::state::ProvenanceRecord;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[derive(Default)]
    struct MemoryLedger {
        records: HashMap<String, ProvenanceRecord>,
        corrupt: Vec<String>,
    }

    #[async_trait]
    impl LedgerReader for MemoryLedger {
        async fn read(&self, sample: &SampleName) -> Result<Option<ProvenanceRecord>> {
            if self.corrupt.iter().any(|c| c == sample.as_str()) {
                return Err(PipelineError::CorruptProvenance {
                    path: PathBuf::from(sample.as_str()),
                    reason: "bad json".to_string(),
                });
            }
            Ok(self.records.get(sample.as_str()).cloned())
        }
    }

    struct Fixture {
        dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: TempDir::new().unwrap(),
            }
        }

        fn file(&self, name: &str, content: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            std::fs::write(&path, content).unwrap();
            path
        }
    }

    fn record_for(
        sample: &str,
        input: &Path,
        input_hash: Fingerprint,
        output_hash: Fingerprint,
    ) -> ProvenanceRecord {
        ProvenanceRecord::new(
            SampleName::new(sample).unwrap(),
            input.to_path_buf(),
            input_hash,
            PathBuf::from(format!("{sample}__genoflu.tsv")),
            output_hash,
        )
    }

    #[tokio::test]
    async fn test_unpaired_input_never_processed() {
        let fx = Fixture::new();
        let input = fx.file("s1.fasta", ">s1\nACGT\n");

        let work = reconcile(&[input.clone()], &[], &MemoryLedger::default())
            .await
            .unwrap();

        assert_eq!(work.len(), 1);
        assert_eq!(work.items()[0].reason, Reason::NeverProcessed);
        assert_eq!(work.input_paths(), vec![input]);
    }

    #[tokio::test]
    async fn test_outputs_without_inputs_ignored() {
        let fx = Fixture::new();
        let output = fx.file("orphan__genoflu.tsv", "h\n");

        let work = reconcile(&[], &[output], &MemoryLedger::default())
            .await
            .unwrap();
        assert!(work.is_empty());
    }

    #[tokio::test]
    async fn test_paired_decisions() {
        let fx = Fixture::new();
        let ok_in = fx.file("ok.fasta", "in-ok");
        let ok_out = fx.file("ok__genoflu.tsv", "out-ok");
        let norec_in = fx.file("norec.fasta", "in-norec");
        let norec_out = fx.file("norec__genoflu.tsv", "out-norec");
        let bad_in = fx.file("bad.fasta", "in-bad");
        let bad_out = fx.file("bad__genoflu.tsv", "out-bad");
        let drift_in = fx.file("drift.fasta", "in-drift-new");
        let drift_out = fx.file("drift__genoflu.tsv", "out-drift");
        let edit_in = fx.file("edit.fasta", "in-edit");
        let edit_out = fx.file("edit__genoflu.tsv", "out-edit-tampered");

        let mut ledger = MemoryLedger::default();
        ledger.records.insert(
            "ok".into(),
            record_for("ok", &ok_in, fingerprint_bytes(b"in-ok"), fingerprint_bytes(b"out-ok")),
        );
        ledger.records.insert(
            "drift".into(),
            record_for("drift", &drift_in, fingerprint_bytes(b"in-drift-old"), fingerprint_bytes(b"out-drift")),
        );
        ledger.records.insert(
            "edit".into(),
            record_for("edit", &edit_in, fingerprint_bytes(b"in-edit"), fingerprint_bytes(b"out-edit")),
        );
        ledger.corrupt.push("bad".into());

        let inputs = vec![ok_in, norec_in, bad_in, drift_in, edit_in];
        let outputs = vec![ok_out, norec_out, bad_out, drift_out, edit_out];
        let work = reconcile(&inputs, &outputs, &ledger).await.unwrap();

        let decisions: Vec<(String, Reason)> = work
            .items()
            .iter()
            .map(|i| (i.sample.to_string(), i.reason))
            .collect();
        assert_eq!(
            decisions,
            vec![
                ("bad".to_string(), Reason::ProvenanceCorrupt),
                ("drift".to_string(), Reason::InputChanged),
                ("edit".to_string(), Reason::OutputChanged),
                ("norec".to_string(), Reason::ProvenanceMissing),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_output_forces_reprocessing() {
        let fx = Fixture::new();
        let input = fx.file("s1.fasta", "in");
        let output = fx.dir.path().join("s1__genoflu.tsv");

        let mut ledger = MemoryLedger::default();
        ledger.records.insert(
            "s1".into(),
            record_for("s1", &input, fingerprint_bytes(b"in"), fingerprint_bytes(b"out")),
        );

        let work = reconcile(&[input], &[output], &ledger).await.unwrap();
        assert_eq!(work.items()[0].reason, Reason::OutputMissing);
    }

    #[tokio::test]
    async fn test_duplicate_names_last_writer_wins() {
        let fx = Fixture::new();
        let first = fx.file("s1.fa", "a");
        let second = fx.file("s1.fasta", "b");

        let work = reconcile(&[first, second.clone()], &[], &MemoryLedger::default())
            .await
            .unwrap();
        assert_eq!(work.input_paths(), vec![second]);
    }

    #[tokio::test]
    async fn test_reconcile_idempotent() {
        let fx = Fixture::new();
        let inputs = vec![fx.file("a.fasta", "a"), fx.file("b.fasta", "b")];
        let outputs = vec![fx.file("a__genoflu.tsv", "x")];
        let ledger = MemoryLedger::default();

        let first = reconcile(&inputs, &outputs, &ledger).await.unwrap();
        let second = reconcile(&inputs, &outputs, &ledger).await.unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(Reason::ProvenanceMissing.to_string(), "provenance_file_missing");
        assert_eq!(
            Reason::OutputChanged.to_string(),
            "output_file_changed_hash_mismatch"
        );
    }
}
