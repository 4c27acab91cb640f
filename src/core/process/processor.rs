//! Item processor
//!
//! Runs the external tool on one input and, on success, places the output and
//! its provenance record. Every failure is caught here, logged with the
//! sample name, command and captured stderr, and reported in the returned
//! [`ItemOutcome`]; nothing propagates to the batch executor.

use super::transform::{CopyTransform, InputTransform};
use super::workspace::{Workspace, SCRATCH_DIR};
use crate::adapters::storage::{BackendKind, StorageBackend};
use crate::adapters::tool::{TemplateVars, ToolCommand};
use crate::config::{PipelineConfig, ToolConfig};
use crate::core::detect::{compile_patterns, list_matching};
use crate::core::fingerprint::fingerprint;
use crate::core::state::{ProvenanceLedger, ProvenanceRecord};
use crate::domain::sample::output_file_name;
use crate::domain::{input_name, PipelineError, Result, SampleName};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Why an item failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    /// Error category, see [`PipelineError::kind`]
    pub kind: &'static str,
    /// Human-readable message
    pub message: String,
}

/// Result of processing one item
#[derive(Debug, Clone)]
pub struct ItemOutcome {
    /// Input that was processed
    pub input_path: PathBuf,
    /// Sample name, when it could be derived
    pub sample: Option<SampleName>,
    /// Final output location on success
    pub output_path: Option<PathBuf>,
    /// Failure details, `None` on success
    pub failure: Option<ItemFailure>,
    /// Wall time spent on the item
    pub duration: Duration,
}

impl ItemOutcome {
    /// Whether the item completed and has a provenance record
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Sample name for logs, falling back to the input path
    pub fn label(&self) -> String {
        match &self.sample {
            Some(sample) => sample.to_string(),
            None => self.input_path.display().to_string(),
        }
    }
}

/// Processes single items
pub struct ItemProcessor {
    tool: ToolConfig,
    output_dir: PathBuf,
    work_dir: PathBuf,
    storage: Arc<dyn StorageBackend>,
    ledger: Arc<ProvenanceLedger>,
    transform: Arc<dyn InputTransform>,
}

impl ItemProcessor {
    /// Create a processor with the byte-copy input transform
    pub fn new(
        config: &PipelineConfig,
        storage: Arc<dyn StorageBackend>,
        ledger: Arc<ProvenanceLedger>,
    ) -> Self {
        Self {
            tool: config.tool.clone(),
            output_dir: config.output_dir.clone(),
            work_dir: config.work_dir.clone(),
            storage,
            ledger,
            transform: Arc::new(CopyTransform),
        }
    }

    /// Replace the input transform
    pub fn with_transform(mut self, transform: Arc<dyn InputTransform>) -> Self {
        self.transform = transform;
        self
    }

    /// Final output path for a sample
    pub fn output_path(&self, sample: &SampleName) -> PathBuf {
        self.output_dir.join(output_file_name(
            sample,
            &self.tool.name,
            &self.tool.output_extension,
        ))
    }

    /// Process one input file
    ///
    /// Never fails: errors are logged and returned in the outcome. A failed
    /// item leaves no provenance record, so it is selected again next cycle.
    pub async fn process(&self, input_path: &Path) -> ItemOutcome {
        let started = Instant::now();
        let sample = input_name(input_path);

        let result = match &sample {
            Some(sample) => self.process_sample(sample, input_path).await,
            None => Err(PipelineError::Configuration(format!(
                "Cannot derive a sample name from {}",
                input_path.display()
            ))),
        };

        let duration = started.elapsed();
        let sample_label = sample
            .as_ref()
            .map(|s| s.to_string())
            .unwrap_or_default();

        match result {
            Ok(output_path) => {
                tracing::info!(
                    sample_name = %sample_label,
                    output_file = %output_path.display(),
                    duration_ms = duration.as_millis() as u64,
                    "Sample processed"
                );
                ItemOutcome {
                    input_path: input_path.to_path_buf(),
                    sample,
                    output_path: Some(output_path),
                    failure: None,
                    duration,
                }
            }
            Err(error) => {
                log_failure(&sample_label, input_path, &error);
                ItemOutcome {
                    input_path: input_path.to_path_buf(),
                    sample,
                    output_path: None,
                    failure: Some(ItemFailure {
                        kind: error.kind(),
                        message: error.to_string(),
                    }),
                    duration,
                }
            }
        }
    }

    async fn process_sample(&self, sample: &SampleName, input_path: &Path) -> Result<PathBuf> {
        if !tokio::fs::try_exists(input_path).await.unwrap_or(false) {
            return Err(PipelineError::MissingFile(input_path.to_path_buf()));
        }

        let workspace = Workspace::create(&self.work_dir, sample).await?;
        let result = self.run_in_workspace(sample, input_path, &workspace).await;
        workspace.cleanup().await;
        result
    }

    async fn run_in_workspace(
        &self,
        sample: &SampleName,
        input_path: &Path,
        workspace: &Workspace,
    ) -> Result<PathBuf> {
        // Hash before the tool reads the input so a concurrent edit shows up as drift
        let input_hash = fingerprint(input_path).await?;

        let input_file_name = input_path
            .file_name()
            .ok_or_else(|| PipelineError::MissingFile(input_path.to_path_buf()))?;
        let working_copy = workspace.scratch_dir().join(input_file_name);
        self.transform.apply(input_path, &working_copy).await?;
        tracing::debug!(
            sample_name = %sample,
            transform = self.transform.name(),
            working_copy = %working_copy.display(),
            "Working copy ready"
        );

        let link_name = self.tool.input_link_name.replace("{sample}", sample.as_str());
        let link_target = Path::new(SCRATCH_DIR).join(input_file_name);
        link_input(workspace.path(), &link_target, &link_name).await?;

        let vars = TemplateVars {
            sample: sample.as_str(),
            input: &link_name,
            input_path,
            workspace: workspace.path(),
        };
        let command = ToolCommand::from_config(&self.tool, &vars);
        let output = command.run(workspace.path()).await?;
        tracing::debug!(
            sample_name = %sample,
            elapsed_ms = output.elapsed.as_millis() as u64,
            stdout_bytes = output.stdout.len(),
            "Tool finished"
        );

        let pattern = vars.expand_glob(&self.tool.output_pattern);
        let artifact = locate_artifact(workspace.path(), &pattern, &link_name).await?;

        let dest = self.output_path(sample);
        self.storage.place(&artifact, &dest).await?;

        // Hash what change detection will read back. The remote store's
        // mounted view may lag the upload, so remote hashes the uploaded bytes.
        let output_hash = match self.storage.kind() {
            BackendKind::Local => fingerprint(&dest).await?,
            BackendKind::Remote => fingerprint(&artifact).await?,
        };

        let record = ProvenanceRecord::new(
            sample.clone(),
            input_path.to_path_buf(),
            input_hash,
            dest.clone(),
            output_hash,
        );
        self.ledger.write(&record, &workspace.scratch_dir()).await?;

        Ok(dest)
    }
}

async fn locate_artifact(workspace: &Path, pattern: &str, link_name: &str) -> Result<PathBuf> {
    let patterns = compile_patterns(&[pattern])?;
    let matches: Vec<PathBuf> = list_matching(workspace, &patterns)
        .await?
        .into_iter()
        .filter(|p| p.file_name().and_then(|n| n.to_str()) != Some(link_name))
        .collect();

    match <[PathBuf; 1]>::try_from(matches) {
        Ok([single]) => Ok(single),
        Err(matches) => Err(PipelineError::AmbiguousOutput {
            pattern: pattern.to_string(),
            matches,
        }),
    }
}

/// Expose the working copy at the fixed name the tool expects
///
/// `target` is relative to the workspace so the link stays valid whatever
/// the process working directory is.
#[cfg(unix)]
async fn link_input(workspace: &Path, target: &Path, link_name: &str) -> Result<()> {
    tokio::fs::symlink(target, workspace.join(link_name)).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn link_input(workspace: &Path, target: &Path, link_name: &str) -> Result<()> {
    tokio::fs::copy(workspace.join(target), workspace.join(link_name)).await?;
    Ok(())
}

fn log_failure(sample: &str, input_path: &Path, error: &PipelineError) {
    match error {
        PipelineError::ToolExecution {
            command,
            exit_code,
            stderr,
        } => tracing::error!(
            sample_name = %sample,
            input_file = %input_path.display(),
            error_kind = error.kind(),
            command = %command,
            exit_code = ?exit_code,
            stderr = %stderr,
            "Sample failed"
        ),
        _ => tracing::error!(
            sample_name = %sample,
            input_file = %input_path.display(),
            error_kind = error.kind(),
            error = %error,
            "Sample failed"
        ),
    }
}
