//! Summary aggregation
//!
//! Concatenates every current output into one report named
//! `<tool>_summary_<timestamp>.tsv`: the header row of the first file,
//! followed by the data rows of all files in path order.

use super::enrich::{split_tsv_line, ConfidenceEnricher, SummaryEnricher, SummaryTable};
use crate::adapters::storage::StorageBackend;
use crate::config::PipelineConfig;
use crate::core::detect::{compile_patterns, list_matching};
use crate::domain::{PipelineError, Result};
use chrono::{DateTime, Local};
use glob::Pattern;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Builds combined summary reports
pub struct SummaryAggregator {
    tool_name: String,
    output_patterns: Vec<Pattern>,
    timestamp_format: String,
    storage: Arc<dyn StorageBackend>,
    enrichers: Vec<Box<dyn SummaryEnricher>>,
}

impl SummaryAggregator {
    /// Create an aggregator with the enrichers named in configuration
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error for an invalid output glob.
    pub fn from_config(config: &PipelineConfig, storage: Arc<dyn StorageBackend>) -> Result<Self> {
        let mut aggregator = Self {
            tool_name: config.tool.name.clone(),
            output_patterns: compile_patterns(std::slice::from_ref(&config.output_glob))?,
            timestamp_format: config.summary.timestamp_format.clone(),
            storage,
            enrichers: Vec::new(),
        };
        if let Some(confidence) = &config.summary.confidence {
            aggregator = aggregator.with_enricher(Box::new(ConfidenceEnricher::new(confidence.clone())));
        }
        Ok(aggregator)
    }

    /// Append an enricher to the chain
    pub fn with_enricher(mut self, enricher: Box<dyn SummaryEnricher>) -> Self {
        self.enrichers.push(enricher);
        self
    }

    /// Summary file name for a point in time
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error if the timestamp format is invalid.
    pub fn summary_file_name(&self, at: DateTime<Local>) -> Result<String> {
        let mut stamp = String::new();
        write!(stamp, "{}", at.format(&self.timestamp_format)).map_err(|_| {
            PipelineError::Configuration(format!(
                "Invalid summary.timestamp_format '{}'",
                self.timestamp_format
            ))
        })?;
        Ok(format!("{}_summary_{stamp}.tsv", self.tool_name))
    }

    /// Build and place a summary of `output_dir` into `summary_dir`
    ///
    /// Returns the summary path, or `None` when there was nothing to do (no
    /// outputs, or a summary with the same name already exists).
    ///
    /// # Errors
    ///
    /// Returns an error if outputs cannot be read, an enricher fails, or the
    /// summary cannot be placed.
    pub async fn aggregate(
        &self,
        output_dir: &Path,
        summary_dir: &Path,
        work_dir: &Path,
    ) -> Result<Option<PathBuf>> {
        self.aggregate_at(output_dir, summary_dir, work_dir, Local::now())
            .await
    }

    /// [`aggregate`](Self::aggregate) with an explicit timestamp
    pub async fn aggregate_at(
        &self,
        output_dir: &Path,
        summary_dir: &Path,
        work_dir: &Path,
        at: DateTime<Local>,
    ) -> Result<Option<PathBuf>> {
        let outputs = list_matching(output_dir, &self.output_patterns).await?;
        if outputs.is_empty() {
            tracing::info!(output_dir = %output_dir.display(), "No outputs to summarize");
            return Ok(None);
        }

        let file_name = self.summary_file_name(at)?;
        let dest = summary_dir.join(&file_name);
        if tokio::fs::try_exists(&dest).await.unwrap_or(false) {
            tracing::info!(summary_file = %dest.display(), "Summary already exists, skipping");
            return Ok(None);
        }

        let mut table = concatenate(&outputs).await?;
        for enricher in &self.enrichers {
            enricher.enrich(&mut table)?;
            tracing::debug!(enricher = enricher.name(), "Summary enriched");
        }

        tokio::fs::create_dir_all(work_dir).await?;
        let staged = work_dir.join(format!(".{file_name}.{}", uuid::Uuid::new_v4()));
        tokio::fs::write(&staged, table.to_tsv()).await?;

        let placed = self.storage.place(&staged, &dest).await;
        let _ = tokio::fs::remove_file(&staged).await;
        placed?;

        tracing::info!(
            summary_file = %dest.display(),
            files_combined = outputs.len(),
            rows = table.rows.len(),
            "Summary written"
        );
        Ok(Some(dest))
    }
}

/// Header of the first non-empty file plus data rows of every file
async fn concatenate(outputs: &[PathBuf]) -> Result<SummaryTable> {
    let mut table = SummaryTable::default();
    let mut have_header = false;

    for path in outputs {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| PipelineError::Io(format!("{}: {e}", path.display())))?;
        let mut lines = content.lines().filter(|l| !l.trim().is_empty());

        let Some(header) = lines.next() else {
            tracing::warn!(output_file = %path.display(), "Skipping empty output");
            continue;
        };
        if !have_header {
            table.header = split_tsv_line(header);
            have_header = true;
        }
        table.rows.extend(lines.map(split_tsv_line));
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::LocalBackend;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn config(confidence: bool) -> PipelineConfig {
        let mut value = serde_json::json!({
            "input_dir": "/in",
            "output_dir": "/out",
            "provenance_dir": "/prov",
            "work_dir": "/work",
            "tool": { "name": "genoflu", "command": "genoflu.py", "output_pattern": "{sample}*.tsv" }
        });
        if confidence {
            value["summary"] = serde_json::json!({ "confidence": { "percent_column": "pct" } });
        }
        serde_json::from_value(value).unwrap()
    }

    fn aggregator(confidence: bool) -> SummaryAggregator {
        SummaryAggregator::from_config(&config(confidence), Arc::new(LocalBackend::new())).unwrap()
    }

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_summary_file_name() {
        assert_eq!(
            aggregator(false).summary_file_name(at()).unwrap(),
            "genoflu_summary_2024-05-01_0930.tsv"
        );
    }

    #[tokio::test]
    async fn test_aggregate_keeps_single_header() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("out");
        std::fs::create_dir_all(&out).unwrap();
        std::fs::write(out.join("b__genoflu.tsv"), "sample\tpct\nb\t91\n").unwrap();
        std::fs::write(out.join("a__genoflu.tsv"), "sample\tpct\na\t99\n").unwrap();
        std::fs::write(out.join("notes.txt"), "ignored").unwrap();

        let dest = aggregator(true)
            .aggregate_at(&out, &tmp.path().join("summary"), &tmp.path().join("work"), at())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(&dest).unwrap(),
            "sample\tpct\tconfidence\na\t99\thigh\nb\t91\tmedium\n"
        );
        let leftovers = std::fs::read_dir(tmp.path().join("work")).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_aggregate_noop_without_outputs() {
        let tmp = TempDir::new().unwrap();
        let result = aggregator(false)
            .aggregate_at(tmp.path(), &tmp.path().join("summary"), tmp.path(), at())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_aggregate_noop_when_summary_exists() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("out");
        let summary = tmp.path().join("summary");
        std::fs::create_dir_all(&out).unwrap();
        std::fs::create_dir_all(&summary).unwrap();
        std::fs::write(out.join("a__genoflu.tsv"), "h\nrow\n").unwrap();
        let existing = summary.join("genoflu_summary_2024-05-01_0930.tsv");
        std::fs::write(&existing, "old").unwrap();

        let result = aggregator(false)
            .aggregate_at(&out, &summary, &tmp.path().join("work"), at())
            .await
            .unwrap();

        assert!(result.is_none());
        assert_eq!(std::fs::read_to_string(existing).unwrap(), "old");
    }
}
