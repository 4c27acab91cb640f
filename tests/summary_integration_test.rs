//! Summary aggregation over a populated output directory

use chrono::{Local, TimeZone};
use provflow::adapters::storage::LocalBackend;
use provflow::config::PipelineConfig;
use provflow::core::summary::{SummaryAggregator, SummaryEnricher, SummaryTable};
use provflow::domain::Result;
use std::sync::Arc;
use tempfile::TempDir;

fn config(confidence: Option<serde_json::Value>) -> PipelineConfig {
    let mut value = serde_json::json!({
        "input_dir": "/in",
        "output_dir": "/out",
        "provenance_dir": "/prov",
        "work_dir": "/work",
        "tool": { "name": "genoflu", "command": "genoflu.py", "output_pattern": "{sample}*.tsv" }
    });
    if let Some(confidence) = confidence {
        value["summary"] = serde_json::json!({ "confidence": confidence });
    }
    serde_json::from_value(value).unwrap()
}

fn write_outputs(dir: &std::path::Path) {
    std::fs::create_dir_all(dir).unwrap();
    for (sample, pct) in [("s1", ["99.1", "97.0"]), ("s2", ["88", "n/a"]), ("s3", ["100%", "90"])] {
        let body = format!(
            "Strain\tGenotype\tPercent\n{sample}\tA\t{}\n{sample}\tB\t{}\n",
            pct[0], pct[1]
        );
        std::fs::write(dir.join(format!("{sample}__genoflu.tsv")), body).unwrap();
    }
}

#[tokio::test]
async fn test_three_files_yield_one_header_and_six_rows() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("out");
    write_outputs(&out);

    let aggregator =
        SummaryAggregator::from_config(&config(None), Arc::new(LocalBackend::new())).unwrap();
    let at = Local.with_ymd_and_hms(2025, 1, 2, 3, 4, 0).unwrap();
    let summary = aggregator
        .aggregate_at(&out, &tmp.path().join("summary"), &tmp.path().join("work"), at)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        summary.file_name().unwrap(),
        "genoflu_summary_2025-01-02_0304.tsv"
    );
    let content = std::fs::read_to_string(&summary).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 7);
    assert_eq!(lines[0], "Strain\tGenotype\tPercent");
    assert_eq!(lines.iter().filter(|l| l.starts_with("Strain")).count(), 1);
    assert!(lines[1].starts_with("s1\t"));
    assert!(lines[6].starts_with("s3\t"));
}

#[tokio::test]
async fn test_confidence_column_appended() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("out");
    write_outputs(&out);

    let aggregator = SummaryAggregator::from_config(
        &config(Some(serde_json::json!({ "percent_column": "Percent" }))),
        Arc::new(LocalBackend::new()),
    )
    .unwrap();
    let summary = aggregator
        .aggregate(&out, &tmp.path().join("summary"), &tmp.path().join("work"))
        .await
        .unwrap()
        .unwrap();

    let content = std::fs::read_to_string(summary).unwrap();
    let confidence: Vec<&str> = content
        .lines()
        .map(|l| l.rsplit('\t').next().unwrap())
        .collect();
    assert_eq!(
        confidence,
        vec!["confidence", "high", "medium", "low", "unknown", "high", "medium"]
    );
}

struct FailingEnricher;

impl SummaryEnricher for FailingEnricher {
    fn name(&self) -> &str {
        "failing"
    }

    fn enrich(&self, _table: &mut SummaryTable) -> Result<()> {
        Err(provflow::domain::PipelineError::Serialization(
            "cannot enrich".to_string(),
        ))
    }
}

#[tokio::test]
async fn test_enricher_failure_places_nothing() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("out");
    let summary_dir = tmp.path().join("summary");
    write_outputs(&out);

    let aggregator =
        SummaryAggregator::from_config(&config(None), Arc::new(LocalBackend::new()))
            .unwrap()
            .with_enricher(Box::new(FailingEnricher));

    let result = aggregator
        .aggregate(&out, &summary_dir, &tmp.path().join("work"))
        .await;

    assert!(result.is_err());
    assert!(!summary_dir.exists() || std::fs::read_dir(&summary_dir).unwrap().next().is_none());
}
