//! Summary post-processing
//!
//! Enrichers run on the combined table after concatenation and before the
//! summary is placed.

use crate::config::ConfidenceConfig;
use crate::domain::Result;

/// Combined tab-separated table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryTable {
    /// Header columns
    pub header: Vec<String>,
    /// Data rows
    pub rows: Vec<Vec<String>>,
}

impl SummaryTable {
    /// Index of a header column
    pub fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    /// Render as TSV with a trailing newline
    pub fn to_tsv(&self) -> String {
        let mut out = String::new();
        for line in std::iter::once(&self.header).chain(self.rows.iter()) {
            out.push_str(&line.join("\t"));
            out.push('\n');
        }
        out
    }
}

/// Split one TSV line into cells
pub fn split_tsv_line(line: &str) -> Vec<String> {
    line.split('\t').map(str::to_string).collect()
}

/// Post-processing step applied to the combined table
pub trait SummaryEnricher: Send + Sync {
    /// Name for logs
    fn name(&self) -> &str;

    /// Modify the table in place
    ///
    /// # Errors
    ///
    /// Returns an error to abort the summary for this cycle.
    fn enrich(&self, table: &mut SummaryTable) -> Result<()>;
}

/// Confidence class of a percent-match value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    /// At or above the high threshold
    High,
    /// At or above the medium threshold
    Medium,
    /// Below the medium threshold
    Low,
    /// Value missing or not a number
    Unknown,
}

impl Confidence {
    /// Column value
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
            Confidence::Unknown => "unknown",
        }
    }
}

/// Appends a confidence column derived from a percent-match column
#[derive(Debug, Clone)]
pub struct ConfidenceEnricher {
    config: ConfidenceConfig,
}

impl ConfidenceEnricher {
    /// Create an enricher from configuration
    pub fn new(config: ConfidenceConfig) -> Self {
        Self { config }
    }

    /// Classify one cell; a trailing `%` is accepted
    pub fn classify(&self, value: &str) -> Confidence {
        let Ok(percent) = value.trim().trim_end_matches('%').trim().parse::<f64>() else {
            return Confidence::Unknown;
        };
        if !percent.is_finite() {
            Confidence::Unknown
        } else if percent >= self.config.high_threshold {
            Confidence::High
        } else if percent >= self.config.medium_threshold {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

impl SummaryEnricher for ConfidenceEnricher {
    fn name(&self) -> &str {
        "confidence"
    }

    fn enrich(&self, table: &mut SummaryTable) -> Result<()> {
        let Some(source) = table.column(&self.config.percent_column) else {
            tracing::warn!(
                column = %self.config.percent_column,
                "Percent column not in summary header, confidence not added"
            );
            return Ok(());
        };

        table.header.push(self.config.output_column.clone());
        for row in &mut table.rows {
            let class = row
                .get(source)
                .map_or(Confidence::Unknown, |v| self.classify(v));
            row.push(class.as_str().to_string());
        }
        Ok(())
    }
}
