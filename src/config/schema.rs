//! Configuration schema types
//!
//! This module defines the configuration structure for provflow. The file is
//! JSON (TOML is accepted too, chosen by file extension) and is reloaded once
//! per pipeline cycle.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// Default pause between pipeline cycles
pub const DEFAULT_SCAN_INTERVAL_SECONDS: f64 = 300.0;

/// Main provflow configuration
///
/// This is the root configuration structure that maps to the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory scanned for input files
    pub input_dir: PathBuf,

    /// Directory holding one output file per processed sample
    pub output_dir: PathBuf,

    /// Directory holding one provenance record per processed sample
    pub provenance_dir: PathBuf,

    /// Local scratch directory; each item gets its own subdirectory
    #[serde(alias = "rename_dir")]
    pub work_dir: PathBuf,

    /// Destination of combined summary reports (aggregation is skipped when unset)
    #[serde(default)]
    pub summary_dir: Option<PathBuf>,

    /// Glob patterns (relative to `input_dir`) selecting input files
    #[serde(default = "default_input_globs")]
    pub input_globs: Vec<String>,

    /// Glob pattern (relative to `output_dir`) selecting output files
    #[serde(default = "default_output_glob")]
    pub output_glob: String,

    /// Pause between cycles; falls back to 300 when absent or unparseable
    #[serde(
        default = "default_scan_interval_seconds",
        deserialize_with = "lenient_scan_interval"
    )]
    pub scan_interval_seconds: f64,

    /// Write outputs, records and summaries through the remote object store
    #[serde(default)]
    pub use_nextcloud: bool,

    /// Run batches as a distributed array job instead of sequentially
    #[serde(default)]
    pub use_slurm: bool,

    /// Array job parameters
    #[serde(default)]
    pub slurm_params: SlurmParams,

    /// External analysis tool
    pub tool: ToolConfig,

    /// Remote object store settings (credentials come from the environment)
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Summary aggregation settings
    #[serde(default)]
    pub summary: SummaryConfig,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl PipelineConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        for (key, dir) in [
            ("input_dir", &self.input_dir),
            ("output_dir", &self.output_dir),
            ("provenance_dir", &self.provenance_dir),
            ("work_dir", &self.work_dir),
        ] {
            if dir.as_os_str().is_empty() {
                return Err(format!("{key} cannot be empty"));
            }
        }

        if let Some(summary_dir) = &self.summary_dir {
            if summary_dir.starts_with(&self.output_dir) {
                return Err(format!(
                    "summary_dir '{}' must not be inside output_dir '{}'",
                    summary_dir.display(),
                    self.output_dir.display()
                ));
            }
        }

        if self.input_globs.is_empty() {
            return Err("input_globs must contain at least one pattern".to_string());
        }
        for pattern in self.input_globs.iter().chain(std::iter::once(&self.output_glob)) {
            glob::Pattern::new(pattern)
                .map_err(|e| format!("Invalid glob pattern '{pattern}': {e}"))?;
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }

        self.tool.validate()?;
        if self.use_slurm {
            self.slurm_params.validate()?;
        }
        self.remote.validate()?;
        self.summary.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Scan interval as a `Duration`
    ///
    /// Falls back to the default when the value does not fit a `Duration`.
    pub fn scan_interval(&self) -> std::time::Duration {
        std::time::Duration::try_from_secs_f64(self.scan_interval_seconds).unwrap_or_else(|e| {
            tracing::warn!(
                scan_interval_seconds = self.scan_interval_seconds,
                error = %e,
                "Scan interval out of range, using default"
            );
            std::time::Duration::from_secs_f64(DEFAULT_SCAN_INTERVAL_SECONDS)
        })
    }
}

/// External analysis tool invocation
///
/// `args`, `output_pattern` and `input_link_name` accept the placeholders
/// `{sample}`, `{input}` (the link name inside the workspace), `{input_path}`
/// (the original input file) and `{workspace}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Short tool name used in output and provenance file names
    pub name: String,

    /// Executable to run
    pub command: String,

    /// Arguments, with placeholders expanded per item
    #[serde(default)]
    pub args: Vec<String>,

    /// Glob (relative to the item workspace) locating the primary output
    pub output_pattern: String,

    /// Extension of the final output file, without the dot
    #[serde(default = "default_output_extension")]
    pub output_extension: String,

    /// Fixed name under which the tool sees its input
    #[serde(default = "default_input_link_name")]
    pub input_link_name: String,

    /// Kill the tool after this many seconds (no limit when unset)
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

impl ToolConfig {
    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("tool.name cannot be empty".to_string());
        }
        if self.name.contains(crate::domain::sample::OUTPUT_DELIMITER) {
            return Err(format!(
                "tool.name cannot contain '{}'",
                crate::domain::sample::OUTPUT_DELIMITER
            ));
        }
        if self.command.trim().is_empty() {
            return Err("tool.command cannot be empty".to_string());
        }
        if self.output_pattern.trim().is_empty() {
            return Err("tool.output_pattern cannot be empty".to_string());
        }
        if self.output_extension.trim().is_empty() || self.output_extension.starts_with('.') {
            return Err("tool.output_extension must be non-empty and without a leading dot".to_string());
        }
        if self.timeout_seconds == Some(0) {
            return Err("tool.timeout_seconds must be > 0".to_string());
        }
        Ok(())
    }
}

/// Distributed array job parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlurmParams {
    /// Job name shown by the scheduler
    #[serde(default = "default_job_name")]
    pub job_name: String,

    /// Partition (queue)
    #[serde(default = "default_partition")]
    pub partition: String,

    /// Per-task wall time limit, scheduler format
    #[serde(default = "default_time")]
    pub time: String,

    /// Per-task memory, scheduler format
    #[serde(default = "default_mem")]
    pub mem: String,

    /// CPUs per task
    #[serde(default = "default_cpus_per_task")]
    pub cpus_per_task: u32,

    /// Maximum number of tasks running at once
    #[serde(default = "default_array_parallelism")]
    pub array_parallelism: u32,

    /// Directory for scheduler log files and task manifests
    #[serde(default = "default_slurm_log_dir")]
    pub log_dir: PathBuf,

    /// Wait between task state checks
    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,

    /// Give up on tasks that are not terminal after this long
    #[serde(default = "default_max_wait_seconds")]
    pub max_wait_seconds: u64,
}

impl SlurmParams {
    fn validate(&self) -> Result<(), String> {
        if self.job_name.trim().is_empty() {
            return Err("slurm_params.job_name cannot be empty".to_string());
        }
        if self.cpus_per_task == 0 {
            return Err("slurm_params.cpus_per_task must be > 0".to_string());
        }
        if self.array_parallelism == 0 {
            return Err("slurm_params.array_parallelism must be > 0".to_string());
        }
        if self.poll_interval_seconds == 0 {
            return Err("slurm_params.poll_interval_seconds must be > 0".to_string());
        }
        if self.max_wait_seconds < self.poll_interval_seconds {
            return Err(
                "slurm_params.max_wait_seconds must be >= poll_interval_seconds".to_string(),
            );
        }
        Ok(())
    }
}

impl Default for SlurmParams {
    fn default() -> Self {
        Self {
            job_name: default_job_name(),
            partition: default_partition(),
            time: default_time(),
            mem: default_mem(),
            cpus_per_task: default_cpus_per_task(),
            array_parallelism: default_array_parallelism(),
            log_dir: default_slurm_log_dir(),
            poll_interval_seconds: default_poll_interval_seconds(),
            max_wait_seconds: default_max_wait_seconds(),
        }
    }
}

/// Remote object store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Regex removed from destination paths before they are appended to the
    /// base URL (the local mount prefix of the remote store)
    #[serde(default = "default_strip_prefix")]
    pub strip_prefix: String,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

impl RemoteConfig {
    fn validate(&self) -> Result<(), String> {
        regex::Regex::new(&self.strip_prefix)
            .map_err(|e| format!("Invalid remote.strip_prefix regex: {e}"))?;
        if self.request_timeout_seconds == 0 {
            return Err("remote.request_timeout_seconds must be > 0".to_string());
        }
        Ok(())
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            strip_prefix: default_strip_prefix(),
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }
}

/// Summary aggregation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    /// Build a summary after each cycle that processed at least one item
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// `chrono` format of the timestamp embedded in the summary name
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,

    /// Optional confidence classification column
    #[serde(default)]
    pub confidence: Option<ConfidenceConfig>,
}

impl SummaryConfig {
    fn validate(&self) -> Result<(), String> {
        if self.timestamp_format.trim().is_empty() {
            return Err("summary.timestamp_format cannot be empty".to_string());
        }
        if self.timestamp_format.contains('/') {
            return Err("summary.timestamp_format cannot contain '/'".to_string());
        }
        if let Some(confidence) = &self.confidence {
            confidence.validate()?;
        }
        Ok(())
    }
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timestamp_format: default_timestamp_format(),
            confidence: None,
        }
    }
}

/// Confidence classification derived from a percent-match column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceConfig {
    /// Header of the percent-match column to read
    pub percent_column: String,

    /// Header of the appended column
    #[serde(default = "default_confidence_column")]
    pub output_column: String,

    /// Percent at or above which a row is `high`
    #[serde(default = "default_high_threshold")]
    pub high_threshold: f64,

    /// Percent at or above which a row is `medium`
    #[serde(default = "default_medium_threshold")]
    pub medium_threshold: f64,
}

impl ConfidenceConfig {
    fn validate(&self) -> Result<(), String> {
        if self.percent_column.trim().is_empty() {
            return Err("summary.confidence.percent_column cannot be empty".to_string());
        }
        if self.medium_threshold > self.high_threshold {
            return Err(
                "summary.confidence.medium_threshold must be <= high_threshold".to_string(),
            );
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local JSON file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }
        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty when local logging is enabled".to_string());
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

/// Accepts a number or a numeric string; anything else becomes the default
fn lenient_scan_interval<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawInterval {
        Number(f64),
        Text(String),
        Other(serde::de::IgnoredAny),
    }

    let parsed = match RawInterval::deserialize(deserializer)? {
        RawInterval::Number(n) => Some(n),
        RawInterval::Text(s) => s.trim().parse::<f64>().ok(),
        RawInterval::Other(_) => None,
    };

    Ok(parsed
        .filter(|n| n.is_finite() && *n >= 0.0)
        .unwrap_or(DEFAULT_SCAN_INTERVAL_SECONDS))
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_input_globs() -> Vec<String> {
    vec!["*.fa".to_string(), "*.fasta".to_string(), "*.fna".to_string()]
}

fn default_output_glob() -> String {
    "*.tsv".to_string()
}

fn default_scan_interval_seconds() -> f64 {
    DEFAULT_SCAN_INTERVAL_SECONDS
}

fn default_output_extension() -> String {
    "tsv".to_string()
}

fn default_input_link_name() -> String {
    "{sample}__input.fasta".to_string()
}

fn default_job_name() -> String {
    "provflow_batch".to_string()
}

fn default_partition() -> String {
    "prod".to_string()
}

fn default_time() -> String {
    "01:00:00".to_string()
}

fn default_mem() -> String {
    "4G".to_string()
}

fn default_cpus_per_task() -> u32 {
    1
}

fn default_array_parallelism() -> u32 {
    4
}

fn default_slurm_log_dir() -> PathBuf {
    PathBuf::from("slurm_logs")
}

fn default_poll_interval_seconds() -> u64 {
    10
}

fn default_max_wait_seconds() -> u64 {
    24 * 60 * 60
}

fn default_strip_prefix() -> String {
    "^.+/files/".to_string()
}

fn default_request_timeout_seconds() -> u64 {
    300
}

fn default_timestamp_format() -> String {
    "%Y-%m-%d_%H%M".to_string()
}

fn default_confidence_column() -> String {
    "confidence".to_string()
}

fn default_high_threshold() -> f64 {
    98.0
}

fn default_medium_threshold() -> f64 {
    90.0
}

fn default_local_path() -> String {
    "logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_json() -> serde_json::Value {
        serde_json::json!({
            "input_dir": "/data/in",
            "output_dir": "/data/out",
            "provenance_dir": "/data/prov",
            "work_dir": "/tmp/work",
            "tool": {
                "name": "genoflu",
                "command": "genoflu.py",
                "output_pattern": "{sample}*stats.tsv"
            }
        })
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config: PipelineConfig = serde_json::from_value(minimal_json()).unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.scan_interval_seconds, 300.0);
        assert_eq!(config.input_globs, vec!["*.fa", "*.fasta", "*.fna"]);
        assert_eq!(config.output_glob, "*.tsv");
        assert!(!config.use_nextcloud);
        assert!(!config.use_slurm);
        assert!(config.summary_dir.is_none());
        assert_eq!(config.tool.output_extension, "tsv");
        assert_eq!(config.tool.input_link_name, "{sample}__input.fasta");
    }

    #[test]
    fn test_rename_dir_alias() {
        let mut json = minimal_json();
        let obj = json.as_object_mut().unwrap();
        obj.remove("work_dir");
        obj.insert("rename_dir".to_string(), serde_json::json!("/tmp/rename"));

        let config: PipelineConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.work_dir, PathBuf::from("/tmp/rename"));
    }

    #[test]
    fn test_scan_interval_accepts_string() {
        let mut json = minimal_json();
        json["scan_interval_seconds"] = serde_json::json!("60");
        let config: PipelineConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.scan_interval_seconds, 60.0);
    }

    #[test]
    fn test_scan_interval_unparseable_falls_back() {
        let mut json = minimal_json();
        json["scan_interval_seconds"] = serde_json::json!("soon");
        let config: PipelineConfig = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(config.scan_interval_seconds, DEFAULT_SCAN_INTERVAL_SECONDS);

        json["scan_interval_seconds"] = serde_json::json!([1, 2]);
        let config: PipelineConfig = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(config.scan_interval_seconds, DEFAULT_SCAN_INTERVAL_SECONDS);

        json["scan_interval_seconds"] = serde_json::json!(-5);
        let config: PipelineConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.scan_interval_seconds, DEFAULT_SCAN_INTERVAL_SECONDS);
    }

    #[test]
    fn test_huge_scan_interval_falls_back_to_default() {
        let mut json = minimal_json();
        json["scan_interval_seconds"] = serde_json::json!(1e30);
        let config: PipelineConfig = serde_json::from_value(json).unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(
            config.scan_interval(),
            std::time::Duration::from_secs_f64(DEFAULT_SCAN_INTERVAL_SECONDS)
        );
    }

    #[test]
    fn test_summary_dir_inside_output_dir_rejected() {
        let mut json = minimal_json();
        json["summary_dir"] = serde_json::json!("/data/out");
        let config: PipelineConfig = serde_json::from_value(json.clone()).unwrap();
        assert!(config.validate().unwrap_err().contains("summary_dir"));

        json["summary_dir"] = serde_json::json!("/data/out/summary");
        let config: PipelineConfig = serde_json::from_value(json.clone()).unwrap();
        assert!(config.validate().is_err());

        json["summary_dir"] = serde_json::json!("/data/summary");
        let config: PipelineConfig = serde_json::from_value(json).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_glob_rejected() {
        let mut json = minimal_json();
        json["output_glob"] = serde_json::json!("[");
        let config: PipelineConfig = serde_json::from_value(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tool_name_with_delimiter_rejected() {
        let mut json = minimal_json();
        json["tool"]["name"] = serde_json::json!("geno__flu");
        let config: PipelineConfig = serde_json::from_value(json).unwrap();
        assert!(config.validate().unwrap_err().contains("tool.name"));
    }

    #[test]
    fn test_slurm_params_validation() {
        let mut params = SlurmParams::default();
        assert!(params.validate().is_ok());

        params.array_parallelism = 0;
        assert!(params.validate().is_err());

        params.array_parallelism = 4;
        params.max_wait_seconds = 1;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_slurm_params_only_validated_when_enabled() {
        let mut json = minimal_json();
        json["slurm_params"] = serde_json::json!({ "cpus_per_task": 0 });
        let mut config: PipelineConfig = serde_json::from_value(json).unwrap();
        assert!(config.validate().is_ok());

        config.use_slurm = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_confidence_thresholds_validated() {
        let mut summary = SummaryConfig::default();
        summary.confidence = Some(ConfidenceConfig {
            percent_column: "% match".to_string(),
            output_column: default_confidence_column(),
            high_threshold: 90.0,
            medium_threshold: 95.0,
        });
        assert!(summary.validate().is_err());
    }

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert!(!config.local_enabled);
        assert_eq!(config.local_rotation, "daily");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_values() {
        assert_eq!(default_log_level(), "info");
        assert_eq!(default_job_name(), "provflow_batch");
        assert_eq!(default_partition(), "prod");
        assert_eq!(default_time(), "01:00:00");
        assert_eq!(default_mem(), "4G");
        assert_eq!(default_cpus_per_task(), 1);
        assert_eq!(default_array_parallelism(), 4);
        assert_eq!(default_strip_prefix(), "^.+/files/");
    }
}
