//! Configuration loader with environment variable substitution and overrides
//!
//! The configuration file is re-read at the start of every cycle. A reload
//! that fails keeps the last configuration that loaded successfully.

use super::schema::PipelineConfig;
use crate::domain::errors::PipelineError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// Loads configuration from a JSON (or `.toml`) file
///
/// This function:
/// 1. Reads the file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses JSON, or TOML when the extension is `.toml`
/// 4. Applies environment variable overrides (PROVFLOW_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns a `Configuration` error if the file is missing, unreadable,
/// malformed, references unset variables, or fails validation.
///
/// # Examples
///
/// ```no_run
/// use provflow::config::loader::load_config;
///
/// let config = load_config("provflow.json").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<PipelineConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(PipelineError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        PipelineError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    let mut config: PipelineConfig = if is_toml {
        toml::from_str(&contents)
            .map_err(|e| PipelineError::Configuration(format!("Failed to parse TOML: {e}")))?
    } else {
        serde_json::from_str(&contents)
            .map_err(|e| PipelineError::Configuration(format!("Failed to parse JSON: {e}")))?
    };

    apply_env_overrides(&mut config);

    config.validate().map_err(|e| {
        PipelineError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    tracing::debug!(config_file = %path.display(), "config_loaded");

    Ok(config)
}

/// Holds the last configuration that loaded successfully
///
/// Each call to [`ConfigReloader::reload`] re-reads the file. On failure the
/// previous configuration is returned and the error is logged; only a first
/// load that fails surfaces the error to the caller.
#[derive(Debug)]
pub struct ConfigReloader {
    path: PathBuf,
    last_good: Option<PipelineConfig>,
}

impl ConfigReloader {
    /// Create a reloader for a config file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_good: None,
        }
    }

    /// Path of the configuration file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the configuration file
    ///
    /// # Errors
    ///
    /// Returns the load error only if no configuration was ever loaded.
    pub fn reload(&mut self) -> Result<PipelineConfig> {
        match load_config(&self.path) {
            Ok(config) => {
                tracing::info!(config_file = %self.path.display(), "config_loaded");
                self.last_good = Some(config.clone());
                Ok(config)
            }
            Err(e) => match &self.last_good {
                Some(previous) => {
                    tracing::error!(
                        config_file = %self.path.display(),
                        error = %e,
                        "load_config_failed, continuing with last valid configuration"
                    );
                    Ok(previous.clone())
                }
                None => Err(e),
            },
        }
    }
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// # Errors
///
/// Returns an error if a referenced environment variable is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| PipelineError::Configuration(e.to_string()))?;
    let mut missing_vars = Vec::new();

    let result = re.replace_all(input, |cap: &regex::Captures<'_>| {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(value) => value,
            Err(_) => {
                if !missing_vars.contains(&var_name.to_string()) {
                    missing_vars.push(var_name.to_string());
                }
                String::new()
            }
        }
    });

    if !missing_vars.is_empty() {
        return Err(PipelineError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result.into_owned())
}

/// Applies environment variable overrides using PROVFLOW_* prefix
///
/// For example: PROVFLOW_INPUT_DIR, PROVFLOW_USE_SLURM
fn apply_env_overrides(config: &mut PipelineConfig) {
    if let Ok(val) = std::env::var("PROVFLOW_INPUT_DIR") {
        config.input_dir = val.into();
    }
    if let Ok(val) = std::env::var("PROVFLOW_OUTPUT_DIR") {
        config.output_dir = val.into();
    }
    if let Ok(val) = std::env::var("PROVFLOW_PROVENANCE_DIR") {
        config.provenance_dir = val.into();
    }
    if let Ok(val) = std::env::var("PROVFLOW_WORK_DIR") {
        config.work_dir = val.into();
    }
    if let Ok(val) = std::env::var("PROVFLOW_SUMMARY_DIR") {
        config.summary_dir = Some(val.into());
    }
    if let Ok(val) = std::env::var("PROVFLOW_SCAN_INTERVAL_SECONDS") {
        if let Ok(interval) = val.parse::<f64>() {
            if interval.is_finite() && interval >= 0.0 {
                config.scan_interval_seconds = interval;
            }
        }
    }
    if let Ok(val) = std::env::var("PROVFLOW_USE_NEXTCLOUD") {
        config.use_nextcloud = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("PROVFLOW_USE_SLURM") {
        config.use_slurm = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("PROVFLOW_LOG_LEVEL") {
        config.log_level = val;
    }
    if let Ok(val) = std::env::var("PROVFLOW_SLURM_PARTITION") {
        config.slurm_params.partition = val;
    }
    if let Ok(val) = std::env::var("PROVFLOW_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("PROVFLOW_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
}
