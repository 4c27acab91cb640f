//! Configuration management for provflow.
//!
//! # Overview
//!
//! provflow reads a JSON configuration file (TOML is accepted when the file
//! ends in `.toml`) with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `PROVFLOW_*` environment overrides
//! - Default values for optional settings
//! - Validation on every load
//!
//! The polling loop reloads the file once per cycle through
//! [`ConfigReloader`], which keeps the last valid configuration when a reload
//! is malformed.
//!
//! # Example Configuration
//!
//! ```json
//! {
//!   "input_dir": "/data/fasta",
//!   "output_dir": "/data/results/genoflu",
//!   "provenance_dir": "/data/results/genoflu/provenance",
//!   "work_dir": "/scratch/genoflu",
//!   "summary_dir": "/data/results/summary",
//!   "scan_interval_seconds": 300,
//!   "use_nextcloud": false,
//!   "use_slurm": true,
//!   "slurm_params": { "partition": "prod", "array_parallelism": 8 },
//!   "tool": {
//!     "name": "genoflu",
//!     "command": "genoflu.py",
//!     "args": ["-f", "{input}", "-n", "{sample}"],
//!     "output_pattern": "{sample}*stats.tsv"
//!   }
//! }
//! ```
//!
//! Remote store credentials are never read from this file; see
//! [`crate::adapters::storage::remote::RemoteCredentials`].

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, ConfigReloader};
pub use schema::{
    ConfidenceConfig, LoggingConfig, PipelineConfig, RemoteConfig, SlurmParams, SummaryConfig,
    ToolConfig,
};
pub use secret::{secret_string, SecretString, SecretValue};
