// provflow - Incremental, provenance-tracked batch runner
// Copyright (c) 2025 Provflow Contributors
// Licensed under the MIT License

//! # provflow - Incremental, provenance-tracked batch runner
//!
//! provflow watches an input directory, runs an external analysis tool on
//! every new or changed input file, and records a provenance record proving
//! that each file was processed. Anything already done is skipped; anything
//! whose input or output bytes changed since is processed again.
//!
//! ## Architecture
//!
//! provflow follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and the polling loop
//! - [`core`] - Change detection, item processing, batch execution, summaries
//! - [`adapters`] - Storage backends, the scheduler and the external tool
//! - [`domain`] - Sample naming contract and error types
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use provflow::config::load_config;
//! use provflow::core::pipeline::Pipeline;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("provflow.json")?;
//!     let pipeline = Pipeline::new(config, Path::new("provflow.json"))?;
//!
//!     let report = pipeline.run_cycle().await?;
//!     println!("{} item(s) needed processing", report.work_set);
//!     Ok(())
//! }
//! ```
//!
//! ## Change Detection
//!
//! A sample is up to date only when its input, its output and its provenance
//! record all exist and both recorded fingerprints still match the files:
//!
//! ```rust,no_run
//! use provflow::core::detect::{discover, reconcile};
//! use provflow::core::state::ProvenanceLedger;
//! use provflow::adapters::storage::LocalBackend;
//! use std::sync::Arc;
//!
//! # async fn example(config: provflow::config::PipelineConfig) -> provflow::domain::Result<()> {
//! let ledger = ProvenanceLedger::new(
//!     config.provenance_dir.clone(),
//!     config.tool.name.clone(),
//!     Arc::new(LocalBackend::new()),
//! );
//! let snapshot = discover(&config).await?;
//! let work_set = reconcile(&snapshot.inputs, &snapshot.outputs, &ledger).await?;
//! for item in work_set.items() {
//!     println!("{}: {}", item.sample, item.reason);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Library operations return [`domain::Result`] with [`domain::PipelineError`].
//! Failures of a single item never escape the item processor; they are logged
//! and reported per item.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
