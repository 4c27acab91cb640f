//! External system integrations for provflow.
//!
//! This module provides adapters for the collaborators the pipeline talks to:
//!
//! - [`storage`] - durable writes to the local filesystem or a remote
//!   WebDAV-style object store
//! - [`tool`] - the external analysis executable
//! - [`scheduler`] - the batch scheduler used for array execution
//!
//! # Design Pattern
//!
//! Adapters follow the **Adapter Pattern** to isolate external dependencies and
//! enable testing with mock implementations. Storage and scheduling are
//! trait-based and injected as `Arc<dyn Trait>`.
//!
//! # Storage
//!
//! ```rust,no_run
//! use provflow::adapters::storage::create_storage_backend;
//! use provflow::config::load_config;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("provflow.json")?;
//! let storage = create_storage_backend(&config)?;
//! storage.ensure_directory(&config.output_dir).await?;
//! # Ok(())
//! # }
//! ```

pub mod scheduler;
pub mod storage;
pub mod tool;
