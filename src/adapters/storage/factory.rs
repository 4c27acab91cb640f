//! Storage backend factory
//!
//! The backend is selected once from configuration and shared by every
//! component that writes durable files.

use crate::adapters::storage::local::LocalBackend;
use crate::adapters::storage::remote::{RemoteBackend, RemoteCredentials};
use crate::adapters::storage::traits::StorageBackend;
use crate::config::PipelineConfig;
use crate::domain::Result;
use std::sync::Arc;

/// Create the storage backend selected by `use_nextcloud`
///
/// # Errors
///
/// Returns a `Configuration` error when the remote backend is selected and
/// its credentials are missing from the environment or invalid.
pub fn create_storage_backend(config: &PipelineConfig) -> Result<Arc<dyn StorageBackend>> {
    if config.use_nextcloud {
        tracing::info!("Creating remote storage backend");
        let credentials = RemoteCredentials::from_env()?;
        let backend = RemoteBackend::new(credentials, &config.remote)?;
        Ok(Arc::new(backend) as Arc<dyn StorageBackend>)
    } else {
        tracing::info!("Creating local storage backend");
        Ok(Arc::new(LocalBackend::new()) as Arc<dyn StorageBackend>)
    }
}
