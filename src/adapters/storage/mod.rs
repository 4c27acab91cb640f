//! Storage backends for durable writes
//!
//! - [`local`] - plain filesystem copy with atomic rename
//! - [`remote`] - WebDAV-style HTTP uploads (`PUT`/`MKCOL`)
//!
//! Use [`create_storage_backend`] to build the backend selected in
//! configuration.

pub mod factory;
pub mod local;
pub mod remote;
pub mod traits;

pub use factory::create_storage_backend;
pub use local::LocalBackend;
pub use remote::{RemoteBackend, RemoteCredentials};
pub use traits::{BackendKind, StorageBackend};
