//! Local filesystem storage backend

use super::traits::{size_mb, BackendKind, StorageBackend};
use crate::domain::{Result, StorageError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Writes files directly to the local filesystem
///
/// Placement copies to a hidden temporary sibling of the destination and
/// renames it into place, so readers never observe a partially written file.
#[derive(Debug, Default, Clone)]
pub struct LocalBackend;

impl LocalBackend {
    /// Create a new local backend
    pub fn new() -> Self {
        Self
    }

    fn staging_path(dest: &Path) -> PathBuf {
        let name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        dest.with_file_name(format!(".{name}.{}.partial", uuid::Uuid::new_v4()))
    }
}

fn local_error(path: &Path, err: impl std::fmt::Display) -> StorageError {
    StorageError::Local {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    async fn ensure_directory(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)
            .await
            .map_err(|e| local_error(path, e))?;
        tracing::debug!(dir_path = %path.display(), "Directory ready");
        Ok(())
    }

    async fn place(&self, source: &Path, dest: &Path) -> Result<()> {
        let metadata = match fs::metadata(source).await {
            Ok(m) if m.is_file() => m,
            _ => {
                tracing::error!(source_path = %source.display(), "Move failed, local file not found");
                return Err(StorageError::SourceNotFound(source.to_path_buf()).into());
            }
        };

        tracing::info!(
            file_size_mb = size_mb(metadata.len()),
            dest_path = %dest.display(),
            "Move started"
        );

        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| local_error(parent, e))?;
        }

        let staging = Self::staging_path(dest);
        if let Err(e) = fs::copy(source, &staging).await {
            let _ = fs::remove_file(&staging).await;
            return Err(local_error(dest, e).into());
        }
        if let Err(e) = fs::rename(&staging, dest).await {
            let _ = fs::remove_file(&staging).await;
            return Err(local_error(dest, e).into());
        }

        tracing::info!(dest_path = %dest.display(), "Move succeeded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PipelineError;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_ensure_directory_idempotent() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("a/b/c");
        let backend = LocalBackend::new();

        backend.ensure_directory(&dir).await.unwrap();
        backend.ensure_directory(&dir).await.unwrap();
        assert!(dir.is_dir());
    }

    #[tokio::test]
    async fn test_place_copies_and_leaves_source() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("src.tsv");
        let dest = tmp.path().join("out/nested/dest.tsv");
        std::fs::write(&source, b"header\nrow\n").unwrap();

        LocalBackend::new().place(&source, &dest).await.unwrap();

        assert!(source.exists());
        assert_eq!(std::fs::read(&dest).unwrap(), b"header\nrow\n");
        let leftovers: Vec<_> = std::fs::read_dir(dest.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".partial"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_place_overwrites_existing() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("src.tsv");
        let dest = tmp.path().join("dest.tsv");
        std::fs::write(&dest, b"old").unwrap();
        std::fs::write(&source, b"new").unwrap();

        LocalBackend::new().place(&source, &dest).await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_place_missing_source() {
        let tmp = TempDir::new().unwrap();
        let err = LocalBackend::new()
            .place(&tmp.path().join("missing"), &tmp.path().join("dest"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Storage(StorageError::SourceNotFound(_))
        ));
    }
}
