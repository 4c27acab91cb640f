//! Content fingerprints for drift detection
//!
//! A fingerprint is the hex-encoded SHA-256 digest of a file's bytes. It is
//! used only to notice that a file changed, not as an integrity guarantee.

use crate::domain::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use tokio::io::AsyncReadExt;

const CHUNK_SIZE: usize = 64 * 1024;

/// Hex-encoded SHA-256 digest of file content
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap an existing hex digest (as read back from a provenance record)
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// Hex digest string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprint a file by streaming it in fixed-size chunks
///
/// # Errors
///
/// Returns `PipelineError::MissingFile` when `path` does not exist and
/// `PipelineError::Io` for other read failures.
///
/// # Examples
///
/// ```no_run
/// use provflow::core::fingerprint::fingerprint;
///
/// # async fn example() -> provflow::domain::Result<()> {
/// let digest = fingerprint("/data/fasta/sampleA.fasta".as_ref()).await?;
/// assert_eq!(digest.as_str().len(), 64);
/// # Ok(())
/// # }
/// ```
pub async fn fingerprint(path: &Path) -> Result<Fingerprint> {
    let mut file = tokio::fs::File::open(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => PipelineError::MissingFile(path.to_path_buf()),
        _ => PipelineError::Io(format!("{}: {e}", path.display())),
    })?;

    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let read = file
            .read(&mut buf)
            .await
            .map_err(|e| PipelineError::Io(format!("{}: {e}", path.display())))?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }

    Ok(Fingerprint(format!("{:x}", hasher.finalize())))
}

/// Fingerprint a file, mapping a missing file to `None`
///
/// Change detection treats a missing file as a forced mismatch rather than a
/// failure. Other I/O errors are still returned.
pub async fn fingerprint_if_exists(path: &Path) -> Result<Option<Fingerprint>> {
    match fingerprint(path).await {
        Ok(fp) => Ok(Some(fp)),
        Err(PipelineError::MissingFile(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Fingerprint in-memory bytes
pub fn fingerprint_bytes(data: &[u8]) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(data);
    Fingerprint(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fingerprint_bytes_known_value() {
        assert_eq!(
            fingerprint_bytes(b"abc").as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(
            fingerprint_bytes(b"").as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[tokio::test]
    async fn test_fingerprint_matches_bytes_across_chunks() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("big.fasta");
        let data: Vec<u8> = (0..(CHUNK_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &data).unwrap();

        let streamed = fingerprint(&path).await.unwrap();
        assert_eq!(streamed, fingerprint_bytes(&data));
        assert_eq!(streamed, fingerprint(&path).await.unwrap());
    }

    #[tokio::test]
    async fn test_fingerprint_changes_with_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("s.fasta");
        std::fs::write(&path, ">s\nACGT\n").unwrap();
        let before = fingerprint(&path).await.unwrap();

        std::fs::write(&path, ">s\nACGA\n").unwrap();
        let after = fingerprint(&path).await.unwrap();
        assert_ne!(before, after);
    }

    #[tokio::test]
    async fn test_fingerprint_missing_file() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("missing.fasta");

        let err = fingerprint(&missing).await.unwrap_err();
        assert!(matches!(err, PipelineError::MissingFile(_)));
        assert!(fingerprint_if_exists(&missing).await.unwrap().is_none());
    }
}
