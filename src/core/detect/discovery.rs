//! Input and output discovery
//!
//! Directories are listed one level deep and file names are matched against
//! `glob` patterns, so directory names containing glob metacharacters are
//! never interpreted as patterns.

use crate::config::PipelineConfig;
use crate::domain::{PipelineError, Result};
use glob::Pattern;
use std::path::{Path, PathBuf};

/// Files observed at the start of a cycle
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Files in the input directory matching an input glob
    pub inputs: Vec<PathBuf>,
    /// Files in the output directory matching the output glob
    pub outputs: Vec<PathBuf>,
}

/// Compile glob patterns
///
/// # Errors
///
/// Returns a `Configuration` error naming the first invalid pattern.
pub fn compile_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|p| {
            Pattern::new(p.as_ref()).map_err(|e| {
                PipelineError::Configuration(format!("Invalid glob pattern '{}': {e}", p.as_ref()))
            })
        })
        .collect()
}

/// List regular files directly inside `dir` whose name matches any pattern
///
/// Symlinks are followed. The result is sorted. A missing directory yields an
/// empty list.
///
/// # Errors
///
/// Returns an I/O error if the directory exists but cannot be read.
pub async fn list_matching(dir: &Path, patterns: &[Pattern]) -> Result<Vec<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(dir_path = %dir.display(), "Directory does not exist");
            return Ok(Vec::new());
        }
        Err(e) => return Err(PipelineError::Io(format!("{}: {e}", dir.display()))),
    };

    let mut matched = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !patterns.iter().any(|p| p.matches(&name)) {
            continue;
        }

        let path = entry.path();
        let is_file = tokio::fs::metadata(&path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if is_file {
            matched.push(path);
        }
    }

    matched.sort();
    Ok(matched)
}

/// Discover inputs and outputs for one cycle
///
/// # Errors
///
/// Returns an error if a pattern is invalid or a directory cannot be read.
pub async fn discover(config: &PipelineConfig) -> Result<Snapshot> {
    let input_patterns = compile_patterns(&config.input_globs)?;
    let output_patterns = compile_patterns(std::slice::from_ref(&config.output_glob))?;

    let inputs = list_matching(&config.input_dir, &input_patterns).await?;
    let outputs = list_matching(&config.output_dir, &output_patterns).await?;

    Ok(Snapshot { inputs, outputs })
}
