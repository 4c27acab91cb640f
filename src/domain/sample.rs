//! Sample naming contract
//!
//! A sample is identified by a name derived from its file name. The same rule
//! is applied to inputs and outputs so that both sides of a reconciliation pair
//! up:
//!
//! - input files: everything before the first `.` of the basename
//!   (`sampleA.consensus.fasta` -> `sampleA`)
//! - output files: everything before the first [`OUTPUT_DELIMITER`] of the
//!   basename (`sampleA__genoflu.tsv` -> `sampleA`)
//!
//! Outputs are always written as `<sample>__<tool>.<ext>` by
//! [`output_file_name`], which keeps the two derivations consistent.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Separator between the sample name and the tool suffix in output and
/// provenance file names
pub const OUTPUT_DELIMITER: &str = "__";

/// Suffix appended to provenance record file names after the tool name
pub const PROVENANCE_SUFFIX: &str = "_complete.json";

/// Sample name newtype wrapper
///
/// # Examples
///
/// ```
/// use provflow::domain::sample::SampleName;
/// use std::str::FromStr;
///
/// let name = SampleName::from_str("sampleA").unwrap();
/// assert_eq!(name.as_str(), "sampleA");
/// assert!(SampleName::from_str("").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SampleName(String);

impl SampleName {
    /// Creates a new SampleName
    ///
    /// Rejects empty names and names containing path separators.
    pub fn new(name: impl Into<String>) -> Result<Self, String> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err("Sample name cannot be empty".to_string());
        }
        if name.contains('/') || name.contains('\\') {
            return Err(format!("Sample name cannot contain path separators: {name}"));
        }
        Ok(Self(name))
    }

    /// Returns the sample name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SampleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SampleName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for SampleName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn basename(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

/// Derive the sample name of an input file
///
/// Returns `None` when the basename is not valid UTF-8 or yields an empty name
/// (for example a dotfile such as `.fasta`).
pub fn input_name(path: impl AsRef<Path>) -> Option<SampleName> {
    let base = basename(path.as_ref())?;
    let stem = base.split('.').next().unwrap_or(base);
    SampleName::new(stem).ok()
}

/// Derive the sample name of an output file
pub fn output_name(path: impl AsRef<Path>) -> Option<SampleName> {
    let base = basename(path.as_ref())?;
    let stem = base.split(OUTPUT_DELIMITER).next().unwrap_or(base);
    SampleName::new(stem).ok()
}

/// File name of the final output artifact for a sample
///
/// `extension` is given without the leading dot.
pub fn output_file_name(sample: &SampleName, tool_name: &str, extension: &str) -> String {
    format!("{sample}{OUTPUT_DELIMITER}{tool_name}.{extension}")
}

/// File name of the provenance record for a sample
pub fn provenance_file_name(sample: &SampleName, tool_name: &str) -> String {
    format!("{sample}{OUTPUT_DELIMITER}{tool_name}{PROVENANCE_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("/in/sampleA.fasta", "sampleA" ; "simple fasta")]
    #[test_case("/in/sampleA.consensus.fasta", "sampleA" ; "multiple dots")]
    #[test_case("sample_B-1.fa", "sample_B-1" ; "underscores kept")]
    #[test_case("noext", "noext" ; "no extension")]
    fn test_input_name(path: &str, expected: &str) {
        assert_eq!(input_name(path).unwrap().as_str(), expected);
    }

    #[test_case("/out/sampleA__genoflu.tsv", "sampleA" ; "tool suffix")]
    #[test_case("/out/sample_B__flumut.tsv", "sample_B" ; "single underscore kept")]
    #[test_case("/out/s1__a__b.tsv", "s1" ; "first delimiter wins")]
    fn test_output_name(path: &str, expected: &str) {
        assert_eq!(output_name(path).unwrap().as_str(), expected);
    }

    #[test]
    fn test_empty_names_rejected() {
        assert!(input_name("/in/.fasta").is_none());
        assert!(output_name("/out/__genoflu.tsv").is_none());
    }

    #[test]
    fn test_input_and_output_agree() {
        let sample = input_name("/in/sampleA.consensus.fasta").unwrap();
        let out = output_file_name(&sample, "genoflu", "tsv");
        assert_eq!(out, "sampleA__genoflu.tsv");
        assert_eq!(output_name(&out).unwrap(), sample);
    }

    #[test]
    fn test_provenance_file_name() {
        let sample = SampleName::new("sampleA").unwrap();
        assert_eq!(
            provenance_file_name(&sample, "genoflu"),
            "sampleA__genoflu_complete.json"
        );
    }

    #[test]
    fn test_sample_name_rejects_separators() {
        assert!(SampleName::new("a/b").is_err());
        assert!(SampleName::new("  ").is_err());
    }
}
