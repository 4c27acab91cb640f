//! Single-item processing: workspace, input transform, tool run, placement

pub mod processor;
pub mod transform;
pub mod workspace;

pub use processor::{ItemFailure, ItemOutcome, ItemProcessor};
pub use transform::{CopyTransform, InputTransform};
pub use workspace::Workspace;
