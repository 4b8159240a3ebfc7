//! Version tracking for analyses.

pub mod index;
pub mod tracker;

pub use index::{AnalysisVersionIndex, VersionSnapshot};
pub use tracker::VersionTracker;
