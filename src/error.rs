//! Error types for the synchronizer and version tracker.

use std::path::PathBuf;
use thiserror::Error;

use crate::engine::EngineError;

/// Errors surfaced by this crate.
///
/// Cache introspection failures are deliberately absent: they are recovered
/// inside the synchronizer and never reach a caller.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The engine rejected an invalidation request. The change signal for the
    /// batch has already been delivered when this is returned.
    #[error("invalidation failed: {0}")]
    Invalidation(#[source] EngineError),

    /// The engine failed to produce an analysis. Nothing was stamped.
    #[error("analysis failed: {0}")]
    Analyze(#[source] EngineError),

    /// `versions_at` was asked about an analysis that was never stamped by the
    /// tracker. This is a caller bug, not a runtime condition.
    #[error("no version snapshot recorded for this analysis")]
    UnknownAnalysis,

    #[error("{} is not inside the workspace", .0.display())]
    OutsideWorkspace(PathBuf),

    #[error("file watcher error: {0}")]
    Watcher(#[from] notify::Error),
}

pub type Result<T> = std::result::Result<T, SyncError>;
