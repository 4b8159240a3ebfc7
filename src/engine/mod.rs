//! The analysis engine contract.
//!
//! The engine owns the real cache of parsed results. This crate only drives
//! it: invalidating paths when files change and requesting analyses whose
//! results get stamped with open-document versions.

pub mod file_cache;

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;
use thiserror::Error;

use crate::paths::WorkspacePath;

pub use file_cache::{FileCacheEngine, FileSummary, WorkspaceAnalysis};

/// A failure reported by the engine itself.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine task failed: {0}")]
    Task(String),

    #[error("{0}")]
    Failed(String),
}

/// Why cached paths could not be enumerated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IntrospectionError {
    #[error("cache introspection is not supported by this engine")]
    Unsupported,

    #[error("cache introspection failed: {0}")]
    Failed(String),
}

/// Best-effort enumeration of what the engine currently caches.
///
/// Only used to expand a directory deletion into the files below it. Callers
/// must treat every error as "nothing found".
pub trait CacheIntrospection: Send + Sync {
    /// Cached identifiers below `dir`. Implementations may over-report;
    /// callers filter by the `dir/` prefix again.
    fn cached_paths_under(
        &self,
        dir: &WorkspacePath,
    ) -> Result<Vec<WorkspacePath>, IntrospectionError>;
}

/// An engine whose cached results can be invalidated and re-analyzed.
///
/// Analyses are handed out as `Arc`s; the allocation identity of the `Arc` is
/// the identity of the analysis.
#[async_trait]
pub trait AnalysisEngine: Send + Sync + 'static {
    type Analysis: Send + Sync + 'static;

    /// Mark cached results for `paths` as stale.
    ///
    /// The invalidation is issued by the time this returns: an `analyze`
    /// started afterwards must not see the stale entries, even before the
    /// returned future has been polled. The future only reports when the
    /// engine has finished its follow-up work.
    fn invalidate(&self, paths: &[WorkspacePath]) -> BoxFuture<'static, Result<(), EngineError>>;

    async fn analyze(&self, files: &[WorkspacePath]) -> Result<Arc<Self::Analysis>, EngineError>;

    async fn analyze_workspace(&self) -> Result<Arc<Self::Analysis>, EngineError>;

    /// Optional view into the engine's cache. `None` means unsupported.
    fn introspection(&self) -> Option<&dyn CacheIntrospection> {
        None
    }
}
