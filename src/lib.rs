//! # analysis-sync
//!
//! Keeps an analysis engine's cached results consistent with a live editing
//! session, and remembers which open-document versions each analysis
//! reflects.
//!
//! ## Pieces
//!
//! - **Synchronizer**: consumes file change batches, invalidates the engine's
//!   cache (expanding directory deletions into the cached files below them),
//!   and emits an [`AnalysisChanged`] signal per batch
//! - **VersionTracker**: wraps `analyze` so every analysis handed out can
//!   report the document versions in effect when it completed
//! - **Watcher**: debounced filesystem notifications feeding the synchronizer
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use analysis_sync::{
//!     FileCacheEngine, InMemoryDocuments, SyncConfig, Synchronizer, VersionTracker,
//!     WorkspacePathConverter,
//! };
//! use std::sync::Arc;
//!
//! # async fn run() -> analysis_sync::Result<()> {
//! let root = std::path::Path::new(".");
//! let config = SyncConfig::load_for_root(root);
//! let engine = Arc::new(FileCacheEngine::new(root));
//! let docs = Arc::new(InMemoryDocuments::new());
//!
//! let sync = Arc::new(Synchronizer::new(
//!     Arc::clone(&engine),
//!     Arc::new(WorkspacePathConverter::new(root)),
//!     &config.sync,
//! ));
//! let tracker = VersionTracker::new(engine, docs);
//!
//! let (tx, rx) = tokio::sync::mpsc::channel(config.sync.batch_queue);
//! let _watch = analysis_sync::watcher::start_watching(root, &config.watch, tx)?;
//! let _task = Arc::clone(&sync).spawn(rx);
//!
//! let mut changes = sync.subscribe();
//! while changes.recv().await.is_ok() {
//!     let analysis = tracker.analyze_workspace().await?;
//!     let versions = tracker.versions_at(&analysis)?;
//!     println!("{} files at {:?}", analysis.files.len(), versions);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod documents;
pub mod engine;
pub mod error;
pub mod paths;
pub mod sync;
pub mod versions;
pub mod watcher;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience
pub use config::SyncConfig;
pub use documents::{DocumentStore, InMemoryDocuments, OpenDocument};
pub use engine::{
    AnalysisEngine, CacheIntrospection, EngineError, FileCacheEngine, IntrospectionError,
    WorkspaceAnalysis,
};
pub use error::{Result, SyncError};
pub use paths::{FileChangeKind, PathConverter, RawFileEvent, WorkspacePath, WorkspacePathConverter};
pub use sync::{AnalysisChanged, ChangeSet, Synchronizer};
pub use versions::{AnalysisVersionIndex, VersionSnapshot, VersionTracker};
