//! Analyses stamped with the open-document versions they correspond to.

use std::sync::Arc;
use tracing::debug;

use super::index::{AnalysisVersionIndex, VersionSnapshot};
use crate::documents::DocumentStore;
use crate::engine::AnalysisEngine;
use crate::error::{Result, SyncError};
use crate::paths::WorkspacePath;

/// Wraps an engine's analyze operations so that every analysis it hands out
/// can later report which document versions it reflects.
///
/// The versions are read when the engine's result arrives, not when the
/// request is made: edits made while an analysis is in flight are already
/// part of what the engine saw once it finishes. This is what makes edits
/// computed from an analysis safe to apply against those versions.
pub struct VersionTracker<E: AnalysisEngine> {
    engine: Arc<E>,
    documents: Arc<dyn DocumentStore>,
    index: AnalysisVersionIndex<E::Analysis>,
}

impl<E: AnalysisEngine> VersionTracker<E> {
    pub fn new(engine: Arc<E>, documents: Arc<dyn DocumentStore>) -> Self {
        Self {
            engine,
            documents,
            index: AnalysisVersionIndex::new(),
        }
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    pub fn index(&self) -> &AnalysisVersionIndex<E::Analysis> {
        &self.index
    }

    pub async fn analyze(&self, files: &[WorkspacePath]) -> Result<Arc<E::Analysis>> {
        let analysis = self
            .engine
            .analyze(files)
            .await
            .map_err(SyncError::Analyze)?;
        Ok(self.stamp(analysis))
    }

    pub async fn analyze_workspace(&self) -> Result<Arc<E::Analysis>> {
        let analysis = self
            .engine
            .analyze_workspace()
            .await
            .map_err(SyncError::Analyze)?;
        Ok(self.stamp(analysis))
    }

    /// Versions of all open documents at the moment `analysis` was produced.
    ///
    /// Fails with [`SyncError::UnknownAnalysis`] for an analysis that did not
    /// come from this tracker.
    pub fn versions_at(&self, analysis: &Arc<E::Analysis>) -> Result<Arc<VersionSnapshot>> {
        self.index.get(analysis).ok_or(SyncError::UnknownAnalysis)
    }

    fn stamp(&self, analysis: Arc<E::Analysis>) -> Arc<E::Analysis> {
        let versions = VersionSnapshot::capture(self.documents.as_ref());
        debug!(open_documents = versions.len(), "stamping analysis");
        self.index.insert(&analysis, versions);
        analysis
    }
}
