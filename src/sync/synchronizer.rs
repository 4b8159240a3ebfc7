//! Keeps the engine's cache in step with file change batches.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::changeset::{build_change_set, convert_events};
use crate::config::SynchronizerConfig;
use crate::engine::AnalysisEngine;
use crate::error::{Result, SyncError};
use crate::paths::{PathConverter, RawFileEvent};

/// Fired once per non-empty batch: re-analyzing may now give different
/// results.
///
/// It carries no payload on purpose. A file of interest may depend on one
/// that changed, so consumers re-run `analyze` and let the engine's cache
/// decide what is actually new.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisChanged;

/// Consumes file change batches and drives engine invalidation.
pub struct Synchronizer<E: AnalysisEngine> {
    engine: Arc<E>,
    converter: Arc<dyn PathConverter>,
    changes: broadcast::Sender<AnalysisChanged>,
    cascade_deletes: bool,
}

impl<E: AnalysisEngine> Synchronizer<E> {
    pub fn new(
        engine: Arc<E>,
        converter: Arc<dyn PathConverter>,
        config: &SynchronizerConfig,
    ) -> Self {
        let (changes, _) = broadcast::channel(config.signal_capacity.max(1));
        Self {
            engine,
            converter,
            changes,
            cascade_deletes: config.cascade_deletes,
        }
    }

    /// Receive an [`AnalysisChanged`] for every batch handled from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<AnalysisChanged> {
        self.changes.subscribe()
    }

    /// Handle one batch of raw events.
    ///
    /// The invalidation is issued, then the change signal is sent, then the
    /// invalidation's outcome is awaited. A failed invalidation is returned
    /// as [`SyncError::Invalidation`]; the signal has already gone out by
    /// then and stays delivered. Batches whose events all fail conversion do
    /// nothing.
    pub async fn handle_batch(&self, events: &[RawFileEvent]) -> Result<()> {
        let converted = convert_events(self.converter.as_ref(), events);
        let introspection = if self.cascade_deletes {
            self.engine.introspection()
        } else {
            None
        };
        let Some(change_set) = build_change_set(&converted, introspection) else {
            return Ok(());
        };

        debug!(
            events = events.len(),
            paths = change_set.len(),
            "invalidating changed files"
        );
        let pending = self.engine.invalidate(change_set.paths());

        // No subscribers is fine.
        let _ = self.changes.send(AnalysisChanged);

        pending.await.map_err(SyncError::Invalidation)
    }

    /// Handle batches from `batches` strictly in order until the sender side
    /// is dropped.
    ///
    /// The loop is the observer of every batch: invalidation failures are
    /// reported here and the next batch proceeds. A panic in the engine or
    /// its cache introspection loses only the batch being handled.
    pub fn spawn(self: Arc<Self>, mut batches: mpsc::Receiver<Vec<RawFileEvent>>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("synchronizer started");
            while let Some(batch) = batches.recv().await {
                match AssertUnwindSafe(self.handle_batch(&batch)).catch_unwind().await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => warn!(error = %e, "batch invalidation failed"),
                    Err(_) => {
                        error!(events = batch.len(), "batch handling panicked, batch dropped")
                    }
                }
            }
            info!("synchronizer stopped");
        })
    }
}
