//! File watcher — turns debounced filesystem notifications into batches of
//! change events for the synchronizer.
//!
//! Uses notify-debouncer-mini so that bursts (editor saves, `git checkout`)
//! arrive as one batch. Removing a directory usually produces a single event
//! for the directory itself; the synchronizer expands it.

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, DebouncedEvent, Debouncer};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::WatchConfig;
use crate::error::Result;
use crate::paths::{in_ignored_dir, FileChangeKind, RawFileEvent};

/// Keeps the underlying watcher alive. Watching stops when dropped.
pub struct WatchHandle {
    _debouncer: Debouncer<RecommendedWatcher>,
}

/// Watch `root` recursively, sending each non-empty batch to `batches`.
pub fn start_watching(
    root: &Path,
    config: &WatchConfig,
    batches: mpsc::Sender<Vec<RawFileEvent>>,
) -> Result<WatchHandle> {
    let watch_root = root.to_path_buf();
    let ignore_dirs = config.ignore_dirs.clone();

    let mut debouncer = new_debouncer(
        Duration::from_millis(config.debounce_ms),
        move |result: DebounceEventResult| match result {
            Ok(events) => {
                let batch = to_batch(&watch_root, &ignore_dirs, events);
                if batch.is_empty() {
                    return;
                }
                debug!(count = batch.len(), "file change batch");
                if batches.blocking_send(batch).is_err() {
                    debug!("synchronizer gone, dropping batch");
                }
            }
            Err(e) => warn!(error = %e, "watch error"),
        },
    )?;
    debouncer.watcher().watch(root, RecursiveMode::Recursive)?;

    info!(root = %root.display(), debounce_ms = config.debounce_ms, "watching for file changes");
    Ok(WatchHandle {
        _debouncer: debouncer,
    })
}

/// Build a batch from debounced events.
///
/// The debouncer does not say what happened to a path, so a path that no
/// longer exists is reported as deleted and anything else as changed.
fn to_batch(root: &Path, ignore_dirs: &[String], events: Vec<DebouncedEvent>) -> Vec<RawFileEvent> {
    let mut seen = HashSet::new();
    events
        .into_iter()
        .map(|event| event.path)
        .filter(|path| !is_ignored(root, ignore_dirs, path))
        .filter(|path| seen.insert(path.clone()))
        .map(|path| {
            let kind = if path.exists() {
                FileChangeKind::Changed
            } else {
                FileChangeKind::Deleted
            };
            RawFileEvent { path, kind }
        })
        .collect()
}

fn is_ignored(root: &Path, ignore_dirs: &[String], path: &Path) -> bool {
    in_ignored_dir(path.strip_prefix(root).unwrap_or(path), ignore_dirs)
}
