//! Invalidation sets for one batch of file change events.

use std::collections::BTreeSet;
use tracing::debug;

use crate::engine::{CacheIntrospection, IntrospectionError};
use crate::paths::{FileChangeKind, PathConverter, RawFileEvent, WorkspacePath};

/// A change event after path conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChangeEvent {
    pub path: WorkspacePath,
    pub kind: FileChangeKind,
}

/// The distinct paths to invalidate for one batch. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    paths: Vec<WorkspacePath>,
}

impl ChangeSet {
    pub fn paths(&self) -> &[WorkspacePath] {
        &self.paths
    }

    pub fn contains(&self, path: &WorkspacePath) -> bool {
        self.paths.binary_search(path).is_ok()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Convert a raw batch, dropping events the converter rejects.
pub fn convert_events(converter: &dyn PathConverter, events: &[RawFileEvent]) -> Vec<FileChangeEvent> {
    events
        .iter()
        .filter_map(|event| {
            let path = converter.to_workspace_path(event);
            if path.is_none() {
                debug!(path = %event.path.display(), "dropping unconvertible event");
            }
            path.map(|path| FileChangeEvent {
                path,
                kind: event.kind,
            })
        })
        .collect()
}

/// Build the invalidation set for a converted batch.
///
/// Returns `None` for an empty batch. When `introspection` is given, every
/// deleted path is expanded with the cached entries below it, since a
/// directory deletion does not come with events for its files.
pub fn build_change_set(
    events: &[FileChangeEvent],
    introspection: Option<&dyn CacheIntrospection>,
) -> Option<ChangeSet> {
    if events.is_empty() {
        return None;
    }

    let mut paths: BTreeSet<WorkspacePath> = events.iter().map(|e| e.path.clone()).collect();

    let deleted: Vec<&WorkspacePath> = events
        .iter()
        .filter(|e| e.kind == FileChangeKind::Deleted)
        .map(|e| &e.path)
        .collect();

    if !deleted.is_empty() {
        match introspection {
            Some(cache) => paths.extend(cascade_deletions(cache, &deleted)),
            None => debug!("engine cache not enumerable, skipping deletion cascade"),
        }
    }

    Some(ChangeSet {
        paths: paths.into_iter().collect(),
    })
}

/// Cached paths below any of the deleted paths.
///
/// Failures are swallowed per deleted path: a path that cannot be expanded
/// contributes nothing extra.
fn cascade_deletions(
    cache: &dyn CacheIntrospection,
    deleted: &[&WorkspacePath],
) -> Vec<WorkspacePath> {
    let mut found = Vec::new();
    for &dir in deleted {
        match cache.cached_paths_under(dir) {
            Ok(cached) => {
                let before = found.len();
                found.extend(cached.into_iter().filter(|p| p.is_inside(dir)));
                if found.len() > before {
                    debug!(dir = %dir, count = found.len() - before, "cascading deletion");
                }
            }
            Err(IntrospectionError::Unsupported) => {
                debug!("cache introspection unsupported, skipping deletion cascade");
                break;
            }
            Err(error) => {
                debug!(dir = %dir, %error, "cache introspection failed");
            }
        }
    }
    found
}
