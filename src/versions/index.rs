//! Identity-keyed, non-owning association from analyses to version
//! snapshots.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use crate::documents::DocumentStore;

/// Open-document versions captured at one instant: uri -> version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct VersionSnapshot(BTreeMap<String, i32>);

impl VersionSnapshot {
    /// Read the current versions of every open document.
    pub fn capture(documents: &dyn DocumentStore) -> Self {
        documents
            .open_documents()
            .into_iter()
            .map(|doc| (doc.uri, doc.version))
            .collect()
    }

    pub fn get(&self, uri: &str) -> Option<i32> {
        self.0.get(uri).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> {
        self.0.iter().map(|(uri, &version)| (uri.as_str(), version))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, i32)> for VersionSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, i32)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

struct Entry<A> {
    analysis: Weak<A>,
    versions: Arc<VersionSnapshot>,
}

/// Maps an analysis, by `Arc` allocation identity, to the versions that were
/// current when it became valid.
///
/// Entries hold only a `Weak` to their analysis, so the index never keeps an
/// analysis alive. The `Weak` also pins the allocation's address, so a key
/// cannot be reused by a later analysis while its entry exists. Dead entries
/// are dropped on every insert and lookup, so at most the entries dead since
/// the last call stay allocated.
pub struct AnalysisVersionIndex<A> {
    entries: Mutex<HashMap<usize, Entry<A>>>,
}

impl<A> Default for AnalysisVersionIndex<A> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

fn identity<A>(analysis: &Arc<A>) -> usize {
    Arc::as_ptr(analysis) as *const () as usize
}

impl<A> AnalysisVersionIndex<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate `versions` with `analysis`, replacing any earlier entry.
    pub fn insert(&self, analysis: &Arc<A>, versions: VersionSnapshot) -> Arc<VersionSnapshot> {
        let versions = Arc::new(versions);
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, entry| entry.analysis.strong_count() > 0);
        entries.insert(
            identity(analysis),
            Entry {
                analysis: Arc::downgrade(analysis),
                versions: Arc::clone(&versions),
            },
        );
        versions
    }

    pub fn get(&self, analysis: &Arc<A>) -> Option<Arc<VersionSnapshot>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, entry| entry.analysis.strong_count() > 0);
        entries
            .get(&identity(analysis))
            .filter(|entry| std::ptr::eq(entry.analysis.as_ptr(), Arc::as_ptr(analysis)))
            .map(|entry| Arc::clone(&entry.versions))
    }

    /// Drop entries whose analysis is gone. Returns how many were removed.
    pub fn purge(&self) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| entry.analysis.strong_count() > 0);
        before - entries.len()
    }

    /// Entries currently held, including dead ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
