//! Open-document state, as seen by the editing session.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// A document currently open in the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenDocument {
    /// Stable identifier (an LSP document URI in practice).
    pub uri: String,
    /// Version counter; increases with every edit.
    pub version: i32,
}

/// Read access to the set of open documents.
///
/// Queried synchronously at the instant an analysis completes.
pub trait DocumentStore: Send + Sync {
    fn open_documents(&self) -> Vec<OpenDocument>;
}

/// A simple document store kept in memory.
///
/// Used by the CLI, where no editor is attached, and by tests that need to
/// simulate edits racing with in-flight analyses.
#[derive(Debug, Default)]
pub struct InMemoryDocuments {
    docs: RwLock<HashMap<String, i32>>,
}

impl InMemoryDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a document at the given version, replacing any previous state.
    pub fn open(&self, uri: impl Into<String>, version: i32) {
        self.docs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(uri.into(), version);
    }

    /// Record an edit. Returns the new version, or `None` if the document is
    /// not open.
    pub fn edit(&self, uri: &str) -> Option<i32> {
        let mut docs = self.docs.write().unwrap_or_else(PoisonError::into_inner);
        let version = docs.get_mut(uri)?;
        *version += 1;
        Some(*version)
    }

    pub fn close(&self, uri: &str) -> bool {
        self.docs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(uri)
            .is_some()
    }

    pub fn version(&self, uri: &str) -> Option<i32> {
        self.docs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(uri)
            .copied()
    }
}

impl DocumentStore for InMemoryDocuments {
    fn open_documents(&self) -> Vec<OpenDocument> {
        self.docs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(uri, &version)| OpenDocument {
                uri: uri.clone(),
                version,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_edit_close() {
        let docs = InMemoryDocuments::new();
        docs.open("/a", 1);
        assert_eq!(docs.edit("/a"), Some(2));
        assert_eq!(docs.edit("/a"), Some(3));
        assert_eq!(docs.version("/a"), Some(3));

        assert!(docs.close("/a"));
        assert!(!docs.close("/a"));
        assert_eq!(docs.edit("/a"), None);
        assert!(docs.open_documents().is_empty());
    }

    #[test]
    fn test_open_documents_lists_all() {
        let docs = InMemoryDocuments::new();
        docs.open("/a", 1);
        docs.open("/b", 7);

        let mut open = docs.open_documents();
        open.sort_by(|x, y| x.uri.cmp(&y.uri));
        assert_eq!(
            open,
            vec![
                OpenDocument {
                    uri: "/a".to_string(),
                    version: 1
                },
                OpenDocument {
                    uri: "/b".to_string(),
                    version: 7
                },
            ]
        );
    }
}
