//! Canonical workspace paths and the raw change events they are derived from.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// The kind of change a watcher reported for a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileChangeKind {
    Created,
    Changed,
    Deleted,
}

impl fmt::Display for FileChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileChangeKind::Created => write!(f, "created"),
            FileChangeKind::Changed => write!(f, "changed"),
            FileChangeKind::Deleted => write!(f, "deleted"),
        }
    }
}

/// A change event as delivered by the file watcher, before conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFileEvent {
    pub path: PathBuf,
    pub kind: FileChangeKind,
}

impl RawFileEvent {
    pub fn new(path: impl Into<PathBuf>, kind: FileChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Normalized identifier of a workspace file, independent of how the raw
/// event encoded it. Segments are always joined with `/`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspacePath(String);

impl WorkspacePath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when `self` lives strictly below the directory `dir`, i.e. it
    /// starts with `dir/`. A path is never inside itself.
    pub fn is_inside(&self, dir: &WorkspacePath) -> bool {
        let prefix = dir.0.trim_end_matches('/');
        self.0
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/') && rest.len() > 1)
    }
}

impl fmt::Display for WorkspacePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkspacePath {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for WorkspacePath {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Maps a raw watcher event onto the identifier the analysis engine uses.
///
/// Must be deterministic and side-effect free. Returning `None` drops the
/// event from its batch.
pub trait PathConverter: Send + Sync {
    fn to_workspace_path(&self, event: &RawFileEvent) -> Option<WorkspacePath>;
}

impl<F> PathConverter for F
where
    F: Fn(&RawFileEvent) -> Option<WorkspacePath> + Send + Sync,
{
    fn to_workspace_path(&self, event: &RawFileEvent) -> Option<WorkspacePath> {
        self(event)
    }
}

/// Converts absolute paths under a workspace root into root-relative,
/// `/`-separated identifiers.
#[derive(Debug, Clone)]
pub struct WorkspacePathConverter {
    root: PathBuf,
}

impl WorkspacePathConverter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a workspace identifier back to a filesystem path.
    pub fn to_fs_path(&self, path: &WorkspacePath) -> PathBuf {
        path.as_str()
            .split('/')
            .filter(|s| !s.is_empty())
            .fold(self.root.clone(), |acc, seg| acc.join(seg))
    }

    /// Convert a filesystem path. Paths outside the root, paths that climb
    /// out with `..`, and non UTF-8 paths have no identifier.
    pub fn convert_path(&self, path: &Path) -> Option<WorkspacePath> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let mut segments = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(seg) => segments.push(seg.to_str()?),
                Component::CurDir => {}
                _ => return None,
            }
        }
        if segments.is_empty() {
            return None;
        }
        Some(WorkspacePath(segments.join("/")))
    }

    /// Convert a user-supplied path. Relative paths are taken from the root,
    /// so `src/lib.rs`, `./src/lib.rs` and `<root>/src/lib.rs` agree.
    pub fn resolve(&self, path: impl AsRef<Path>) -> Option<WorkspacePath> {
        let path = path.as_ref();
        if path.is_absolute() {
            self.convert_path(path)
        } else {
            self.convert_path(&self.root.join(path))
        }
    }
}

/// True when any directory component of `relative` is one of `ignore_dirs`.
pub fn in_ignored_dir(relative: &Path, ignore_dirs: &[String]) -> bool {
    relative.components().any(|c| match c {
        Component::Normal(name) => ignore_dirs.iter().any(|d| name == d.as_str()),
        _ => false,
    })
}

impl PathConverter for WorkspacePathConverter {
    fn to_workspace_path(&self, event: &RawFileEvent) -> Option<WorkspacePath> {
        self.convert_path(&event.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_inside_requires_separator() {
        let dir = WorkspacePath::from("/dir");
        assert!(WorkspacePath::from("/dir/x").is_inside(&dir));
        assert!(WorkspacePath::from("/dir/sub/y").is_inside(&dir));
        assert!(!WorkspacePath::from("/directory/x").is_inside(&dir));
        assert!(!WorkspacePath::from("/dir").is_inside(&dir));
        assert!(!WorkspacePath::from("/other").is_inside(&dir));
    }

    #[test]
    fn test_is_inside_tolerates_trailing_slash() {
        let dir = WorkspacePath::from("src/");
        assert!(WorkspacePath::from("src/lib.rs").is_inside(&dir));
        assert!(!WorkspacePath::from("src/").is_inside(&dir));
    }

    #[test]
    fn test_converter_relative_identifiers() {
        let converter = WorkspacePathConverter::new("/work/project");
        let event = RawFileEvent::new("/work/project/src/main.rs", FileChangeKind::Changed);
        assert_eq!(
            converter.to_workspace_path(&event),
            Some(WorkspacePath::from("src/main.rs"))
        );
    }

    #[test]
    fn test_converter_rejects_outside_root() {
        let converter = WorkspacePathConverter::new("/work/project");
        let outside = RawFileEvent::new("/etc/passwd", FileChangeKind::Changed);
        assert_eq!(converter.to_workspace_path(&outside), None);

        let root_itself = RawFileEvent::new("/work/project", FileChangeKind::Deleted);
        assert_eq!(converter.to_workspace_path(&root_itself), None);

        let climbing = RawFileEvent::new("/work/project/../secret", FileChangeKind::Changed);
        assert_eq!(converter.to_workspace_path(&climbing), None);
    }

    #[test]
    fn test_fs_path_round_trip() {
        let converter = WorkspacePathConverter::new("/work/project");
        let fs_path = converter.to_fs_path(&WorkspacePath::from("a/b.txt"));
        assert_eq!(fs_path, PathBuf::from("/work/project/a/b.txt"));
        assert_eq!(
            converter.convert_path(&fs_path),
            Some(WorkspacePath::from("a/b.txt"))
        );
    }

    #[test]
    fn test_resolve_user_paths() {
        let converter = WorkspacePathConverter::new("/work/project");
        let expected = Some(WorkspacePath::from("src/lib.rs"));
        assert_eq!(converter.resolve("src/lib.rs"), expected);
        assert_eq!(converter.resolve("./src/lib.rs"), expected);
        assert_eq!(converter.resolve("/work/project/src/lib.rs"), expected);
        assert_eq!(converter.resolve("../elsewhere/lib.rs"), None);
        assert_eq!(converter.resolve("/etc/hosts"), None);
        assert_eq!(converter.resolve("."), None);
    }

    #[test]
    fn test_ignored_dir_matches_whole_components() {
        let ignore = vec!["target".to_string(), "node_modules".to_string()];
        assert!(in_ignored_dir(Path::new("target/debug/app"), &ignore));
        assert!(in_ignored_dir(Path::new("web/node_modules/a.js"), &ignore));
        assert!(!in_ignored_dir(Path::new("targets/a.rs"), &ignore));
        assert!(!in_ignored_dir(Path::new("src/lib.rs"), &ignore));
    }

    #[test]
    fn test_closure_converter() {
        let converter = |event: &RawFileEvent| {
            event
                .path
                .to_str()
                .filter(|p| !p.contains("skip"))
                .map(WorkspacePath::from)
        };
        let kept = RawFileEvent::new("/a", FileChangeKind::Created);
        let dropped = RawFileEvent::new("/skip/me", FileChangeKind::Created);
        assert_eq!(converter.to_workspace_path(&kept), Some("/a".into()));
        assert_eq!(converter.to_workspace_path(&dropped), None);
    }
}
