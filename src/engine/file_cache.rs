//! A reference engine that caches per-file summaries of the workspace.
//!
//! Parsed entries and read failures are cached separately, the way a real
//! analyzer keeps both successful and failed documents, and both are visible
//! through cache introspection so directory deletions can be cascaded.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use ignore::WalkBuilder;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use tracing::debug;

use super::{AnalysisEngine, CacheIntrospection, EngineError, IntrospectionError};
use crate::config::WatchConfig;
use crate::paths::{in_ignored_dir, WorkspacePath, WorkspacePathConverter};

/// What the engine knows about a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    pub bytes: usize,
    pub lines: usize,
}

impl FileSummary {
    fn of(source: &str) -> Self {
        Self {
            bytes: source.len(),
            lines: source.lines().count(),
        }
    }
}

/// An immutable analysis result.
#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceAnalysis {
    pub files: BTreeMap<WorkspacePath, FileSummary>,
    pub failed: BTreeSet<WorkspacePath>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct CacheState {
    files: HashMap<WorkspacePath, FileSummary>,
    failed: HashSet<WorkspacePath>,
    /// Bumped on every invalidation. Loads that started under an older
    /// generation are not written back.
    generation: u64,
}

type Loaded = Vec<(WorkspacePath, Result<FileSummary, String>)>;

/// Engine backed by the files under a workspace root.
///
/// Files below an ignored directory are never cached: the watcher reports no
/// events for them, so a cached entry could never be invalidated.
pub struct FileCacheEngine {
    converter: WorkspacePathConverter,
    ignore_dirs: Arc<[String]>,
    state: Arc<RwLock<CacheState>>,
}

impl FileCacheEngine {
    /// Engine for `root` ignoring the default watcher directories.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_ignore_dirs(root, WatchConfig::default().ignore_dirs)
    }

    pub fn with_ignore_dirs(root: impl Into<PathBuf>, ignore_dirs: Vec<String>) -> Self {
        Self {
            converter: WorkspacePathConverter::new(root),
            ignore_dirs: ignore_dirs.into(),
            state: Arc::new(RwLock::new(CacheState::default())),
        }
    }

    /// Number of cached entries, failures included.
    pub fn cached_count(&self) -> usize {
        self.state
            .read()
            .map(|s| s.files.len() + s.failed.len())
            .unwrap_or(0)
    }

    pub fn is_cached(&self, path: &WorkspacePath) -> bool {
        self.state
            .read()
            .map(|s| s.files.contains_key(path) || s.failed.contains(path))
            .unwrap_or(false)
    }

    /// Analyze `files`, reading cache misses from disk.
    async fn collect(&self, files: Vec<WorkspacePath>) -> Result<WorkspaceAnalysis, EngineError> {
        let state = Arc::clone(&self.state);
        let converter = self.converter.clone();
        let ignore_dirs = Arc::clone(&self.ignore_dirs);
        tokio::task::spawn_blocking(move || {
            collect_blocking(&state, &converter, &ignore_dirs, files)
        })
        .await
        .map_err(|e| EngineError::Task(e.to_string()))?
    }
}

fn collect_blocking(
    state: &RwLock<CacheState>,
    converter: &WorkspacePathConverter,
    ignore_dirs: &[String],
    files: Vec<WorkspacePath>,
) -> Result<WorkspaceAnalysis, EngineError> {
    let mut analysis = WorkspaceAnalysis {
        files: BTreeMap::new(),
        failed: BTreeSet::new(),
        created_at: Utc::now(),
    };

    let (misses, generation) = {
        let cache = state
            .read()
            .map_err(|_| EngineError::Failed("cache lock poisoned".to_string()))?;
        let mut misses = Vec::new();
        for path in files {
            if let Some(summary) = cache.files.get(&path) {
                analysis.files.insert(path, *summary);
            } else if cache.failed.contains(&path) {
                analysis.failed.insert(path);
            } else {
                misses.push(path);
            }
        }
        (misses, cache.generation)
    };

    let loaded: Mutex<Loaded> = Mutex::new(Vec::with_capacity(misses.len()));
    misses.par_iter().for_each(|path| {
        let result = fs::read_to_string(converter.to_fs_path(path))
            .map(|source| FileSummary::of(&source))
            .map_err(|e| e.to_string());
        if let Ok(mut out) = loaded.lock() {
            out.push((path.clone(), result));
        }
    });
    let loaded = loaded.into_inner().unwrap_or_default();

    let mut cache = state
        .write()
        .map_err(|_| EngineError::Failed("cache lock poisoned".to_string()))?;
    let fresh = cache.generation == generation;
    for (path, result) in loaded {
        let cacheable = fresh && !in_ignored_dir(Path::new(path.as_str()), ignore_dirs);
        match result {
            Ok(summary) => {
                if cacheable {
                    cache.files.insert(path.clone(), summary);
                }
                analysis.files.insert(path, summary);
            }
            Err(error) => {
                debug!(path = %path, %error, "failed to read file");
                if cacheable {
                    cache.failed.insert(path.clone());
                }
                analysis.failed.insert(path);
            }
        }
    }
    if !fresh {
        debug!("cache invalidated during load, results not cached");
    }

    analysis.created_at = Utc::now();
    Ok(analysis)
}

/// All files under `root`, respecting .gitignore, skipping hidden entries
/// and never descending into `ignore_dirs`.
fn workspace_files(
    converter: &WorkspacePathConverter,
    ignore_dirs: Arc<[String]>,
) -> Vec<WorkspacePath> {
    let root = converter.root().to_path_buf();
    WalkBuilder::new(&root)
        .hidden(true)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .filter_entry(move |entry| {
            let relative = entry.path().strip_prefix(&root).unwrap_or(entry.path());
            !in_ignored_dir(relative, &ignore_dirs)
        })
        .build()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .filter_map(|entry| converter.convert_path(entry.path()))
        .collect()
}

#[async_trait]
impl AnalysisEngine for FileCacheEngine {
    type Analysis = WorkspaceAnalysis;

    fn invalidate(&self, paths: &[WorkspacePath]) -> BoxFuture<'static, Result<(), EngineError>> {
        let result = match self.state.write() {
            Ok(mut cache) => {
                for path in paths {
                    cache.files.remove(path);
                    cache.failed.remove(path);
                }
                cache.generation += 1;
                debug!(count = paths.len(), "invalidated cached files");
                Ok(())
            }
            Err(_) => Err(EngineError::Failed("cache lock poisoned".to_string())),
        };
        Box::pin(async move { result })
    }

    async fn analyze(&self, files: &[WorkspacePath]) -> Result<Arc<WorkspaceAnalysis>, EngineError> {
        let analysis = self.collect(files.to_vec()).await?;
        Ok(Arc::new(analysis))
    }

    async fn analyze_workspace(&self) -> Result<Arc<WorkspaceAnalysis>, EngineError> {
        let converter = self.converter.clone();
        let ignore_dirs = Arc::clone(&self.ignore_dirs);
        let files = tokio::task::spawn_blocking(move || workspace_files(&converter, ignore_dirs))
            .await
            .map_err(|e| EngineError::Task(e.to_string()))?;
        let analysis = self.collect(files).await?;
        Ok(Arc::new(analysis))
    }

    fn introspection(&self) -> Option<&dyn CacheIntrospection> {
        Some(self)
    }
}

impl CacheIntrospection for FileCacheEngine {
    fn cached_paths_under(
        &self,
        dir: &WorkspacePath,
    ) -> Result<Vec<WorkspacePath>, IntrospectionError> {
        let cache = self
            .state
            .read()
            .map_err(|_| IntrospectionError::Failed("cache lock poisoned".to_string()))?;
        Ok(cache
            .files
            .keys()
            .chain(cache.failed.iter())
            .filter(|path| path.is_inside(dir))
            .cloned()
            .collect())
    }
}
