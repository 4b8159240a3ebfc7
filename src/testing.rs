//! Scriptable collaborators shared by the unit tests.

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

use crate::engine::{AnalysisEngine, CacheIntrospection, EngineError, IntrospectionError};
use crate::paths::{FileChangeKind, PathConverter, RawFileEvent, WorkspacePath};
use crate::sync::FileChangeEvent;

pub(crate) fn raw(batch: &[(&str, FileChangeKind)]) -> Vec<RawFileEvent> {
    batch
        .iter()
        .map(|&(path, kind)| RawFileEvent::new(path, kind))
        .collect()
}

pub(crate) fn events(batch: &[(&str, FileChangeKind)]) -> Vec<FileChangeEvent> {
    batch
        .iter()
        .map(|&(path, kind)| FileChangeEvent {
            path: WorkspacePath::from(path),
            kind,
        })
        .collect()
}

/// Uses the raw path string as the workspace identifier.
pub(crate) fn identity_converter() -> Arc<dyn PathConverter> {
    Arc::new(|event: &RawFileEvent| event.path.to_str().map(WorkspacePath::from))
}

/// A cache with a fixed set of entries.
pub(crate) struct FixedCache {
    paths: Vec<WorkspacePath>,
    filter: bool,
    error: Option<IntrospectionError>,
    panics: bool,
    calls: AtomicUsize,
}

impl FixedCache {
    pub(crate) fn new(paths: &[&str]) -> Self {
        Self {
            paths: paths.iter().map(|&p| WorkspacePath::from(p)).collect(),
            filter: true,
            error: None,
            panics: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Returns every entry regardless of the requested directory.
    pub(crate) fn unfiltered(paths: &[&str]) -> Self {
        Self {
            filter: false,
            ..Self::new(paths)
        }
    }

    pub(crate) fn failing(error: IntrospectionError) -> Self {
        Self {
            error: Some(error),
            ..Self::new(&[])
        }
    }

    pub(crate) fn panicking() -> Self {
        Self {
            panics: true,
            ..Self::new(&[])
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CacheIntrospection for FixedCache {
    fn cached_paths_under(
        &self,
        dir: &WorkspacePath,
    ) -> Result<Vec<WorkspacePath>, IntrospectionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panics {
            panic!("cache layout changed under {dir}");
        }
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        Ok(self
            .paths
            .iter()
            .filter(|p| !self.filter || p.is_inside(dir))
            .cloned()
            .collect())
    }
}

/// The analysis produced by [`FakeEngine`].
#[derive(Debug)]
pub(crate) struct FakeAnalysis {
    pub(crate) id: usize,
    pub(crate) files: Vec<WorkspacePath>,
}

type Gate = oneshot::Receiver<Result<(), EngineError>>;

/// An engine whose invalidations are recorded and whose completions can be
/// held back until a test releases them.
#[derive(Default)]
pub(crate) struct FakeEngine {
    cache: Option<FixedCache>,
    invalidations: Mutex<Vec<Vec<WorkspacePath>>>,
    completed: Arc<AtomicUsize>,
    invalidation_gates: Mutex<VecDeque<Gate>>,
    invalidation_failures: Mutex<VecDeque<String>>,
    analysis_gates: Mutex<VecDeque<Gate>>,
    analysis_failures: Mutex<VecDeque<String>>,
    analyses: AtomicUsize,
}

impl FakeEngine {
    pub(crate) fn with_cache(paths: &[&str]) -> Self {
        Self {
            cache: Some(FixedCache::new(paths)),
            ..Self::default()
        }
    }

    pub(crate) fn with_failing_introspection() -> Self {
        Self {
            cache: Some(FixedCache::failing(IntrospectionError::Failed(
                "private cache layout changed".to_string(),
            ))),
            ..Self::default()
        }
    }

    pub(crate) fn with_panicking_introspection() -> Self {
        Self {
            cache: Some(FixedCache::panicking()),
            ..Self::default()
        }
    }

    pub(crate) fn invalidations(&self) -> Vec<Vec<WorkspacePath>> {
        self.invalidations.lock().unwrap().clone()
    }

    pub(crate) fn completed_invalidations(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub(crate) fn introspection_calls(&self) -> usize {
        self.cache.as_ref().map_or(0, FixedCache::calls)
    }

    /// Hold the next invalidation open until the returned sender fires.
    pub(crate) fn gate_invalidation(&self) -> oneshot::Sender<Result<(), EngineError>> {
        let (tx, rx) = oneshot::channel();
        self.invalidation_gates.lock().unwrap().push_back(rx);
        tx
    }

    pub(crate) fn fail_next_invalidation(&self, message: &str) {
        self.invalidation_failures
            .lock()
            .unwrap()
            .push_back(message.to_string());
    }

    /// Hold the next analysis open until the returned sender fires.
    pub(crate) fn gate_analysis(&self) -> oneshot::Sender<Result<(), EngineError>> {
        let (tx, rx) = oneshot::channel();
        self.analysis_gates.lock().unwrap().push_back(rx);
        tx
    }

    pub(crate) fn fail_next_analysis(&self, message: &str) {
        self.analysis_failures
            .lock()
            .unwrap()
            .push_back(message.to_string());
    }

    async fn run_analysis(&self, files: Vec<WorkspacePath>) -> Result<Arc<FakeAnalysis>, EngineError> {
        let gate = self.analysis_gates.lock().unwrap().pop_front();
        let failure = self.analysis_failures.lock().unwrap().pop_front();
        if let Some(gate) = gate {
            gate.await.unwrap_or(Ok(()))?;
        }
        if let Some(message) = failure {
            return Err(EngineError::Failed(message));
        }
        let id = self.analyses.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FakeAnalysis { id, files }))
    }
}

#[async_trait]
impl AnalysisEngine for FakeEngine {
    type Analysis = FakeAnalysis;

    fn invalidate(&self, paths: &[WorkspacePath]) -> BoxFuture<'static, Result<(), EngineError>> {
        self.invalidations.lock().unwrap().push(paths.to_vec());
        let gate = self.invalidation_gates.lock().unwrap().pop_front();
        let failure = self.invalidation_failures.lock().unwrap().pop_front();
        let completed = Arc::clone(&self.completed);
        Box::pin(async move {
            if let Some(gate) = gate {
                gate.await.unwrap_or(Ok(()))?;
            }
            completed.fetch_add(1, Ordering::SeqCst);
            match failure {
                Some(message) => Err(EngineError::Failed(message)),
                None => Ok(()),
            }
        })
    }

    async fn analyze(&self, files: &[WorkspacePath]) -> Result<Arc<FakeAnalysis>, EngineError> {
        self.run_analysis(files.to_vec()).await
    }

    async fn analyze_workspace(&self) -> Result<Arc<FakeAnalysis>, EngineError> {
        self.run_analysis(Vec::new()).await
    }

    fn introspection(&self) -> Option<&dyn CacheIntrospection> {
        self.cache.as_ref().map(|c| c as &dyn CacheIntrospection)
    }
}
