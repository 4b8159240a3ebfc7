//! analysis-sync CLI - keeps a file-cache analysis in sync with the workspace.
//!
//! Usage:
//!   analysis-sync watch               # Re-analyze after every change
//!   analysis-sync analyze [FILES...]  # One-shot analysis
//!   analysis-sync config              # Effective configuration

use analysis_sync::cli::{resolve_files, AnalysisReport, Cli, Commands};
use analysis_sync::{
    watcher, DocumentStore, FileCacheEngine, InMemoryDocuments, SyncConfig, Synchronizer,
    VersionTracker, WorkspaceAnalysis, WorkspacePathConverter,
};
use anyhow::Result;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let root = cli.root.canonicalize().unwrap_or(cli.root);
    let config = SyncConfig::load_for_root(&root);
    init_tracing(&config.log.level);

    match cli.command {
        Commands::Watch => watch(&root, &config).await,
        Commands::Analyze { files } => {
            let tracker = tracker(&root, &config);
            let analysis = if files.is_empty() {
                tracker.analyze_workspace().await?
            } else {
                let files = resolve_files(&WorkspacePathConverter::new(&root), &files)?;
                tracker.analyze(&files).await?
            };
            print_report(&tracker, &analysis)
        }
        Commands::Config => {
            print!("{}", config.to_toml());
            Ok(())
        }
    }
}

/// Tracing goes to stderr so stdout stays machine-readable.
fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();
}

fn tracker(root: &Path, config: &SyncConfig) -> VersionTracker<FileCacheEngine> {
    let engine = Arc::new(FileCacheEngine::with_ignore_dirs(
        root,
        config.watch.ignore_dirs.clone(),
    ));
    // No editor is attached to the CLI, so nothing is ever open.
    let documents: Arc<dyn DocumentStore> = Arc::new(InMemoryDocuments::new());
    VersionTracker::new(engine, documents)
}

async fn watch(root: &Path, config: &SyncConfig) -> Result<()> {
    let tracker = tracker(root, config);
    let sync = Arc::new(Synchronizer::new(
        Arc::clone(tracker.engine()),
        Arc::new(WorkspacePathConverter::new(root)),
        &config.sync,
    ));
    let mut changes = sync.subscribe();

    let (tx, rx) = mpsc::channel(config.sync.batch_queue.max(1));
    let handle = watcher::start_watching(root, &config.watch, tx)?;
    let task = Arc::clone(&sync).spawn(rx);

    let initial = tracker.analyze_workspace().await?;
    print_report(&tracker, &initial)?;

    loop {
        tokio::select! {
            changed = changes.recv() => match changed {
                Ok(_) | Err(RecvError::Lagged(_)) => match tracker.analyze_workspace().await {
                    Ok(analysis) => print_report(&tracker, &analysis)?,
                    Err(e) => warn!(error = %e, "re-analysis failed"),
                },
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        }
    }

    drop(handle);
    task.abort();
    Ok(())
}

fn print_report(
    tracker: &VersionTracker<FileCacheEngine>,
    analysis: &Arc<WorkspaceAnalysis>,
) -> Result<()> {
    let versions = tracker.versions_at(analysis)?;
    let report = AnalysisReport::new(analysis, &versions);
    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}
