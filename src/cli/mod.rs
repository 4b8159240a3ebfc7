//! CLI definitions for analysis-sync.
//!
//! Commands:
//! - watch: keep the cache in sync and re-analyze on every change
//! - analyze: one-shot analysis with version stamp
//! - config: print the effective configuration

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

use crate::engine::WorkspaceAnalysis;
use crate::error::{Result, SyncError};
use crate::paths::{WorkspacePath, WorkspacePathConverter};
use crate::versions::VersionSnapshot;

#[derive(Parser)]
#[command(name = "analysis-sync")]
#[command(about = "Keep analysis results in sync with a live workspace")]
pub struct Cli {
    /// Project root directory (default: current directory)
    #[arg(short, long, default_value = ".")]
    pub root: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Watch the workspace and print a summary after every change
    Watch,

    /// Analyze files (or the whole workspace) once
    Analyze {
        /// Files to analyze, relative to the root or absolute; empty means
        /// the whole workspace
        files: Vec<PathBuf>,
    },

    /// Print the effective configuration
    Config,
}

/// Resolve `analyze` arguments to the identifiers the engine caches under.
pub fn resolve_files(
    converter: &WorkspacePathConverter,
    files: &[PathBuf],
) -> Result<Vec<WorkspacePath>> {
    files
        .iter()
        .map(|file| {
            converter
                .resolve(file)
                .ok_or_else(|| SyncError::OutsideWorkspace(file.clone()))
        })
        .collect()
}

/// One line of JSON output describing an analysis.
#[derive(Debug, Serialize)]
pub struct AnalysisReport<'a> {
    pub created_at: String,
    pub files: usize,
    pub failed: Vec<&'a str>,
    pub versions: &'a VersionSnapshot,
}

impl<'a> AnalysisReport<'a> {
    pub fn new(analysis: &'a WorkspaceAnalysis, versions: &'a VersionSnapshot) -> Self {
        Self {
            created_at: analysis.created_at.to_rfc3339(),
            files: analysis.files.len(),
            failed: analysis.failed.iter().map(|p| p.as_str()).collect(),
            versions,
        }
    }
}
