//! Configuration loaded from `.anchor/sync.toml` under the workspace root.
//!
//! Every field has a default; a missing or malformed file never stops the
//! synchronizer from starting.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Directory holding per-workspace state and configuration.
pub const ANCHOR_DIR: &str = ".anchor";
pub const CONFIG_FILE: &str = "sync.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub watch: WatchConfig,
    pub sync: SynchronizerConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Debounce window for raw filesystem events.
    pub debounce_ms: u64,
    /// Directory names whose contents never produce events.
    pub ignore_dirs: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            ignore_dirs: vec![
                ".git".to_string(),
                "target".to_string(),
                "node_modules".to_string(),
                ANCHOR_DIR.to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynchronizerConfig {
    /// Expand directory deletions into the cached files below them.
    pub cascade_deletes: bool,
    /// Buffer size of the change signal channel.
    pub signal_capacity: usize,
    /// Bound of the queue between the watcher and the synchronizer.
    pub batch_queue: usize,
}

impl Default for SynchronizerConfig {
    fn default() -> Self {
        Self {
            cascade_deletes: true,
            signal_capacity: 64,
            batch_queue: 32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl SyncConfig {
    /// Load from `path`, falling back to defaults if the file is missing or
    /// cannot be parsed.
    pub fn load(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Self::default();
            }
        };
        match toml::from_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "invalid config, using defaults");
                Self::default()
            }
        }
    }

    /// Load the config for the workspace at `root`.
    pub fn load_for_root(root: &Path) -> Self {
        Self::load(&Self::path_for_root(root))
    }

    pub fn path_for_root(root: &Path) -> PathBuf {
        root.join(ANCHOR_DIR).join(CONFIG_FILE)
    }

    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}
