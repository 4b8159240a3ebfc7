//! File change synchronization.
//!
//! Turns watcher batches into invalidation sets, cascading directory
//! deletions into the cached files below them, and tells consumers when
//! re-analyzing may give different results.

pub mod changeset;
pub mod synchronizer;

pub use changeset::{build_change_set, convert_events, ChangeSet, FileChangeEvent};
pub use synchronizer::{AnalysisChanged, Synchronizer};
