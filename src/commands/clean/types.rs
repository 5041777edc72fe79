//! Data types for the clean command.

use lockstore::fs::OrphanTempFile;
use lockstore::locks::LockInfo;
use std::path::PathBuf;

/// What `clean` found next to a document.
#[derive(Debug, Default)]
pub struct CleanupPlan {
    /// Temp artifacts old enough to be leftovers from a crashed write.
    pub orphan_temp_files: Vec<OrphanTempFile>,
    /// Temp artifacts young enough to belong to a write still in flight.
    pub recent_temp_files: Vec<OrphanTempFile>,
    /// A lock marker whose holder stopped heartbeating.
    pub stale_lock: Option<LockInfo>,
}

impl CleanupPlan {
    pub fn candidate_count(&self) -> usize {
        self.orphan_temp_files.len() + usize::from(self.stale_lock.is_some())
    }
}

/// Summary of cleanup results.
#[derive(Debug, Default)]
pub struct CleanupResult {
    /// Number of items successfully removed.
    pub removed_count: usize,
    /// Paths that were skipped with reasons.
    pub skipped: Vec<(PathBuf, String)>,
}
