//! Lock information structures.

use super::metadata::{LockMetadata, age_string};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::Duration;

/// Information about a lock marker found on disk.
#[derive(Debug, Clone)]
pub struct LockInfo {
    /// The lock marker path.
    pub path: PathBuf,

    /// The marker contents, if they could be parsed.
    pub metadata: Option<LockMetadata>,

    /// Heartbeat time (marker mtime when the contents are unreadable).
    pub last_heartbeat: DateTime<Utc>,

    /// Time since the last heartbeat.
    pub heartbeat_age: Duration,

    /// Whether the lock is stale.
    pub is_stale: bool,
}

impl std::fmt::Display for LockInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let holder = self
            .metadata
            .as_ref()
            .map(LockMetadata::holder)
            .unwrap_or_else(|| "unknown holder".to_string());
        write!(
            f,
            "{} (holder: {}, last heartbeat: {} ago{})",
            self.path.display(),
            holder,
            age_string(self.heartbeat_age),
            if self.is_stale { ", STALE" } else { "" }
        )
    }
}
