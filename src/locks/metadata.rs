//! Lock marker contents and staleness.

use crate::error::{Result, StoreError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

/// Metadata stored in a lock marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockMetadata {
    /// Owner of the lock (e.g., `user@HOST`).
    pub owner: String,

    /// Process ID of the lock holder.
    pub pid: u32,

    /// Identity of the store instance holding the lock.
    pub instance: String,

    /// Unique per acquisition; a marker with another token belongs to someone else.
    pub token: String,

    /// When the lock was acquired (RFC3339).
    pub acquired_at: DateTime<Utc>,

    /// Last time the holder proved it was alive (RFC3339).
    pub heartbeat_at: DateTime<Utc>,
}

impl LockMetadata {
    /// Create metadata for a fresh acquisition by `instance`.
    pub fn new(instance: &str) -> Self {
        let now = Utc::now();
        Self {
            owner: get_owner_string(),
            pid: std::process::id(),
            instance: instance.to_string(),
            token: uuid::Uuid::new_v4().simple().to_string(),
            acquired_at: now,
            heartbeat_at: now,
        }
    }

    /// Parse lock metadata from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            StoreError::io(format!("failed to read lock file '{}'", path.display()), e)
        })?;

        serde_json::from_str(&content).map_err(|e| StoreError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Serialize lock metadata to JSON string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(StoreError::Serialize)
    }

    /// Short description of the holder for error messages.
    pub fn holder(&self) -> String {
        format!("{} (pid {}, instance {})", self.owner, self.pid, self.instance)
    }
}

/// A lock marker as found on disk.
///
/// `metadata` is `None` while a holder is between creating the marker and
/// writing into it, or if the marker is corrupt; the file's modification
/// time then stands in for the heartbeat.
#[derive(Debug, Clone)]
pub struct Marker {
    pub metadata: Option<LockMetadata>,
    pub last_heartbeat: DateTime<Utc>,
}

impl Marker {
    /// Read the marker at `lock_path`. `Ok(None)` if there is no marker.
    pub fn read(lock_path: &Path) -> io::Result<Option<Self>> {
        let content = match fs::read_to_string(lock_path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        if let Ok(metadata) = serde_json::from_str::<LockMetadata>(&content) {
            return Ok(Some(Self {
                last_heartbeat: metadata.heartbeat_at,
                metadata: Some(metadata),
            }));
        }

        let modified = match fs::metadata(lock_path) {
            Ok(meta) => meta.modified()?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(Some(Self {
            metadata: None,
            last_heartbeat: DateTime::<Utc>::from(modified),
        }))
    }

    /// Time since the last heartbeat. Clock skew into the future counts as zero.
    pub fn heartbeat_age(&self) -> Duration {
        Utc::now()
            .signed_duration_since(self.last_heartbeat)
            .to_std()
            .unwrap_or_default()
    }

    /// The holder is presumed dead once its heartbeat is older than `threshold`.
    pub fn is_stale(&self, threshold: Duration) -> bool {
        self.heartbeat_age() > threshold
    }

    /// Whether this marker was written by the acquisition identified by `token`.
    pub fn has_token(&self, token: &str) -> bool {
        self.metadata.as_ref().is_some_and(|m| m.token == token)
    }

    pub fn holder(&self) -> Option<String> {
        self.metadata.as_ref().map(LockMetadata::holder)
    }
}

/// Format a duration as a short human-readable age.
pub fn age_string(age: Duration) -> String {
    let secs = age.as_secs();
    let minutes = secs / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("{}d {}h", days, hours % 24)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs % 60)
    } else {
        format!("{}.{}s", secs, age.subsec_millis() / 100)
    }
}

/// Get the owner string for lock metadata.
pub(crate) fn get_owner_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}
