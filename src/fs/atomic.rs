//! Atomic document writes.
//!
//! Every commit follows the same sequence:
//! 1. Serialize the content (pretty JSON, sorted keys, trailing newline)
//! 2. Write it to a temp artifact next to the target and fsync it
//! 3. Copy the current target to `<path>.backup` (best effort)
//! 4. Rename the temp artifact over the target and fsync the directory
//!
//! A reader therefore sees either the complete old file or the complete new
//! one. Temp artifacts are named `<file>.<instance>.<seq>.tmp`, so two
//! writers (in one process or many) never share a temp path.
//!
//! Source and destination must be on the same filesystem for the rename to be
//! atomic, which holds because the temp artifact lives in the target's
//! directory.

use crate::error::{Result, StoreError};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

#[cfg(test)]
use std::sync::atomic::AtomicU32;

/// Suffix of the pre-write snapshot sibling.
pub const BACKUP_SUFFIX: &str = "backup";

/// Suffix of temp artifacts.
pub const TEMP_SUFFIX: &str = "tmp";

/// Path of the backup sibling for `path` (`<path>.backup`).
pub fn backup_path_for(path: &Path) -> PathBuf {
    sibling_with_suffix(path, BACKUP_SUFFIX)
}

pub(crate) fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// Serialize a document the way it is persisted.
///
/// `serde_json::Value` keeps object keys sorted, so the same document always
/// produces the same bytes.
pub fn serialize_document<T: Serialize + ?Sized>(content: &T) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(content).map_err(StoreError::Serialize)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Writes documents atomically on behalf of one store instance.
#[derive(Debug)]
pub struct AtomicWriter {
    instance_id: String,
    sequence: AtomicU64,

    /// Number of upcoming writes that fail just before the rename.
    #[cfg(test)]
    pub(crate) fail_next_replaces: AtomicU32,
}

impl AtomicWriter {
    /// Create a writer whose temp artifacts carry `instance_id`.
    pub fn new(instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            sequence: AtomicU64::new(0),
            #[cfg(test)]
            fail_next_replaces: AtomicU32::new(0),
        }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Serialize `content` and commit it to `path`.
    pub async fn write<T: Serialize + ?Sized>(&self, path: &Path, content: &T) -> Result<()> {
        let bytes = serialize_document(content)?;
        self.write_bytes(path, &bytes).await
    }

    /// Commit raw bytes to `path`.
    pub async fn write_bytes(&self, path: &Path, content: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                StoreError::io(
                    format!("failed to create parent directory '{}'", parent.display()),
                    e,
                )
            })?;
        }

        let temp_path = self.next_temp_path(path);

        if let Err(e) = self.stage(&temp_path, path, content).await {
            remove_temp(&temp_path).await;
            return Err(e);
        }

        if let Err(e) = fs::rename(&temp_path, path).await {
            remove_temp(&temp_path).await;
            return Err(StoreError::io(
                format!("failed to atomically replace '{}'", path.display()),
                e,
            ));
        }

        sync_parent_dir(path).await;
        debug!(path = %path.display(), bytes = content.len(), "committed document");
        Ok(())
    }

    /// Everything before the rename: temp write, fsync, backup.
    async fn stage(&self, temp_path: &Path, path: &Path, content: &[u8]) -> Result<()> {
        write_and_sync(temp_path, content).await?;
        backup_existing(path).await;
        self.injected_failure(path)
    }

    #[cfg(test)]
    fn injected_failure(&self, path: &Path) -> Result<()> {
        let armed = self
            .fail_next_replaces
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if armed {
            return Err(StoreError::io(
                format!("failed to atomically replace '{}'", path.display()),
                std::io::Error::other("no space left on device"),
            ));
        }
        Ok(())
    }

    #[cfg(not(test))]
    fn injected_failure(&self, _path: &Path) -> Result<()> {
        Ok(())
    }

    /// Temp artifact path for the next write: `<path>.<instance>.<seq>.tmp`.
    pub fn next_temp_path(&self, path: &Path) -> PathBuf {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        sibling_with_suffix(
            path,
            &format!("{}.{}.{}", self.instance_id, seq, TEMP_SUFFIX),
        )
    }
}

/// Write content to a file and sync to disk.
async fn write_and_sync(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = File::create(path).await.map_err(|e| {
        StoreError::io(
            format!("failed to create temporary file '{}'", path.display()),
            e,
        )
    })?;

    file.write_all(content)
        .await
        .map_err(|e| StoreError::io("failed to write to temporary file", e))?;

    file.sync_all()
        .await
        .map_err(|e| StoreError::io("failed to sync temporary file to disk", e))?;

    Ok(())
}

/// Snapshot the current target into `<path>.backup`. Never fails the write.
async fn backup_existing(path: &Path) {
    match fs::metadata(path).await {
        Ok(meta) if meta.is_file() && meta.len() > 0 => {}
        _ => return,
    }

    let backup = backup_path_for(path);
    if let Err(e) = fs::copy(path, &backup).await {
        warn!(
            path = %path.display(),
            backup = %backup.display(),
            error = %e,
            "failed to write backup before commit"
        );
    }
}

async fn remove_temp(temp_path: &Path) {
    match fs::remove_file(temp_path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(
            path = %temp_path.display(),
            error = %e,
            "failed to remove temporary file"
        ),
    }
}

/// Persist the directory entry after a rename.
#[cfg(unix)]
async fn sync_parent_dir(path: &Path) {
    if let Some(parent) = path.parent() {
        let parent = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };
        if let Ok(dir) = File::open(parent).await {
            let _ = dir.sync_all().await;
        }
    }
}

#[cfg(not(unix))]
async fn sync_parent_dir(_path: &Path) {}
