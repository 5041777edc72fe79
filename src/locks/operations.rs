//! Lock acquisition, heartbeat refresh, release and inspection.

use super::backoff::Backoff;
use super::gate::Gate;
use super::handle::LockHandle;
use super::metadata::{LockMetadata, Marker};
use super::types::LockInfo;
use crate::config::LockConfig;
use crate::error::{Result, StoreError};
use crate::fs::atomic::sibling_with_suffix;
use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Path of the lock marker for `path` (`<path>.lock`).
pub fn lock_path_for(path: &Path) -> PathBuf {
    sibling_with_suffix(path, "lock")
}

pub(super) fn gate_path_for(lock_path: &Path) -> PathBuf {
    sibling_with_suffix(lock_path, "gate")
}

/// Outcome of one acquisition attempt.
#[derive(Debug)]
pub(super) enum Attempt {
    /// The marker is ours. `recovered` holds the stale marker we replaced.
    Acquired { recovered: Option<Marker> },
    /// Someone else holds a live lock (`None` if the marker could not be read).
    Held { holder: Option<String> },
}

/// Create the marker exclusively. `Ok(false)` if it already exists.
fn create_marker(lock_path: &Path, metadata: &LockMetadata) -> io::Result<bool> {
    let mut file = match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(lock_path)
    {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(e),
    };

    let json = serde_json::to_vec_pretty(metadata).map_err(io::Error::other)?;
    let written = file.write_all(&json).and_then(|()| file.sync_all());
    if let Err(e) = written {
        // Clean up the marker on write failure
        let _ = fs::remove_file(lock_path);
        return Err(e);
    }
    Ok(true)
}

/// One attempt at taking the lock, including stale-holder recovery.
///
/// The staleness check and the takeover happen under the gate, so two
/// processes can never both decide the same marker is stale and both win.
pub(super) fn try_acquire_once(
    lock_path: &Path,
    metadata: &LockMetadata,
    stale_threshold: Duration,
) -> io::Result<Attempt> {
    if create_marker(lock_path, metadata)? {
        return Ok(Attempt::Acquired { recovered: None });
    }

    let _gate = Gate::lock(&gate_path_for(lock_path))?;

    let Some(marker) = Marker::read(lock_path)? else {
        // Released between our create and the gate
        return Ok(if create_marker(lock_path, metadata)? {
            Attempt::Acquired { recovered: None }
        } else {
            Attempt::Held { holder: None }
        });
    };

    if !marker.is_stale(stale_threshold) {
        return Ok(Attempt::Held {
            holder: marker.holder(),
        });
    }

    match fs::remove_file(lock_path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    // An ungated create can still slip in between the remove and ours.
    if create_marker(lock_path, metadata)? {
        Ok(Attempt::Acquired {
            recovered: Some(marker),
        })
    } else {
        Ok(Attempt::Held { holder: None })
    }
}

/// Outcome of a heartbeat refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Refresh {
    Refreshed,
    /// The marker is gone or belongs to another acquisition.
    Lost,
}

/// Bump `heartbeat_at` in our marker, if it is still ours.
pub(super) fn refresh_marker(lock_path: &Path, token: &str) -> io::Result<Refresh> {
    let _gate = Gate::lock(&gate_path_for(lock_path))?;

    let Some(Marker {
        metadata: Some(mut metadata),
        ..
    }) = Marker::read(lock_path)?
    else {
        return Ok(Refresh::Lost);
    };
    if metadata.token != token {
        return Ok(Refresh::Lost);
    }

    metadata.heartbeat_at = Utc::now();
    let json = serde_json::to_vec_pretty(&metadata).map_err(io::Error::other)?;

    // Replace the marker whole so readers never see a half-written heartbeat
    let temp = sibling_with_suffix(lock_path, &format!("{}.hb", token));
    let result = (|| {
        let mut file = fs::File::create(&temp)?;
        file.write_all(&json)?;
        file.sync_all()?;
        fs::rename(&temp, lock_path)
    })();
    if let Err(e) = result {
        let _ = fs::remove_file(&temp);
        return Err(e);
    }
    Ok(Refresh::Refreshed)
}

/// Remove our marker. `Ok(false)` if it was already gone or superseded.
pub(super) fn release_marker(lock_path: &Path, token: &str) -> io::Result<bool> {
    let _gate = Gate::lock(&gate_path_for(lock_path))?;
    remove_own_marker(lock_path, token)
}

/// Like [`release_marker`], but gives up instead of waiting for a busy gate.
///
/// `Ok(None)` means the gate was held by someone else and nothing was done.
pub(super) fn try_release_marker(lock_path: &Path, token: &str) -> io::Result<Option<bool>> {
    let Some(_gate) = Gate::try_lock(&gate_path_for(lock_path))? else {
        return Ok(None);
    };
    remove_own_marker(lock_path, token).map(Some)
}

/// Caller must hold the gate.
fn remove_own_marker(lock_path: &Path, token: &str) -> io::Result<bool> {
    match Marker::read(lock_path)? {
        Some(marker) if marker.has_token(token) => match fs::remove_file(lock_path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        },
        _ => Ok(false),
    }
}

/// Whether the marker at `lock_path` still carries `token`.
///
/// Markers are only ever replaced whole, so this needs no gate.
pub(super) fn owns_marker(lock_path: &Path, token: &str) -> io::Result<bool> {
    Ok(Marker::read(lock_path)?.is_some_and(|marker| marker.has_token(token)))
}

/// Run blocking lock I/O off the async executor.
pub(super) async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result.map_err(|e| StoreError::io("lock file operation failed", e)),
        Err(e) => Err(StoreError::io(
            "lock file task did not complete",
            io::Error::other(e),
        )),
    }
}

/// Make sure there is a document file to lock.
async fn ensure_placeholder(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            StoreError::io(
                format!("failed to create directory '{}'", parent.display()),
                e,
            )
        })?;
    }

    match tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
    {
        Ok(_) => {
            debug!(path = %path.display(), "created placeholder document");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(StoreError::io(
            format!("failed to create placeholder '{}'", path.display()),
            e,
        )),
    }
}

/// Acquire the cross-process lock on `path` for store instance `instance_id`.
///
/// Retries with exponential backoff while a live holder has the lock. A holder
/// whose heartbeat is older than the stale threshold is replaced on the next
/// attempt. Fails with `LockTimeout` once `max_retries` retries are used up.
pub async fn acquire(path: &Path, config: &LockConfig, instance_id: &str) -> Result<LockHandle> {
    ensure_placeholder(path).await?;

    let lock_path = lock_path_for(path);
    let backoff = Backoff::from_config(config);
    let mut last_holder = None;

    for retry in 0..=config.max_retries {
        if retry > 0 {
            tokio::time::sleep(backoff.jittered_delay(retry - 1)).await;
        }

        let metadata = LockMetadata::new(instance_id);
        let attempt = {
            let lock_path = lock_path.clone();
            let metadata = metadata.clone();
            let threshold = config.stale_threshold;
            blocking(move || try_acquire_once(&lock_path, &metadata, threshold)).await?
        };

        match attempt {
            Attempt::Acquired { recovered } => {
                if let Some(stale) = recovered {
                    warn!(
                        path = %path.display(),
                        previous_holder = stale.holder().as_deref().unwrap_or("unknown"),
                        heartbeat_age_ms = stale.heartbeat_age().as_millis() as u64,
                        "recovered stale lock"
                    );
                }
                debug!(path = %path.display(), retry, token = %metadata.token, "lock acquired");
                return Ok(LockHandle::start(
                    path.to_path_buf(),
                    lock_path,
                    metadata,
                    config,
                ));
            }
            Attempt::Held { holder } => {
                debug!(
                    path = %path.display(),
                    retry,
                    holder = holder.as_deref().unwrap_or("unknown"),
                    "lock contended"
                );
                if holder.is_some() {
                    last_holder = holder;
                }
            }
        }
    }

    Err(StoreError::LockTimeout {
        path: path.to_path_buf(),
        attempts: config.max_retries + 1,
        holder: last_holder,
    })
}

/// Whether a live lock on `path` is held by anyone other than `instance_id`.
///
/// Never blocks on the lock and never fails; unreadable state reads as `false`.
pub async fn is_held_by_other(path: &Path, stale_threshold: Duration, instance_id: &str) -> bool {
    let lock_path = lock_path_for(path);
    let marker = match blocking(move || Marker::read(&lock_path)).await {
        Ok(marker) => marker,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "could not read lock marker");
            return false;
        }
    };

    match marker {
        None => false,
        Some(marker) if marker.is_stale(stale_threshold) => false,
        Some(Marker {
            metadata: Some(metadata),
            ..
        }) => metadata.instance != instance_id,
        // Unreadable but fresh: someone is mid-acquisition
        Some(_) => true,
    }
}

/// Describe the current lock on `path`, if any.
pub async fn inspect(path: &Path, stale_threshold: Duration) -> Result<Option<LockInfo>> {
    let lock_path = lock_path_for(path);
    let read_path = lock_path.clone();
    let marker = blocking(move || Marker::read(&read_path)).await?;

    Ok(marker.map(|marker| LockInfo {
        is_stale: marker.is_stale(stale_threshold),
        heartbeat_age: marker.heartbeat_age(),
        last_heartbeat: marker.last_heartbeat,
        metadata: marker.metadata,
        path: lock_path,
    }))
}

/// Remove the lock on `path` only if it is stale. Returns whether it was removed.
pub async fn clear_stale(path: &Path, stale_threshold: Duration) -> Result<bool> {
    let lock_path = lock_path_for(path);
    let removed = blocking(move || {
        let _gate = Gate::lock(&gate_path_for(&lock_path))?;
        match Marker::read(&lock_path)? {
            Some(marker) if marker.is_stale(stale_threshold) => {
                match fs::remove_file(&lock_path) {
                    Ok(()) => Ok(true),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
                    Err(e) => Err(e),
                }
            }
            _ => Ok(false),
        }
    })
    .await?;

    if removed {
        warn!(path = %path.display(), "cleared stale lock");
    }
    Ok(removed)
}
