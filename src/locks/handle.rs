//! Ownership token for a held cross-process lock.

use super::metadata::LockMetadata;
use super::operations::{
    Refresh, blocking, owns_marker, refresh_marker, release_marker, try_release_marker,
};
use crate::config::LockConfig;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A held lock on one document path.
///
/// While the handle lives, a background task refreshes the marker's
/// heartbeat every `heartbeat_interval`. Call [`LockHandle::release`] to give
/// the lock back. Dropping an unreleased handle releases it too and only logs
/// failures; if the gate is busy at that moment the release finishes on the
/// blocking pool instead of stalling the dropping thread.
#[derive(Debug)]
pub struct LockHandle {
    path: PathBuf,
    lock_path: PathBuf,
    metadata: LockMetadata,
    stale_threshold: Duration,
    heartbeat_interval: Duration,
    heartbeat: Option<JoinHandle<()>>,
    lost: Arc<AtomicBool>,
    released: bool,
}

impl LockHandle {
    /// Wrap a freshly written marker and start its heartbeat.
    pub(super) fn start(
        path: PathBuf,
        lock_path: PathBuf,
        metadata: LockMetadata,
        config: &LockConfig,
    ) -> Self {
        let lost = Arc::new(AtomicBool::new(false));
        let heartbeat = tokio::spawn(heartbeat_loop(
            lock_path.clone(),
            metadata.token.clone(),
            config.heartbeat_interval,
            Arc::clone(&lost),
        ));

        Self {
            path,
            lock_path,
            metadata,
            stale_threshold: config.stale_threshold,
            heartbeat_interval: config.heartbeat_interval,
            heartbeat: Some(heartbeat),
            lost,
            released: false,
        }
    }

    /// The locked document path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The lock marker path.
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Holder identity recorded in the marker.
    pub fn metadata(&self) -> &LockMetadata {
        &self.metadata
    }

    pub fn acquired_at(&self) -> DateTime<Utc> {
        self.metadata.acquired_at
    }

    pub fn stale_threshold(&self) -> Duration {
        self.stale_threshold
    }

    pub fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval
    }

    /// Whether the heartbeat found the marker gone or taken over.
    ///
    /// That only happens if this holder stalled past the stale threshold and
    /// another process recovered the lock.
    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::SeqCst)
    }

    /// Re-read the marker and check that it still carries this handle's token.
    ///
    /// Unlike [`is_lost`](Self::is_lost) this does not wait for the heartbeat
    /// task to notice a takeover. An unreadable marker counts as lost.
    pub async fn still_owns_marker(&self) -> bool {
        if self.is_lost() {
            return false;
        }

        let lock_path = self.lock_path.clone();
        let token = self.metadata.token.clone();
        let owned = match blocking(move || owns_marker(&lock_path, &token)).await {
            Ok(owned) => owned,
            Err(e) => {
                warn!(path = %self.lock_path.display(), error = %e, "could not verify lock marker");
                false
            }
        };
        if !owned {
            self.lost.store(true, Ordering::SeqCst);
        }
        owned
    }

    /// Release the lock. Never fails; problems are logged.
    pub async fn release(mut self) {
        self.released = true;
        self.stop_heartbeat();

        let lock_path = self.lock_path.clone();
        let token = self.metadata.token.clone();
        match blocking(move || release_marker(&lock_path, &token)).await {
            Ok(true) => debug!(path = %self.path.display(), "lock released"),
            Ok(false) => debug!(
                path = %self.path.display(),
                "lock marker already gone or superseded at release"
            ),
            Err(e) => warn!(
                path = %self.lock_path.display(),
                error = %e,
                "failed to release lock"
            ),
        }
    }

    fn stop_heartbeat(&mut self) {
        if let Some(task) = self.heartbeat.take() {
            task.abort();
        }
    }
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.stop_heartbeat();

        match try_release_marker(&self.lock_path, &self.metadata.token) {
            Ok(Some(_)) => debug!(path = %self.path.display(), "lock released on drop"),
            Ok(None) => self.release_in_background(),
            Err(e) => warn!(
                path = %self.lock_path.display(),
                error = %e,
                "failed to release lock on drop"
            ),
        }
    }
}

impl LockHandle {
    /// Wait for the busy gate off the current thread when a runtime is around.
    fn release_in_background(&self) {
        let lock_path = self.lock_path.clone();
        let token = self.metadata.token.clone();
        let release = move || {
            if let Err(e) = release_marker(&lock_path, &token) {
                warn!(
                    path = %lock_path.display(),
                    error = %e,
                    "failed to release lock on drop"
                );
            }
        };

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn_blocking(release);
            }
            Err(_) => release(),
        }
    }
}

async fn heartbeat_loop(
    lock_path: PathBuf,
    token: String,
    interval: Duration,
    lost: Arc<AtomicBool>,
) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately; the marker was just written.
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let path = lock_path.clone();
        let tok = token.clone();
        match blocking(move || refresh_marker(&path, &tok)).await {
            Ok(Refresh::Refreshed) => {}
            Ok(Refresh::Lost) => {
                lost.store(true, Ordering::SeqCst);
                warn!(path = %lock_path.display(), "lock lost to another holder; heartbeat stopped");
                return;
            }
            Err(e) => warn!(
                path = %lock_path.display(),
                error = %e,
                "failed to refresh lock heartbeat"
            ),
        }
    }
}
