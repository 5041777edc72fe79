//! Capability interface over the advisory lock mechanism.
//!
//! The transactional store only needs to acquire, release and probe a lock.
//! `FileLockProvider` implements that with lock markers next to the document;
//! other mechanisms can be substituted without touching the store.

use super::handle::LockHandle;
use super::operations;
use crate::config::LockConfig;
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Cross-process mutual exclusion over document paths.
#[async_trait]
pub trait LockProvider: Send + Sync + 'static {
    /// Proof of ownership returned by `acquire`.
    type Handle: Send + Sync + 'static;

    /// Block (asynchronously) until the lock on `path` is held, or fail with
    /// `LockTimeout`.
    async fn acquire(&self, path: &Path) -> Result<Self::Handle>;

    /// Give the lock back. Idempotent; never fails.
    async fn release(&self, handle: Self::Handle);

    /// Whether a live lock on `path` belongs to someone else. Never fails.
    async fn is_held_by_other(&self, path: &Path) -> bool;

    /// Whether `handle` still owns its lock, checked against the lock itself.
    async fn still_held(&self, handle: &Self::Handle) -> bool;
}

/// Lock markers (`<path>.lock`) with heartbeat and stale-holder recovery.
#[derive(Debug, Clone)]
pub struct FileLockProvider {
    config: LockConfig,
    instance_id: String,
}

impl FileLockProvider {
    pub fn new(config: LockConfig, instance_id: impl Into<String>) -> Self {
        Self {
            config,
            instance_id: instance_id.into(),
        }
    }

    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }
}

#[async_trait]
impl LockProvider for FileLockProvider {
    type Handle = LockHandle;

    async fn acquire(&self, path: &Path) -> Result<LockHandle> {
        operations::acquire(path, &self.config, &self.instance_id).await
    }

    async fn release(&self, handle: LockHandle) {
        handle.release().await;
    }

    async fn is_held_by_other(&self, path: &Path) -> bool {
        operations::is_held_by_other(path, self.config.stale_threshold, &self.instance_id).await
    }

    async fn still_held(&self, handle: &LockHandle) -> bool {
        handle.still_owns_marker().await
    }
}
