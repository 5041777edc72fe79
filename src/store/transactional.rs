//! Read / write / modify over one document with full locking.

use super::status::{StoreStatus, collect_status};
use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::fs::{AtomicWriter, serialize_document};
use crate::keyed_mutex::{KeyedMutex, MutexLimits, normalize_key};
use crate::locks::{FileLockProvider, LockProvider};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Generate a short identifier for a store instance.
pub fn new_instance_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    id[..12].to_string()
}

/// Outcome of one write attempt.
#[derive(Debug)]
enum WriteOutcome {
    Committed,
    Retryable(StoreError),
    Fatal(StoreError),
}

impl From<Result<()>> for WriteOutcome {
    fn from(result: Result<()>) -> Self {
        match result {
            Ok(()) => WriteOutcome::Committed,
            Err(e) if e.is_retryable() => WriteOutcome::Retryable(e),
            Err(e) => WriteOutcome::Fatal(e),
        }
    }
}

/// Transactional access to one JSON document shared between processes.
///
/// Every operation first queues behind other operations on the same path in
/// this process, then takes the cross-process lock, does its I/O, and
/// releases both on every exit path.
pub struct TransactionalStore<P: LockProvider = FileLockProvider> {
    path: PathBuf,
    key: PathBuf,
    config: StoreConfig,
    instance_id: String,
    provider: P,
    pub(crate) writer: AtomicWriter,
    mutex: Arc<KeyedMutex>,
}

impl TransactionalStore<FileLockProvider> {
    /// Open a store for the document at `path` using lock markers.
    pub fn new(path: impl Into<PathBuf>, config: StoreConfig) -> Result<Self> {
        let instance_id = new_instance_id();
        let provider = FileLockProvider::new(config.lock_config(), instance_id.clone());
        Self::with_provider(path, config, provider, instance_id)
    }
}

impl<P: LockProvider> TransactionalStore<P> {
    /// Open a store that locks through `provider`.
    pub fn with_provider(
        path: impl Into<PathBuf>,
        config: StoreConfig,
        provider: P,
        instance_id: impl Into<String>,
    ) -> Result<Self> {
        config.validate()?;
        let path = path.into();
        let instance_id = instance_id.into();

        Ok(Self {
            key: normalize_key(&path),
            writer: AtomicWriter::new(instance_id.clone()),
            path,
            config,
            instance_id,
            provider,
            mutex: KeyedMutex::global(),
        })
    }

    /// Serialize through `table` instead of the process-wide lock table.
    ///
    /// Two stores with separate tables behave like two processes: only the
    /// cross-process lock orders them.
    pub fn with_mutex_table(mut self, table: Arc<KeyedMutex>) -> Self {
        self.mutex = table;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    fn limits(&self) -> MutexLimits {
        MutexLimits {
            timeout: self.config.mutex_timeout(),
            max_queue_depth: self.config.mutex_max_queue_depth,
        }
    }

    /// Read the document. `None` if the file is absent or empty.
    pub async fn read(&self) -> Result<Option<Value>> {
        self.mutex
            .run_exclusive(&self.key, self.limits(), || async move {
                let handle = self.provider.acquire(&self.path).await?;
                let result = read_document(&self.path).await;
                self.provider.release(handle).await;
                result
            })
            .await
    }

    /// Replace the document with `content`.
    ///
    /// Each attempt takes the lock, commits atomically and releases. Failed
    /// commits are retried after `write_retry_delay_ms * attempt`; once
    /// `write_retries` attempts have failed the call returns `WriteFailed`
    /// with the last error. Failing to get the lock at all is not retried
    /// here: `LockTimeout` is returned as is.
    pub async fn write<T: Serialize + ?Sized>(&self, content: &T) -> Result<()> {
        let bytes = serialize_document(content)?;

        self.mutex
            .run_exclusive(&self.key, self.limits(), || async move {
                let mut attempt = 0;

                loop {
                    attempt += 1;
                    match self.write_attempt(&bytes).await {
                        WriteOutcome::Committed => {
                            debug!(path = %self.path.display(), attempt, "write committed");
                            return Ok(());
                        }
                        WriteOutcome::Fatal(e) => return Err(e),
                        WriteOutcome::Retryable(e) => {
                            if attempt >= self.config.write_retries {
                                error!(
                                    path = %self.path.display(),
                                    attempts = attempt,
                                    error = %e,
                                    "write failed, retries exhausted"
                                );
                                return Err(StoreError::WriteFailed {
                                    path: self.path.clone(),
                                    attempts: attempt,
                                    source: Box::new(e),
                                });
                            }

                            let delay = self.config.write_retry_delay(attempt);
                            warn!(
                                path = %self.path.display(),
                                attempt,
                                delay_ms = delay.as_millis() as u64,
                                error = %e,
                                "write attempt failed, retrying"
                            );
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
            })
            .await
    }

    async fn write_attempt(&self, bytes: &[u8]) -> WriteOutcome {
        let handle = match self.provider.acquire(&self.path).await {
            Ok(handle) => handle,
            // Acquisition has its own retry budget; a timeout is final.
            Err(e) => return WriteOutcome::Fatal(e),
        };

        let result = if self.provider.still_held(&handle).await {
            self.writer.write_bytes(&self.path, bytes).await
        } else {
            Err(StoreError::LockLost {
                path: self.path.clone(),
            })
        };

        self.provider.release(handle).await;
        WriteOutcome::from(result)
    }

    /// Read, transform and write the document under one lock.
    ///
    /// `f` receives the current document (`{}` if absent or unparseable) and
    /// returns the replacement. Holding the lock across the whole sequence is
    /// what keeps concurrent modifiers from losing each other's updates. An
    /// error from `f` is returned as is and nothing is written. The
    /// transaction itself is not retried.
    pub async fn modify<F, E>(&self, f: F) -> std::result::Result<Value, E>
    where
        F: FnOnce(Value) -> std::result::Result<Value, E>,
        E: From<StoreError>,
    {
        self.mutex
            .run_exclusive(&self.key, self.limits(), || async move {
                let handle = self.provider.acquire(&self.path).await?;
                let result = self.modify_locked(&handle, f).await;
                self.provider.release(handle).await;
                result
            })
            .await
    }

    async fn modify_locked<F, E>(&self, handle: &P::Handle, f: F) -> std::result::Result<Value, E>
    where
        F: FnOnce(Value) -> std::result::Result<Value, E>,
        E: From<StoreError>,
    {
        let current = match read_document(&self.path).await {
            Ok(Some(doc)) => doc,
            Ok(None) => Value::Object(Map::new()),
            Err(e @ StoreError::Parse { .. }) => {
                warn!(path = %self.path.display(), error = %e, "unparseable document, modifying from empty");
                Value::Object(Map::new())
            }
            Err(e) => return Err(e.into()),
        };

        let updated = f(current)?;

        if !self.provider.still_held(handle).await {
            return Err(StoreError::LockLost {
                path: self.path.clone(),
            }
            .into());
        }
        self.writer.write(&self.path, &updated).await?;
        debug!(path = %self.path.display(), "modify committed");
        Ok(updated)
    }

    /// Existence, size, modification time and lock state. Never fails.
    pub async fn status(&self) -> StoreStatus {
        let is_locked_by_other = self.provider.is_held_by_other(&self.path).await;
        collect_status(&self.path, is_locked_by_other).await
    }
}

/// Read and parse the document at `path`.
///
/// A missing file and an empty placeholder both read as `None`.
pub(crate) async fn read_document(path: &Path) -> Result<Option<Value>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(StoreError::io(
                format!("failed to read '{}'", path.display()),
                e,
            ));
        }
    };

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| StoreError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
}
