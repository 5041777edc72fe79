//! In-process serialization of operations on the same document.
//!
//! One lock table per process (see [`KeyedMutex::global`]). Entries are
//! created lazily per normalized path and live for the rest of the process;
//! the number of keys is bounded by the number of documents in use.
//!
//! The table provides exclusivity and bounded waiting, not fairness. A caller
//! that times out leaves the queue without disturbing the operation currently
//! running or the callers behind it.

use crate::error::{Result, StoreError};
use std::collections::HashMap;
use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

static GLOBAL: LazyLock<Arc<KeyedMutex>> = LazyLock::new(|| Arc::new(KeyedMutex::new()));

/// Bounds applied to one `run_exclusive` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutexLimits {
    /// Longest a caller waits for its turn.
    pub timeout: Duration,
    /// Maximum callers queued or running per key, this one included.
    pub max_queue_depth: usize,
}

#[derive(Debug, Default)]
struct Entry {
    lock: Arc<AsyncMutex<()>>,
    pending: AtomicUsize,
}

/// A table of per-path async mutexes.
#[derive(Debug, Default)]
pub struct KeyedMutex {
    entries: Mutex<HashMap<PathBuf, Arc<Entry>>>,
}

/// Proof that the caller has its key to itself. Dropping it lets the next caller in.
#[derive(Debug)]
pub struct KeyGuard {
    key: PathBuf,
    _slot: Slot,
    _guard: OwnedMutexGuard<()>,
}

impl KeyGuard {
    pub fn key(&self) -> &Path {
        &self.key
    }
}

/// A reserved place in a key's queue; frees it on drop.
#[derive(Debug)]
struct Slot(Arc<Entry>);

impl Drop for Slot {
    fn drop(&mut self) {
        self.0.pending.fetch_sub(1, Ordering::SeqCst);
    }
}

impl KeyedMutex {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide table.
    pub fn global() -> Arc<KeyedMutex> {
        Arc::clone(&GLOBAL)
    }

    fn entry(&self, key: &Path) -> Arc<Entry> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(entries.entry(key.to_path_buf()).or_default())
    }

    /// Number of callers currently queued or running for `key`.
    pub fn pending(&self, key: &Path) -> usize {
        let key = normalize_key(key);
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(&key)
            .map(|e| e.pending.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Wait for exclusive use of `key`.
    ///
    /// Fails with `QueueFull` if `max_queue_depth` callers are already
    /// queued or running, and with `MutexTimeout` if the turn does not come
    /// within `timeout`.
    pub async fn enter(&self, key: &Path, limits: MutexLimits) -> Result<KeyGuard> {
        let key = normalize_key(key);
        let entry = self.entry(&key);

        let reserved = entry
            .pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < limits.max_queue_depth).then_some(n + 1)
            });
        if let Err(depth) = reserved {
            return Err(StoreError::QueueFull { key, depth });
        }
        let slot = Slot(Arc::clone(&entry));

        match tokio::time::timeout(limits.timeout, Arc::clone(&entry.lock).lock_owned()).await {
            Ok(guard) => Ok(KeyGuard {
                key,
                _slot: slot,
                _guard: guard,
            }),
            Err(_) => {
                debug!(key = %key.display(), "timed out waiting for queued operations");
                Err(StoreError::MutexTimeout {
                    key,
                    waited_ms: limits.timeout.as_millis() as u64,
                })
            }
        }
    }

    /// Run `operation` once every earlier operation on `key` has finished.
    ///
    /// Entry failures (`QueueFull`, `MutexTimeout`) convert into the
    /// operation's error type; the operation's own errors pass through as is.
    pub async fn run_exclusive<T, E, F, Fut>(
        &self,
        key: &Path,
        limits: MutexLimits,
        operation: F,
    ) -> std::result::Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: From<StoreError>,
    {
        let _guard = self.enter(key, limits).await?;
        operation().await
    }
}

/// Normalize a document path into a lock-table key.
///
/// The path is made absolute, `.` and `..` are resolved lexically, and the
/// parent directory is canonicalized when it exists so symlinked spellings
/// of one file share a key.
pub fn normalize_key(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }

    if let (Some(parent), Some(name)) = (normalized.parent(), normalized.file_name())
        && let Ok(canonical) = std::fs::canonicalize(parent)
    {
        return canonical.join(name);
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;
    use tempfile::TempDir;

    fn limits() -> MutexLimits {
        MutexLimits {
            timeout: Duration::from_secs(10),
            max_queue_depth: 100,
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_same_key_runs_one_at_a_time() {
        let table = Arc::new(KeyedMutex::new());
        let counter = Arc::new(AtomicU64::new(0));
        let key = PathBuf::from("/tmp/lockstore-test/a.json");

        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let table = Arc::clone(&table);
                let counter = Arc::clone(&counter);
                let key = key.clone();
                tokio::spawn(async move {
                    table
                        .run_exclusive(&key, limits(), || async {
                            // Read, yield, write: loses updates without exclusion
                            let seen = counter.load(Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(2)).await;
                            counter.store(seen + 1, Ordering::SeqCst);
                            Ok::<_, StoreError>(())
                        })
                        .await
                        .unwrap();
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 10);
        assert_eq!(table.pending(&key), 0);
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_contend() {
        let table = KeyedMutex::new();
        let _held = table.enter(Path::new("/tmp/x/a.json"), limits()).await.unwrap();

        let quick = MutexLimits {
            timeout: Duration::from_millis(50),
            ..limits()
        };
        let other = table.enter(Path::new("/tmp/x/b.json"), quick).await;
        assert!(other.is_ok());
    }

    #[tokio::test]
    async fn test_waiter_times_out_without_disturbing_holder() {
        let table = Arc::new(KeyedMutex::new());
        let key = PathBuf::from("/tmp/x/slow.json");
        let held = table.enter(&key, limits()).await.unwrap();

        let quick = MutexLimits {
            timeout: Duration::from_millis(30),
            ..limits()
        };
        let err = table.enter(&key, quick).await.unwrap_err();
        assert!(matches!(err, StoreError::MutexTimeout { waited_ms: 30, .. }));
        assert_eq!(table.pending(&key), 1);

        drop(held);
        assert!(table.enter(&key, quick).await.is_ok());
    }

    #[tokio::test]
    async fn test_queue_depth_is_bounded() {
        let table = KeyedMutex::new();
        let key = PathBuf::from("/tmp/x/busy.json");
        let shallow = MutexLimits {
            timeout: Duration::from_secs(1),
            max_queue_depth: 1,
        };

        let held = table.enter(&key, shallow).await.unwrap();
        let err = table.enter(&key, shallow).await.unwrap_err();
        assert!(matches!(err, StoreError::QueueFull { depth: 1, .. }));

        drop(held);
        assert!(table.enter(&key, shallow).await.is_ok());
    }

    #[tokio::test]
    async fn test_operation_error_passes_through_and_frees_key() {
        #[derive(Debug)]
        enum AppError {
            Store,
            Rejected(&'static str),
        }
        impl From<StoreError> for AppError {
            fn from(_: StoreError) -> Self {
                AppError::Store
            }
        }

        let table = KeyedMutex::new();
        let key = Path::new("/tmp/x/err.json");

        let result: std::result::Result<(), AppError> = table
            .run_exclusive(key, limits(), || async { Err(AppError::Rejected("nope")) })
            .await;
        assert!(matches!(result, Err(AppError::Rejected("nope"))));
        assert_eq!(table.pending(key), 0);
    }

    #[test]
    fn test_normalize_key_resolves_dots() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join("sub")).unwrap();

        let plain = normalize_key(&temp_dir.path().join("a.json"));
        let dotted = normalize_key(&temp_dir.path().join(".").join("a.json"));
        let parent = normalize_key(&temp_dir.path().join("sub").join("..").join("a.json"));

        assert_eq!(plain, dotted);
        assert_eq!(plain, parent);
        assert!(plain.is_absolute());
    }

    #[test]
    fn test_normalize_key_distinguishes_files() {
        let temp_dir = TempDir::new().unwrap();
        assert_ne!(
            normalize_key(&temp_dir.path().join("a.json")),
            normalize_key(&temp_dir.path().join("b.json"))
        );
    }

    #[test]
    fn test_global_table_is_shared() {
        assert!(Arc::ptr_eq(&KeyedMutex::global(), &KeyedMutex::global()));
    }
}
