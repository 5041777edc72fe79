//! Typed documents with defaults.
//!
//! [`DocumentStore`] sits on top of [`TransactionalStore`] for callers that
//! work with one concrete type. A missing document reads as a copy of the
//! default; keys the default has but the stored document lacks are filled in
//! on every read, so adding a field to the type needs no migration step.
//!
//! Reads never fail at this layer. Writes always report failure.

mod merge;


pub use merge::backfill_defaults;

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::locks::{FileLockProvider, LockProvider};
use crate::store::{StoreStatus, TransactionalStore};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use tracing::warn;

/// A typed view of one shared JSON document.
pub struct DocumentStore<T, P: LockProvider = FileLockProvider> {
    store: TransactionalStore<P>,
    default: T,
    default_value: Value,
    current: Mutex<Option<T>>,
}

impl<T> DocumentStore<T, FileLockProvider>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    /// Open the document at `path`, falling back to `default`.
    pub fn new(path: impl Into<PathBuf>, config: StoreConfig, default: T) -> Result<Self> {
        Self::from_store(TransactionalStore::new(path, config)?, default)
    }
}

impl<T, P> DocumentStore<T, P>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync,
    P: LockProvider,
{
    /// Wrap an existing transactional store.
    pub fn from_store(store: TransactionalStore<P>, default: T) -> Result<Self> {
        let default_value = serde_json::to_value(&default).map_err(StoreError::Serialize)?;
        Ok(Self {
            store,
            default,
            default_value,
            current: Mutex::new(None),
        })
    }

    /// The underlying transactional store.
    pub fn store(&self) -> &TransactionalStore<P> {
        &self.store
    }

    /// Load the document, with defaults filled in.
    ///
    /// Any failure (lock contention, I/O, bad JSON, a shape that does not fit
    /// `T`) is logged and yields a fresh copy of the default. Only successful
    /// loads replace the in-memory document.
    pub async fn read(&self) -> T {
        let loaded = match self.store.read().await {
            Ok(Some(value)) => self.decode(value),
            Ok(None) => Ok(self.default.clone()),
            Err(e) => Err(e),
        };

        match loaded {
            Ok(doc) => {
                self.set_current(doc.clone());
                doc
            }
            Err(e) => {
                warn!(path = %self.store.path().display(), error = %e, "read failed, using default document");
                self.default.clone()
            }
        }
    }

    /// The in-memory document: the last one read, replaced or written.
    pub fn current(&self) -> Option<T> {
        self.lock_current().clone()
    }

    /// Set the in-memory document without persisting it.
    pub fn replace(&self, doc: T) {
        self.set_current(doc);
    }

    /// Persist the in-memory document.
    ///
    /// If nothing has been read or replaced yet, the document is loaded
    /// first; a load failure is returned instead of writing the default over
    /// whatever is on disk.
    pub async fn write(&self) -> Result<()> {
        let doc = match self.current() {
            Some(doc) => doc,
            None => {
                let doc = match self.store.read().await? {
                    Some(value) => self.decode(value)?,
                    None => self.default.clone(),
                };
                self.set_current(doc.clone());
                doc
            }
        };
        self.store.write(&doc).await
    }

    /// Transform the stored document under the cross-process lock.
    ///
    /// `f` sees the document with defaults filled in. A stored document that
    /// does not fit `T` is logged and replaced by the default.
    pub async fn modify<F, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(T) -> std::result::Result<T, E>,
        E: From<StoreError>,
    {
        let mut updated = None;

        self.store
            .modify(|value| {
                let doc = self.decode(value).unwrap_or_else(|e| {
                    warn!(path = %self.store.path().display(), error = %e, "stored document does not fit, modifying default");
                    self.default.clone()
                });
                let next = f(doc)?;
                let encoded = serde_json::to_value(&next).map_err(StoreError::Serialize)?;
                updated = Some(next);
                Ok::<_, E>(encoded)
            })
            .await?;

        match updated {
            Some(doc) => {
                self.set_current(doc.clone());
                Ok(doc)
            }
            None => Err(StoreError::io(
                format!("modify of '{}' produced no document", self.store.path().display()),
                std::io::Error::other("transform did not run"),
            )
            .into()),
        }
    }

    /// See [`TransactionalStore::status`].
    pub async fn status(&self) -> StoreStatus {
        self.store.status().await
    }

    fn decode(&self, value: Value) -> Result<T> {
        let merged = backfill_defaults(value, &self.default_value);
        serde_json::from_value(merged).map_err(|e| StoreError::Parse {
            path: self.store.path().to_path_buf(),
            source: e,
        })
    }

    fn lock_current(&self) -> std::sync::MutexGuard<'_, Option<T>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_current(&self, doc: T) {
        *self.lock_current() = Some(doc);
    }
}
