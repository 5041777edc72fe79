//! Lockstore: transactional JSON documents shared between processes.
//!
//! A document is a JSON file that several processes (and several tasks
//! within each process) read and rewrite concurrently. Every operation is
//! serialized twice: first by an in-process queue keyed on the document path
//! ([`keyed_mutex`]), then by a lock marker next to the file ([`locks`]).
//! Commits go through a temp file and an atomic rename ([`fs`]), so readers
//! only ever see a complete document.
//!
//! Most callers want [`TransactionalStore`] for raw JSON or [`DocumentStore`]
//! for a typed document with defaults.

pub mod config;
pub mod document;
pub mod error;
pub mod exit_codes;
pub mod fs;
pub mod keyed_mutex;
pub mod locks;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::StoreConfig;
pub use document::DocumentStore;
pub use error::{Result, StoreError};
pub use store::{StoreStatus, TransactionalStore};
