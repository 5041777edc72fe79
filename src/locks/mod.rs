//! Cross-process locking for lockstore.
//!
//! # Lock Files
//!
//! The lock for a document at `<path>` is the marker file `<path>.lock`,
//! created with **create_new** semantics (exclusive create) so that only one
//! process can hold it at a time.
//!
//! # Lock Metadata
//!
//! Each marker contains JSON metadata:
//! - `owner`: The owner of the lock (e.g., `user@HOST`)
//! - `pid`: The process ID
//! - `instance`: The store instance holding the lock
//! - `token`: Unique per acquisition
//! - `acquired_at` / `heartbeat_at`: RFC3339 timestamps
//!
//! # Staleness
//!
//! A holder refreshes `heartbeat_at` in the background. A marker whose
//! heartbeat is older than the stale threshold belongs to a dead (or hung)
//! holder and is taken over by the next acquirer. Takeover, refresh and
//! release run under an OS advisory lock on `<path>.lock.gate`, which makes
//! "check stale, then replace" a single step.
//!
//! # Release
//!
//! Release is idempotent and never fails; a handle dropped without release
//! gives the lock back and logs any error. Drop never waits on a busy gate:
//! it hands that case to the blocking pool.

mod backoff;
mod gate;
mod handle;
mod metadata;
mod operations;
mod provider;
mod types;


pub use backoff::Backoff;
pub use handle::LockHandle;
pub use metadata::{LockMetadata, Marker, age_string};
pub use operations::{acquire, clear_stale, inspect, is_held_by_other, lock_path_for};
pub use provider::{FileLockProvider, LockProvider};
pub use types::LockInfo;
