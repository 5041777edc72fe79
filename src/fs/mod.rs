//! Filesystem layer for lockstore.
//!
//! Atomic document commits and discovery of the temp artifacts an
//! interrupted commit leaves behind.

pub mod atomic;
mod orphans;

pub use atomic::{AtomicWriter, backup_path_for, serialize_document};
pub use orphans::{OrphanTempFile, find_orphan_temp_files, remove_orphan_temp_files};
