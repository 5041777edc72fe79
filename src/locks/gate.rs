//! OS-level gate around mutations of an existing lock marker.
//!
//! Creating an absent marker is atomic on its own (exclusive create). Taking
//! over a stale marker, refreshing a heartbeat and releasing all involve a
//! read followed by a write, so they run while holding an exclusive advisory
//! lock on `<path>.lock.gate`. The OS drops that lock when its holder dies,
//! so the gate itself can never go stale. The gate file is never deleted.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

pub(super) struct Gate {
    file: File,
}

impl Gate {
    /// Block until the gate at `gate_path` is held exclusively.
    pub(super) fn lock(gate_path: &Path) -> io::Result<Self> {
        let file = open(gate_path)?;
        file.lock_exclusive()?;
        Ok(Self { file })
    }

    /// Take the gate only if nobody holds it. `Ok(None)` when it is busy.
    pub(super) fn try_lock(gate_path: &Path) -> io::Result<Option<Self>> {
        let file = open(gate_path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self { file })),
            Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn open(gate_path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(gate_path)
}

impl Drop for Gate {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
