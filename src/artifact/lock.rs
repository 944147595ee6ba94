//! Filesystem advisory lock guarding the index's read-modify-write cycle
//! (spec §4.1 "readIndex()/writeIndex()... writers must hold the lock for
//! the entire read-modify-write cycle"). Grounded on
//! `bundling/bundler.rs`'s singleton `fd_lock::RwLock` usage, generalized
//! from a process-singleton lock into a scoped, reusable index lock.

use std::fs::File;
use std::path::{Path, PathBuf};

use fd_lock::{RwLock, RwLockWriteGuard};

use crate::error::WreckitError;

/// Owns the lock file handle for `<root>/.wreckit/index.lock`. Acquire a
/// write guard for the duration of a read-modify-write cycle; the guard's
/// `Drop` releases the advisory lock.
pub struct IndexLock {
    inner: RwLock<File>,
    path: PathBuf,
}

impl IndexLock {
    pub fn open(root: &Path) -> Result<Self, WreckitError> {
        let wreckit_dir = root.join(".wreckit");
        std::fs::create_dir_all(&wreckit_dir)?;
        let path = wreckit_dir.join("index.lock");
        let file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .open(&path)?;
        Ok(Self {
            inner: RwLock::new(file),
            path,
        })
    }

    /// Block until the lock is acquired, then return a guard scoped to
    /// this borrow. The caller performs the full read-modify-write cycle
    /// before dropping the guard.
    pub fn acquire_write(&mut self) -> Result<RwLockWriteGuard<'_, File>, WreckitError> {
        self.inner.write().map_err(|e| {
            WreckitError::Conflict(format!(
                "failed to acquire index write lock at {}: {e}",
                self.path.display()
            ))
        })
    }
}
