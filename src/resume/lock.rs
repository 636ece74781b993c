//! Run lock preventing two downloads into the same data directory
//!
//! Advisory lock via fd-lock, held until the [`RunLock`] is dropped.

use super::state::ResumeError;
use fd_lock::RwLock;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Exclusive lock over a data directory
pub struct RunLock {
    #[allow(dead_code)]
    lock: RwLock<File>,
    path: PathBuf,
}

impl RunLock {
    /// Try to acquire the lock file at `path` without blocking
    ///
    /// Returns [`ResumeError::AlreadyRunning`] immediately if another process
    /// holds it.
    pub fn try_acquire(path: &Path) -> Result<Self, ResumeError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ResumeError::IoError(e.to_string()))?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| ResumeError::LockError(format!("Failed to open lock file: {e}")))?;

        let mut lock = RwLock::new(file);

        // The lock lives as long as the file handle, not the guard
        let guard = lock
            .try_write()
            .map_err(|_| ResumeError::AlreadyRunning(path.to_path_buf()))?;
        std::mem::forget(guard);

        debug!(path = %path.display(), "Acquired run lock");
        Ok(Self {
            lock,
            path: path.to_path_buf(),
        })
    }

    /// Lock file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}
