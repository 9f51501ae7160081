//! core::ops::lock
//!
//! Exclusive OS-level lock on the working copy.
//!
//! # Architecture
//!
//! The file lock keeps other processes (a second server worker, an operator
//! running `bp` by hand) from touching the clone while this process mutates
//! it. Serialization between threads of the same process is the job of the
//! [`crate::engine::gate`]; this lock is taken underneath it.
//!
//! # Invariants
//!
//! - Lock is automatically released on drop (RAII pattern)
//! - `acquire` is non-blocking; `acquire_until` polls until a deadline
//! - The lock file itself is never deleted, only unlocked
//!
//! # Example
//!
//! ```ignore
//! use batchpress::core::ops::lock::RepoLock;
//!
//! let lock = RepoLock::acquire(&paths.lock_path())?;
//! // ... mutate the working copy ...
//! drop(lock);
//! ```

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;
use thiserror::Error;

/// Poll interval while waiting for another process to release the lock.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another process already holds the lock.
    #[error("working copy is locked by another process")]
    AlreadyLocked,

    /// Failed to create lock file or directory.
    #[error("failed to create lock: {0}")]
    CreateFailed(String),

    /// Failed to acquire the OS lock.
    #[error("failed to acquire lock: {0}")]
    AcquireFailed(String),

    /// Failed to release the lock.
    #[error("failed to release lock: {0}")]
    ReleaseFailed(String),
}

/// An exclusive lock on the working copy.
#[derive(Debug)]
pub struct RepoLock {
    path: PathBuf,
    /// When this is Some, we hold the lock.
    file: Option<File>,
}

impl RepoLock {
    /// Attempt to acquire the lock at `path` without waiting.
    ///
    /// # Errors
    ///
    /// - [`LockError::AlreadyLocked`] if another holder has it
    /// - [`LockError::CreateFailed`] if the lock file cannot be created
    /// - [`LockError::AcquireFailed`] if the OS lock call fails
    pub fn acquire(path: &Path) -> Result<Self, LockError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                LockError::CreateFailed(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| {
                LockError::CreateFailed(format!("cannot open {}: {}", path.display(), e))
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                path: path.to_path_buf(),
                file: Some(file),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Err(LockError::AlreadyLocked),
            Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
                Err(LockError::AlreadyLocked)
            }
            Err(e) => Err(LockError::AcquireFailed(e.to_string())),
        }
    }

    /// Acquire the lock, polling until `deadline`.
    ///
    /// Returns [`LockError::AlreadyLocked`] if the deadline passes first.
    pub fn acquire_until(path: &Path, deadline: Instant) -> Result<Self, LockError> {
        loop {
            match Self::acquire(path) {
                Err(LockError::AlreadyLocked) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(LockError::AlreadyLocked);
                    }
                    std::thread::sleep(POLL_INTERVAL.min(deadline - now));
                }
                other => return other,
            }
        }
    }

    /// Check if the lock is currently held.
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// Get the path to the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock explicitly. Safe to call more than once.
    pub fn release(&mut self) -> Result<(), LockError> {
        if let Some(file) = self.file.take() {
            file.unlock()
                .map_err(|e| LockError::ReleaseFailed(e.to_string()))?;
        }
        Ok(())
    }
}

impl Drop for RepoLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
    }
}
