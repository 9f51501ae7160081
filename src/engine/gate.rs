//! engine::gate
//!
//! Exclusive-access gate around every operation that writes to the working
//! copy (reconcile, stage, commit, push).
//!
//! # Architecture
//!
//! Two layers, always taken in the same order:
//!
//! 1. An in-process FIFO queue, so threads of this process are admitted in
//!    arrival order.
//! 2. The OS file lock ([`RepoLock`]), so a second process pointed at the
//!    same clone waits too.
//!
//! Both waits share one deadline. If it passes, the caller gets
//! [`EngineError::Busy`] and nothing is queued on its behalf.
//!
//! # Invariants
//!
//! - At most one [`GateGuard`] exists per gate at any time
//! - Dropping the guard releases both layers, on every exit path
//! - Read-only queries never touch the gate
//!
//! # Example
//!
//! ```ignore
//! let gate = Gate::new(paths.lock_path(), Duration::from_secs(15));
//! let guard = gate.acquire()?;
//! reconcile(&guard, ...)?;
//! // guard dropped: next waiter admitted
//! ```

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::error::EngineError;
use crate::core::ops::lock::{LockError, RepoLock};

#[derive(Debug, Default)]
struct Queue {
    next_ticket: u64,
    waiting: VecDeque<u64>,
    held: bool,
}

/// The mutation serializer for one working copy.
#[derive(Debug)]
pub struct Gate {
    lock_path: PathBuf,
    timeout: Duration,
    queue: Mutex<Queue>,
    admitted: Condvar,
}

/// Proof of exclusive access. Functions that mutate the working copy take a
/// `&GateGuard` so they cannot be called without it.
#[derive(Debug)]
pub struct GateGuard<'a> {
    gate: &'a Gate,
    /// Taken in `drop` so the flock is free before the next ticket runs.
    file_lock: Option<RepoLock>,
}

impl Gate {
    pub fn new(lock_path: PathBuf, timeout: Duration) -> Self {
        Self {
            lock_path,
            timeout,
            queue: Mutex::new(Queue::default()),
            admitted: Condvar::new(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Wait (bounded) for exclusive access.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Busy`] if the deadline passes while queued or while
    ///   another process holds the file lock
    /// - [`EngineError::CorruptRepository`] if the lock file cannot be created
    pub fn acquire(&self) -> Result<GateGuard<'_>, EngineError> {
        let started = Instant::now();
        let deadline = started + self.timeout;

        self.enter(deadline).ok_or_else(|| EngineError::Busy {
            waited: started.elapsed(),
        })?;

        match RepoLock::acquire_until(&self.lock_path, deadline) {
            Ok(file_lock) => {
                tracing::debug!(waited_ms = started.elapsed().as_millis() as u64, "gate acquired");
                Ok(GateGuard {
                    gate: self,
                    file_lock: Some(file_lock),
                })
            }
            Err(err) => {
                self.leave();
                Err(match err {
                    LockError::AlreadyLocked => EngineError::Busy {
                        waited: started.elapsed(),
                    },
                    other => EngineError::CorruptRepository {
                        message: other.to_string(),
                    },
                })
            }
        }
    }

    /// Whether some caller currently holds the gate in this process.
    pub fn is_held(&self) -> bool {
        self.lock_queue().held
    }

    fn lock_queue(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take a ticket and wait for our turn. Returns `None` on timeout, with
    /// the ticket withdrawn.
    fn enter(&self, deadline: Instant) -> Option<()> {
        let mut queue = self.lock_queue();
        let ticket = queue.next_ticket;
        queue.next_ticket += 1;
        queue.waiting.push_back(ticket);

        loop {
            if !queue.held && queue.waiting.front() == Some(&ticket) {
                queue.waiting.pop_front();
                queue.held = true;
                return Some(());
            }

            let now = Instant::now();
            if now >= deadline {
                queue.waiting.retain(|t| *t != ticket);
                drop(queue);
                // The next ticket may have been waiting behind us.
                self.admitted.notify_all();
                return None;
            }

            queue = self
                .admitted
                .wait_timeout(queue, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    fn leave(&self) {
        self.lock_queue().held = false;
        self.admitted.notify_all();
    }
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        drop(self.file_lock.take());
        self.gate.leave();
    }
}
