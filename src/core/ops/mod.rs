//! core::ops
//!
//! Cross-process locking for the working copy.
//!
//! Every mutating engine operation:
//! 1. Takes the in-process gate ([`crate::engine::gate`])
//! 2. Takes the exclusive [`RepoLock`] on the working copy
//! 3. Mutates, then releases both on drop

pub mod lock;

pub use lock::{LockError, RepoLock};
