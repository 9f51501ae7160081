//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the **ONLY doorway** to Git. All history reads and writes
//! of the working copy flow through this interface. No other module should
//! import `git2`.
//!
//! # Responsibilities
//!
//! - Opening and cloning the working copy
//! - Ref operations (resolve, CAS update, delete)
//! - Ancestry queries and pending-commit walks
//! - Replaying commits onto a new base in memory
//! - Staging and committing work tree changes
//! - Fetch and non-forced push with credential callbacks
//!
//! # Invariants
//!
//! - Branch pointers move only through CAS updates
//! - Pushes never force
//! - All operations return strong types (Oid, BranchName, ContentPath)

mod interface;

pub use interface::{
    redact, CommitInfo, Credentials, Git, GitError, GitState, Replay, StagedPath, WorktreeStatus,
};
