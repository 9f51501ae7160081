//! batchpress - batched publishing for a shared git working copy
//!
//! Many writers commit to one long-lived clone of a content repository;
//! the expensive, externally visible push (which triggers a deploy) waits
//! for an explicit publish that sends every pending commit at once.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Reconcile, serialize, commit, track pending, publish
//! - [`core`] - Domain types, configuration, paths, and the file lock
//! - [`git`] - Single interface for all Git operations
//! - [`ui`] - User-facing output
//!
//! # Correctness Invariants
//!
//! 1. Only one writer touches the working copy at a time
//! 2. A batch lands as exactly one commit, or not at all
//! 3. Pending commits are derived from refs, never stored
//! 4. Publishing never force-pushes and never drops local commits
//! 5. The only lossy path is the documented conflict reset, and it is
//!    always reported

pub mod cli;
pub mod core;
pub mod engine;
pub mod git;
pub mod ui;
