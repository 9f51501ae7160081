//! engine::error
//!
//! Failure taxonomy at the engine boundary.
//!
//! Every engine operation either succeeds with a typed outcome or fails with
//! one of these variants. No variant leaves the working copy half-written:
//! by the time an error is returned, the tree matches the last good commit.

use std::time::Duration;

use thiserror::Error;

use crate::core::config::ConfigError;
use crate::core::types::TypeError;
use crate::git::GitError;

/// Errors returned by the publish engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Exclusive access was not granted within the configured wait.
    #[error("working copy is busy (waited {waited:?}); try again")]
    Busy { waited: Duration },

    /// A file in the batch could not be written. Nothing was staged.
    #[error("failed to write {path}: {message}")]
    Write { path: String, message: String },

    /// Staging or committing failed after the files were written.
    #[error("failed to commit: {message}")]
    Commit { message: String },

    /// The remote moved since the last reconciliation.
    #[error("push rejected by remote: {message}")]
    Rejected { message: String },

    /// Network or remote failure. Local commits are untouched.
    #[error("remote unavailable: {message}")]
    Unavailable { message: String },

    /// The clone itself is damaged and must be re-cloned.
    #[error("working copy is corrupt: {message}")]
    CorruptRepository { message: String },

    /// A content file could not be read.
    #[error("failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid content path: {0}")]
    InvalidPath(#[from] TypeError),
}

impl EngineError {
    /// Whether the same call may succeed if simply tried again later.
    ///
    /// `Rejected` is retryable only after re-reconciling, which
    /// [`crate::engine::ContentStore::publish`] does itself.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::Busy { .. }
                | EngineError::Write { .. }
                | EngineError::Commit { .. }
                | EngineError::Rejected { .. }
                | EngineError::Unavailable { .. }
        )
    }

    /// Stable machine-readable name, used in audit entries and JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Busy { .. } => "busy",
            EngineError::Write { .. } => "write_error",
            EngineError::Commit { .. } => "commit_error",
            EngineError::Rejected { .. } => "rejected",
            EngineError::Unavailable { .. } => "unavailable",
            EngineError::CorruptRepository { .. } => "corrupt_repository",
            EngineError::Read { .. } => "read_error",
            EngineError::Config(_) => "config_error",
            EngineError::InvalidPath(_) => "invalid_path",
        }
    }

    pub(crate) fn corrupt(err: GitError) -> Self {
        EngineError::CorruptRepository {
            message: err.to_string(),
        }
    }

    pub(crate) fn commit(err: GitError) -> Self {
        EngineError::Commit {
            message: err.to_string(),
        }
    }

    pub(crate) fn from_remote(err: GitError) -> Self {
        match err {
            GitError::PushRejected { message } => EngineError::Rejected { message },
            GitError::RemoteUnavailable { message } => EngineError::Unavailable { message },
            other => EngineError::corrupt(other),
        }
    }
}
