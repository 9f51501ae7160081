//! engine::commit
//!
//! The commit batcher: write a [`MutationBatch`] into the working copy,
//! stage exactly those paths, and create one local commit.
//!
//! # Invariants
//!
//! - A batch with no net change against HEAD creates no commit
//! - If any file write fails, every touched path is restored from HEAD
//!   and nothing is staged
//! - If staging or committing fails, the touched paths are restored and the
//!   index and tree are forced back to HEAD; files HEAD does not have are
//!   deleted, so the next caller sees a clean tree at the last good commit

use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::batch::{Change, MutationBatch};
use super::error::EngineError;
use super::gate::GateGuard;
use crate::core::types::{Author, ContentPath, Oid};
use crate::git::{Git, StagedPath};

/// An immutable record of one commit created by the batcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalCommit {
    pub sha: Oid,
    pub message: String,
    pub author_name: String,
    pub author_email: String,
    pub timestamp: DateTime<Utc>,
    pub paths: Vec<ContentPath>,
}

/// Result of committing a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// A new local commit now sits on the branch, pending publication.
    Committed(LocalCommit),
    /// The batch matched the current tree; no commit was created.
    NoOp,
    /// Local-only mode: files were written, there is nothing to publish.
    Offline,
}

impl CommitOutcome {
    pub fn commit(&self) -> Option<&LocalCommit> {
        match self {
            CommitOutcome::Committed(commit) => Some(commit),
            _ => None,
        }
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, CommitOutcome::NoOp)
    }
}

/// Write, stage, and commit `batch` on the checked-out branch.
pub(crate) fn commit_batch(
    git: &Git,
    _guard: &GateGuard<'_>,
    batch: &MutationBatch,
    message: &str,
    author: &Author,
) -> Result<CommitOutcome, EngineError> {
    let effective = net_changes(git, batch)?;
    if effective.is_empty() {
        tracing::debug!(paths = batch.len(), "batch has no net change");
        return Ok(CommitOutcome::NoOp);
    }

    let work_dir = git.work_dir().map_err(EngineError::corrupt)?.to_path_buf();
    let mut touched: Vec<ContentPath> = Vec::with_capacity(effective.len());
    for (path, change) in &effective {
        touched.push((*path).clone());
        let result = match change {
            Change::Write(content) => write_file_atomic(&work_dir, path, content),
            Change::Delete => remove_file(&work_dir, path),
        };
        if let Err(err) = result {
            tracing::warn!(path = %path, error = %err, "write failed, restoring touched paths");
            git.restore_paths(&touched).map_err(EngineError::corrupt)?;
            return Err(EngineError::Write {
                path: path.to_string(),
                message: err.to_string(),
            });
        }
    }

    let staged: Vec<StagedPath> = effective
        .iter()
        .map(|(path, change)| match change {
            Change::Write(_) => StagedPath::Upsert((*path).clone()),
            Change::Delete => StagedPath::Remove((*path).clone()),
        })
        .collect();

    let sha = match git.stage_and_commit(&staged, message, author) {
        Ok(sha) => sha,
        Err(err) => {
            tracing::warn!(error = %err, "commit failed, restoring touched paths");
            roll_back_staging(git, &work_dir, &touched)?;
            return Err(EngineError::commit(err));
        }
    };

    // The commit exists from here on; build the record from what we already
    // know rather than reading it back.
    tracing::info!(sha = %sha.short(8), paths = touched.len(), "created local commit");

    Ok(CommitOutcome::Committed(LocalCommit {
        sha,
        message: message.to_string(),
        author_name: author.name.clone(),
        author_email: author.email.clone(),
        timestamp: Utc::now(),
        paths: touched,
    }))
}

/// Put the index and tree back to HEAD after a failed stage or commit.
///
/// Every step is attempted even if an earlier one fails. Touched paths
/// that HEAD does not have are then removed straight from disk, so no
/// uncommitted file outlives the batch. Only a tree that is still dirty
/// afterwards is reported as corruption.
fn roll_back_staging(
    git: &Git,
    work_dir: &Path,
    touched: &[ContentPath],
) -> Result<(), EngineError> {
    let steps = [
        ("restore touched paths", git.restore_paths(touched)),
        ("reset index", git.reset_index_to_head()),
        ("check out HEAD", git.checkout_head_clean()),
    ];
    let mut failed = None;
    for (step, result) in steps {
        if let Err(err) = result {
            tracing::warn!(step, error = %err, "rollback step failed");
            if failed.is_none() {
                failed = Some(err);
            }
        }
    }

    for path in touched {
        if git.head_blob(path).map_err(EngineError::corrupt)?.is_none() {
            remove_file(work_dir, path).map_err(|e| EngineError::CorruptRepository {
                message: format!("cannot remove {path} after failed commit: {e}"),
            })?;
        }
    }

    match failed {
        Some(err) => {
            let status = git.worktree_status(false).map_err(EngineError::corrupt)?;
            if status.is_clean() {
                Ok(())
            } else {
                Err(EngineError::corrupt(err))
            }
        }
        None => Ok(()),
    }
}

/// Changes in `batch` that differ from HEAD, in batch order.
fn net_changes<'b>(
    git: &Git,
    batch: &'b MutationBatch,
) -> Result<Vec<(&'b ContentPath, &'b Change)>, EngineError> {
    let mut effective = Vec::new();
    for (path, change) in batch.iter() {
        let current = git.head_blob(path).map_err(EngineError::corrupt)?;
        let differs = match change {
            Change::Write(content) => {
                current != Some(Git::hash_blob(content).map_err(EngineError::commit)?)
            }
            Change::Delete => current.is_some(),
        };
        if differs {
            effective.push((path, change));
        }
    }
    Ok(effective)
}

/// Write `content` to `path` under `root` via a temp file and rename.
pub(crate) fn write_file_atomic(
    root: &Path,
    path: &ContentPath,
    content: &[u8],
) -> std::io::Result<()> {
    let target = path.under(root);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut temp_name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    temp_name.push(".bp-tmp");
    let temp = target.with_file_name(temp_name);

    let result = (|| {
        let mut out = fs::File::create(&temp)?;
        out.write_all(content)?;
        out.sync_all()?;
        fs::rename(&temp, &target)
    })();
    if result.is_err() {
        let _ = fs::remove_file(&temp);
    }
    result
}

/// Remove `path` under `root`. Already-absent files are fine.
pub(crate) fn remove_file(root: &Path, path: &ContentPath) -> std::io::Result<()> {
    match fs::remove_file(path.under(root)) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
