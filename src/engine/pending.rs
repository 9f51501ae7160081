//! engine::pending
//!
//! The pending ledger: local commits not yet on the remote branch.
//!
//! Nothing is stored. Every query walks the commits reachable from the
//! local branch tip and not from the last fetched remote-tracking tip, so
//! the answer can be stale (no fetch happens here) but never drifts.
//! Queries do not take the gate.

use serde::{Deserialize, Serialize};

use super::error::EngineError;
use crate::core::config::RemoteSettings;
use crate::core::paths::StorePaths;
use crate::core::types::Oid;
use crate::git::{CommitInfo, Git, GitError};

/// One pending commit, as shown to editors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSummary {
    pub sha: String,
    pub short_sha: String,
    pub message: String,
    pub author: String,
    /// RFC 3339 author date.
    pub date: String,
}

impl From<CommitInfo> for CommitSummary {
    fn from(info: CommitInfo) -> Self {
        Self {
            short_sha: info.oid.short(7).to_string(),
            sha: info.oid.to_string(),
            message: info.summary,
            author: info.author_name,
            date: info.author_time.to_rfc3339(),
        }
    }
}

/// The polling surface: how many commits are waiting, and which.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishStatus {
    pub count: usize,
    pub commits: Vec<CommitSummary>,
}

impl From<Vec<CommitSummary>> for PublishStatus {
    fn from(commits: Vec<CommitSummary>) -> Self {
        Self {
            count: commits.len(),
            commits,
        }
    }
}

/// Pending commits, oldest first. A missing clone has none.
pub(crate) fn unpushed_changes(
    paths: &StorePaths,
    remote: &RemoteSettings,
) -> Result<Vec<CommitSummary>, EngineError> {
    if !paths.is_cloned() {
        return Ok(Vec::new());
    }
    let git = Git::open(paths.work_dir()).map_err(EngineError::corrupt)?;
    summaries(&git, &pending_oids(&git, remote)?).map_err(EngineError::corrupt)
}

/// Oids of pending commits, oldest first.
pub(crate) fn pending_oids(git: &Git, remote: &RemoteSettings) -> Result<Vec<Oid>, EngineError> {
    let local_ref = remote.branch.local_ref();
    let Some(local) = git.try_resolve_ref(&local_ref).map_err(EngineError::corrupt)? else {
        return Ok(Vec::new());
    };
    let tracking = git
        .try_resolve_ref(&remote.branch.remote_tracking_ref(&remote.name))
        .map_err(EngineError::corrupt)?;

    git.commits_between(tracking.as_ref(), &local)
        .map_err(EngineError::corrupt)
}

pub(crate) fn summaries(git: &Git, oids: &[Oid]) -> Result<Vec<CommitSummary>, GitError> {
    oids.iter()
        .map(|oid| git.commit_info(oid).map(CommitSummary::from))
        .collect()
}
