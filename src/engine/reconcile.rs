//! engine::reconcile
//!
//! Bring the working copy's branch in sync with the remote before a batch.
//!
//! # Policy
//!
//! After fetching the remote branch:
//!
//! 1. Local tip equal to, or behind, the remote tip: fast-forward.
//! 2. Local tip strictly ahead: nothing to do.
//! 3. Diverged, and every local-only commit replays cleanly onto the remote
//!    tip: move the branch to the replayed commits (same diffs, new shas).
//! 4. Diverged with a conflict: discard the local-only commits and reset to
//!    the remote tip. The observer is told first and the outcome says how
//!    many commits were dropped.
//!
//! # Invariants
//!
//! - Replayed commits are built on a scratch ref; the branch pointer moves
//!   once, by compare-and-swap, only after the whole replay succeeded
//! - If the tree cannot be checked out after the pointer moved, the pointer
//!   is moved back before the error is returned
//! - A half-finished git operation left by a crash is cleaned up first

use serde::{Deserialize, Serialize};

use super::error::EngineError;
use super::gate::GateGuard;
use super::hooks::ReconcileObserver;
use super::pending;
use super::working_copy::WorkingCopy;
use crate::core::types::Oid;
use crate::git::{Git, Replay};

/// Scratch ref holding the replay-in-progress tip.
pub const SCRATCH_REF: &str = "refs/batchpress/reconcile";

/// What reconciliation did to the local branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    UpToDate,
    FastForwarded,
    Rebased { commits: usize },
    Reset { discarded: usize },
}

impl ReconcileOutcome {
    /// True when local commits were thrown away.
    pub fn is_lossy(&self) -> bool {
        matches!(self, ReconcileOutcome::Reset { discarded } if *discarded > 0)
    }
}

impl std::fmt::Display for ReconcileOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconcileOutcome::UpToDate => write!(f, "up to date"),
            ReconcileOutcome::FastForwarded => write!(f, "fast-forwarded"),
            ReconcileOutcome::Rebased { commits } => {
                write!(f, "rebased {} local commit(s)", commits)
            }
            ReconcileOutcome::Reset { discarded } => {
                write!(f, "reset to remote, discarded {} local commit(s)", discarded)
            }
        }
    }
}

/// Fetch and reconcile. Clones on first use.
pub(crate) fn reconcile(
    wc: &WorkingCopy,
    guard: &GateGuard<'_>,
    observer: Option<&dyn ReconcileObserver>,
) -> Result<ReconcileOutcome, EngineError> {
    let (git, fresh) = wc.open_or_clone(guard)?;
    if fresh {
        return Ok(ReconcileOutcome::UpToDate);
    }

    recover_interrupted(&git, wc)?;

    let remote = &wc.remote;
    git.ensure_remote_url(&remote.name, &remote.url)
        .map_err(EngineError::corrupt)?;
    git.fetch_branch(&remote.name, &remote.branch, &wc.creds)
        .map_err(EngineError::from_remote)?;

    let local_ref = remote.branch.local_ref();
    let remote_tip = git
        .try_resolve_ref(&remote.branch.remote_tracking_ref(&remote.name))
        .map_err(EngineError::corrupt)?
        .ok_or_else(|| EngineError::Unavailable {
            message: format!("remote has no branch '{}'", remote.branch),
        })?;

    let outcome = match git.try_resolve_ref(&local_ref).map_err(EngineError::corrupt)? {
        None => {
            git.update_ref_cas(&local_ref, &remote_tip, None, "batchpress: create branch")
                .map_err(EngineError::corrupt)?;
            git.set_head(&local_ref).map_err(EngineError::corrupt)?;
            git.checkout_head_clean().map_err(EngineError::corrupt)?;
            ReconcileOutcome::FastForwarded
        }
        Some(local) if local == remote_tip => ReconcileOutcome::UpToDate,
        Some(local) if is_ancestor(&git, &local, &remote_tip)? => {
            move_branch(&git, &local_ref, &local, &remote_tip)?;
            ReconcileOutcome::FastForwarded
        }
        Some(local) if is_ancestor(&git, &remote_tip, &local)? => ReconcileOutcome::UpToDate,
        Some(local) => rebase_or_reset(&git, &local_ref, &local, &remote_tip, observer)?,
    };

    match outcome {
        ReconcileOutcome::Reset { discarded } => tracing::warn!(
            branch = %remote.branch,
            discarded,
            "remote diverged with conflicting changes; local commits discarded"
        ),
        other => tracing::info!(branch = %remote.branch, outcome = %other, "reconciled"),
    }
    Ok(outcome)
}

fn is_ancestor(git: &Git, ancestor: &Oid, descendant: &Oid) -> Result<bool, EngineError> {
    git.is_ancestor(ancestor, descendant)
        .map_err(EngineError::corrupt)
}

/// Clean up after a crash: leftover operation state, a detached or foreign
/// HEAD, or a dirty tree from an interrupted batch.
fn recover_interrupted(git: &Git, wc: &WorkingCopy) -> Result<(), EngineError> {
    let state = git.state();
    if state.is_in_progress() {
        tracing::warn!(operation = %state, "clearing interrupted git operation");
        git.cleanup_state().map_err(EngineError::corrupt)?;
    }

    let local_ref = wc.remote.branch.local_ref();
    let on_branch = git.head_ref_name().as_deref() == Some(local_ref.as_str());
    if !on_branch
        && git
            .try_resolve_ref(&local_ref)
            .map_err(EngineError::corrupt)?
            .is_some()
    {
        git.set_head(&local_ref).map_err(EngineError::corrupt)?;
    }

    let dirty = !git
        .worktree_status(false)
        .map_err(EngineError::corrupt)?
        .is_clean();
    if state.is_in_progress() || !on_branch || dirty {
        git.checkout_head_clean().map_err(EngineError::corrupt)?;
    }
    git.delete_ref(SCRATCH_REF).map_err(EngineError::corrupt)?;
    Ok(())
}

fn rebase_or_reset(
    git: &Git,
    local_ref: &str,
    local: &Oid,
    remote_tip: &Oid,
    observer: Option<&dyn ReconcileObserver>,
) -> Result<ReconcileOutcome, EngineError> {
    let local_only = git
        .commits_between(Some(remote_tip), local)
        .map_err(EngineError::corrupt)?;

    let replayed = replay_all(git, &local_only, remote_tip);
    git.delete_ref(SCRATCH_REF).map_err(EngineError::corrupt)?;

    match replayed? {
        Some((tip, 0)) => {
            move_branch(git, local_ref, local, &tip)?;
            Ok(ReconcileOutcome::FastForwarded)
        }
        Some((tip, commits)) => {
            move_branch(git, local_ref, local, &tip)?;
            Ok(ReconcileOutcome::Rebased { commits })
        }
        None => {
            let discarded = pending::summaries(git, &local_only).map_err(EngineError::corrupt)?;
            tracing::warn!(
                shas = ?discarded.iter().map(|c| c.short_sha.as_str()).collect::<Vec<_>>(),
                "discarding local commits that conflict with the remote"
            );
            if let Some(observer) = observer {
                observer.before_reset(&discarded);
            }
            move_branch(git, local_ref, local, remote_tip)?;
            Ok(ReconcileOutcome::Reset {
                discarded: local_only.len(),
            })
        }
    }
}

/// Replay `commits` onto `onto`. Returns the new tip and how many commits
/// were recreated, or `None` on the first conflict.
fn replay_all(
    git: &Git,
    commits: &[Oid],
    onto: &Oid,
) -> Result<Option<(Oid, usize)>, EngineError> {
    let mut tip = onto.clone();
    let mut applied = 0;
    for oid in commits {
        match git.replay_commit(oid, &tip).map_err(EngineError::corrupt)? {
            Replay::Applied(new_tip) => {
                git.set_ref(SCRATCH_REF, &new_tip, "batchpress: replay")
                    .map_err(EngineError::corrupt)?;
                tip = new_tip;
                applied += 1;
            }
            Replay::AlreadyApplied => {
                tracing::debug!(sha = %oid.short(8), "change already on remote, dropping");
            }
            Replay::Conflict => {
                tracing::debug!(sha = %oid.short(8), "replay conflicts");
                return Ok(None);
            }
        }
    }
    Ok(Some((tip, applied)))
}

/// Move the checked-out branch from `from` to `to` and check it out,
/// restoring `from` if the checkout fails.
fn move_branch(git: &Git, refname: &str, from: &Oid, to: &Oid) -> Result<(), EngineError> {
    git.update_ref_cas(refname, to, Some(from), "batchpress: reconcile")
        .map_err(EngineError::corrupt)?;

    if let Err(err) = git.checkout_head_clean() {
        tracing::warn!(error = %err, "checkout failed after moving branch; rolling back");
        git.update_ref_cas(refname, from, Some(to), "batchpress: rollback")
            .map_err(EngineError::corrupt)?;
        git.checkout_head_clean().map_err(EngineError::corrupt)?;
        return Err(EngineError::corrupt(err));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_reset_with_discards_is_lossy() {
        assert!(ReconcileOutcome::Reset { discarded: 1 }.is_lossy());
        assert!(!ReconcileOutcome::Reset { discarded: 0 }.is_lossy());
        assert!(!ReconcileOutcome::Rebased { commits: 3 }.is_lossy());
        assert!(!ReconcileOutcome::FastForwarded.is_lossy());
    }

    #[test]
    fn outcome_serializes_with_tag() {
        let json = serde_json::to_value(ReconcileOutcome::Rebased { commits: 2 }).unwrap();
        assert_eq!(json["outcome"], "rebased");
        assert_eq!(json["commits"], 2);

        let json = serde_json::to_value(ReconcileOutcome::UpToDate).unwrap();
        assert_eq!(json["outcome"], "up_to_date");
    }

    #[test]
    fn display_mentions_discards() {
        let text = ReconcileOutcome::Reset { discarded: 2 }.to_string();
        assert!(text.contains("discarded 2"));
    }
}
