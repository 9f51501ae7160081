//! engine::publish
//!
//! The publish coordinator: push every pending commit in one network call.
//!
//! The push refspec never forces. A rejected push means the remote moved
//! since the last reconciliation; the fix is to reconcile again and retry,
//! which [`publish_with_retry`] does a bounded number of times. Failures of
//! any kind leave local commits exactly where they were.

use serde::{Deserialize, Serialize};

use super::error::EngineError;
use super::gate::GateGuard;
use super::hooks::ReconcileObserver;
use super::pending;
use super::reconcile::{reconcile, ReconcileOutcome};
use super::working_copy::WorkingCopy;

/// Result of a single push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushOutcome {
    pub pushed: usize,
}

/// Result of a full publish (reconcile, push, retry on rejection).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReport {
    pub pushed: usize,
    pub attempts: u32,
    /// One entry per reconciliation performed, in order.
    pub reconciles: Vec<ReconcileOutcome>,
}

impl PublishReport {
    /// Local commits discarded by conflict resets along the way.
    pub fn discarded(&self) -> usize {
        self.reconciles
            .iter()
            .map(|o| match o {
                ReconcileOutcome::Reset { discarded } => *discarded,
                _ => 0,
            })
            .sum()
    }
}

/// Push the local branch to the remote branch.
///
/// With nothing pending this returns `pushed: 0` without touching the
/// network.
pub(crate) fn push(wc: &WorkingCopy, _guard: &GateGuard<'_>) -> Result<PushOutcome, EngineError> {
    if !wc.paths.is_cloned() {
        return Ok(PushOutcome { pushed: 0 });
    }
    let git = wc.open()?;
    let remote = &wc.remote;

    let pending = pending::pending_oids(&git, remote)?;
    if pending.is_empty() {
        return Ok(PushOutcome { pushed: 0 });
    }

    git.push_branch(&remote.name, &remote.branch, &wc.creds)
        .map_err(|err| {
            tracing::warn!(branch = %remote.branch, error = %err, "push failed");
            EngineError::from_remote(err)
        })?;

    // Mirror what a fetch would now report, so the ledger empties at once.
    let local = git
        .resolve_ref(&remote.branch.local_ref())
        .map_err(EngineError::corrupt)?;
    git.set_ref(
        &remote.branch.remote_tracking_ref(&remote.name),
        &local,
        "batchpress: publish",
    )
    .map_err(EngineError::corrupt)?;

    tracing::info!(branch = %remote.branch, pushed = pending.len(), tip = %local.short(8), "published");
    Ok(PushOutcome {
        pushed: pending.len(),
    })
}

/// Reconcile and push under one gate hold, retrying after rejections.
pub(crate) fn publish_with_retry(
    wc: &WorkingCopy,
    guard: &GateGuard<'_>,
    observer: Option<&dyn ReconcileObserver>,
    retries: u32,
) -> Result<PublishReport, EngineError> {
    let mut report = PublishReport {
        pushed: 0,
        attempts: 0,
        reconciles: Vec::new(),
    };

    loop {
        report.attempts += 1;
        report.reconciles.push(reconcile(wc, guard, observer)?);

        match push(wc, guard) {
            Ok(outcome) => {
                report.pushed = outcome.pushed;
                return Ok(report);
            }
            Err(EngineError::Rejected { message }) if report.attempts <= retries => {
                tracing::info!(attempt = report.attempts, reason = %message, "push rejected, reconciling again");
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discarded_sums_resets() {
        let report = PublishReport {
            pushed: 1,
            attempts: 2,
            reconciles: vec![
                ReconcileOutcome::Reset { discarded: 2 },
                ReconcileOutcome::Rebased { commits: 1 },
            ],
        };
        assert_eq!(report.discarded(), 2);
    }

    #[test]
    fn push_outcome_json() {
        let json = serde_json::to_string(&PushOutcome { pushed: 3 }).unwrap();
        assert_eq!(json, r#"{"pushed":3}"#);
    }
}
