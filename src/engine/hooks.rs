//! engine::hooks
//!
//! Notification hooks fired by the reconciler.
//!
//! The conflict policy discards local-only commits and resets to the remote
//! tip. An observer gets to see exactly which commits are about to go,
//! before the branch pointer moves, so the surrounding application can
//! record them (audit trail, editor warning, backup ref of its own).
//!
//! # Example
//!
//! ```ignore
//! let store = VersionedStore::new(settings)
//!     .with_observer(|discarded: &[CommitSummary]| {
//!         for commit in discarded {
//!             eprintln!("dropping {} {}", commit.short_sha, commit.message);
//!         }
//!     });
//! ```

use super::pending::CommitSummary;

/// Receives reconciliation events.
pub trait ReconcileObserver: Send + Sync {
    /// Called with the local-only commits, oldest first, right before they
    /// are discarded by a conflict reset.
    fn before_reset(&self, discarded: &[CommitSummary]);
}

impl<F> ReconcileObserver for F
where
    F: Fn(&[CommitSummary]) + Send + Sync,
{
    fn before_reset(&self, discarded: &[CommitSummary]) {
        self(discarded)
    }
}
