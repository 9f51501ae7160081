//! engine
//!
//! The batched publish engine.
//!
//! # Architecture
//!
//! Many writers commit to one shared working copy; publishing pushes all of
//! their commits at once. The pieces, leaf first:
//!
//! - [`working_copy`]: the single clone bound to one remote branch
//! - [`reconcile`]: fetch, then fast-forward, replay, or reset
//! - [`gate`]: the mutation serializer (one writer at a time, bounded wait)
//! - [`commit`]: the commit batcher (write, stage, commit, or roll back)
//! - [`pending`]: the ledger of local commits not yet on the remote
//! - [`publish`]: the coordinator that pushes them in one call
//! - [`local`]: the offline fallback with no history at all
//!
//! The two backends implement [`ContentStore`] and are chosen once by
//! [`open_store`]; call sites never branch on the mode.
//!
//! # Lifecycle
//!
//! ```text
//! mutation: gate -> reconcile -> commit -> release
//! publish:  gate -> reconcile -> push [-> reconcile -> push] -> release
//! status:   read refs, no gate, no fetch
//! ```
//!
//! # Example
//!
//! ```ignore
//! use batchpress::engine::{open_store, MutationBatch};
//!
//! let store = open_store(&settings);
//! let batch = MutationBatch::new().write("content/about.md", "# About")?;
//! let applied = store.apply(&batch, "Update about page", &author)?;
//! if applied.reconcile.is_lossy() {
//!     eprintln!("warning: {}", applied.reconcile);
//! }
//! println!("{} change(s) waiting", store.status()?.count);
//! ```

pub mod audit;
pub mod batch;
pub mod commit;
pub mod error;
pub mod gate;
pub mod hooks;
pub mod local;
pub mod pending;
pub mod publish;
pub mod reader;
pub mod reconcile;
pub mod versioned;
pub mod working_copy;

pub use audit::{AuditAction, AuditEntry, AuditError, AuditOutcome, AuditSink, JsonlAuditLog};
pub use batch::{Change, MutationBatch};
pub use commit::{CommitOutcome, LocalCommit};
pub use error::EngineError;
pub use gate::{Gate, GateGuard};
pub use hooks::ReconcileObserver;
pub use local::LocalStore;
pub use pending::{CommitSummary, PublishStatus};
pub use publish::{PublishReport, PushOutcome};
pub use reader::SearchHit;
pub use reconcile::ReconcileOutcome;
pub use versioned::{Session, VersionedStore};
pub use working_copy::WorkingCopy;

use crate::core::config::{Mode, Settings};
use crate::core::types::{Author, ContentPath};

/// What a mutation did: how the working copy was reconciled first, and
/// what the batch produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub reconcile: ReconcileOutcome,
    pub commit: CommitOutcome,
}

/// One content backend. Implementations are shared across request threads.
pub trait ContentStore: Send + Sync {
    fn mode(&self) -> Mode;

    /// Fetch and reconcile with the remote branch.
    fn ensure_fresh(&self) -> Result<ReconcileOutcome, EngineError>;

    /// Write and commit a batch without reconciling first.
    fn commit_locally(
        &self,
        batch: &MutationBatch,
        message: &str,
        author: &Author,
    ) -> Result<CommitOutcome, EngineError>;

    /// Push pending commits without reconciling first.
    fn push_to_remote(&self) -> Result<PushOutcome, EngineError>;

    /// Pending commits, oldest first. Never blocks on the gate.
    fn unpushed_changes(&self) -> Result<Vec<CommitSummary>, EngineError>;

    fn has_unpushed_commits(&self) -> Result<bool, EngineError> {
        Ok(!self.unpushed_changes()?.is_empty())
    }

    /// The polling surface.
    fn status(&self) -> Result<PublishStatus, EngineError> {
        Ok(PublishStatus::from(self.unpushed_changes()?))
    }

    /// Reconcile then commit, under one hold of the gate.
    fn apply(
        &self,
        batch: &MutationBatch,
        message: &str,
        author: &Author,
    ) -> Result<Applied, EngineError>;

    /// Reconcile then push, retrying a bounded number of times if the
    /// push is rejected.
    fn publish(&self) -> Result<PublishReport, EngineError>;

    /// Apply a batch and publish it straight away.
    fn apply_and_publish(
        &self,
        batch: &MutationBatch,
        message: &str,
        author: &Author,
    ) -> Result<(Applied, PublishReport), EngineError> {
        let applied = self.apply(batch, message, author)?;
        Ok((applied, self.publish()?))
    }

    fn read_file(&self, path: &ContentPath) -> Result<Option<Vec<u8>>, EngineError>;

    fn list_files(
        &self,
        dir: &str,
        extension: Option<&str>,
    ) -> Result<Vec<ContentPath>, EngineError>;

    fn search(&self, dir: &str, query: &str) -> Result<Vec<SearchHit>, EngineError>;
}

/// Build the backend for the configured mode.
pub fn open_store(settings: &Settings) -> Box<dyn ContentStore> {
    tracing::debug!(mode = %settings.mode, "opening content store");
    match settings.mode {
        Mode::Versioned => Box::new(VersionedStore::new(settings)),
        Mode::LocalOnly => Box::new(LocalStore::new(settings)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::BranchName;
    use tempfile::TempDir;

    #[test]
    fn open_store_follows_mode() {
        let temp = TempDir::new().unwrap();
        let versioned = Settings::versioned(
            "/srv/origin.git",
            temp.path().join("site"),
            BranchName::default(),
        );
        assert_eq!(open_store(&versioned).mode(), Mode::Versioned);

        let local = Settings::local_only(temp.path().join("out"), None);
        assert_eq!(open_store(&local).mode(), Mode::LocalOnly);
    }

    #[test]
    fn stores_are_shareable() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn ContentStore>();
        assert_send_sync::<VersionedStore>();
    }
}
