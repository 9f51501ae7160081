//! engine::versioned
//!
//! The versioned store: a shared git working copy with batched publishing.
//!
//! # Architecture
//!
//! Every mutating call runs inside a [`Session`], which holds the gate for
//! its lifetime. Session methods pass the gate guard down to the reconcile,
//! commit, and push steps, so none of them can run unguarded. The trait
//! methods on [`ContentStore`] each open a session for exactly the steps
//! they need.
//!
//! # Example
//!
//! ```ignore
//! let store = VersionedStore::new(&settings);
//! let session = store.session()?;
//! session.ensure_fresh()?;
//! session.commit_locally(&batch, "Update about page", &author)?;
//! drop(session); // next writer admitted
//! ```

use super::batch::MutationBatch;
use super::commit::{commit_batch, CommitOutcome};
use super::error::EngineError;
use super::gate::{Gate, GateGuard};
use super::hooks::ReconcileObserver;
use super::pending::{self, CommitSummary};
use super::publish::{self, PublishReport, PushOutcome};
use super::reader::{self, SearchHit};
use super::reconcile::{reconcile, ReconcileOutcome};
use super::working_copy::WorkingCopy;
use super::{Applied, ContentStore};
use crate::core::config::{Mode, Settings};
use crate::core::types::{Author, ContentPath};

/// Shared working copy, serialized writers, explicit publish.
pub struct VersionedStore {
    working_copy: WorkingCopy,
    gate: Gate,
    publish_retries: u32,
    observer: Option<Box<dyn ReconcileObserver>>,
}

impl std::fmt::Debug for VersionedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionedStore")
            .field("working_copy", &self.working_copy)
            .field("gate", &self.gate)
            .field("publish_retries", &self.publish_retries)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

/// Exclusive access to the working copy for a sequence of steps.
pub struct Session<'a> {
    store: &'a VersionedStore,
    guard: GateGuard<'a>,
}

impl VersionedStore {
    pub fn new(settings: &Settings) -> Self {
        Self {
            working_copy: WorkingCopy::new(settings.paths.clone(), settings.remote.clone()),
            gate: Gate::new(settings.paths.lock_path(), settings.lock_timeout),
            publish_retries: settings.publish_retries,
            observer: None,
        }
    }

    /// Install a hook that sees local commits right before a conflict reset
    /// discards them.
    pub fn with_observer(mut self, observer: impl ReconcileObserver + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn working_copy(&self) -> &WorkingCopy {
        &self.working_copy
    }

    /// Wait (bounded) for exclusive access.
    pub fn session(&self) -> Result<Session<'_>, EngineError> {
        Ok(Session {
            store: self,
            guard: self.gate.acquire()?,
        })
    }

    fn observer(&self) -> Option<&dyn ReconcileObserver> {
        self.observer.as_deref()
    }
}

impl Session<'_> {
    /// Fetch and reconcile the working copy with the remote branch.
    pub fn ensure_fresh(&self) -> Result<ReconcileOutcome, EngineError> {
        reconcile(&self.store.working_copy, &self.guard, self.store.observer())
    }

    /// Write, stage, and commit a batch. Does not reconcile first.
    pub fn commit_locally(
        &self,
        batch: &MutationBatch,
        message: &str,
        author: &Author,
    ) -> Result<CommitOutcome, EngineError> {
        if batch.is_empty() {
            return Ok(CommitOutcome::NoOp);
        }
        let git = self.store.working_copy.open()?;
        commit_batch(&git, &self.guard, batch, message, author)
    }

    /// Push pending commits. Does not reconcile first.
    pub fn push_to_remote(&self) -> Result<PushOutcome, EngineError> {
        publish::push(&self.store.working_copy, &self.guard)
    }

    /// Reconcile and push, re-reconciling after rejected pushes.
    pub fn publish(&self) -> Result<PublishReport, EngineError> {
        publish::publish_with_retry(
            &self.store.working_copy,
            &self.guard,
            self.store.observer(),
            self.store.publish_retries,
        )
    }
}

impl ContentStore for VersionedStore {
    fn mode(&self) -> Mode {
        Mode::Versioned
    }

    fn ensure_fresh(&self) -> Result<ReconcileOutcome, EngineError> {
        self.session()?.ensure_fresh()
    }

    fn commit_locally(
        &self,
        batch: &MutationBatch,
        message: &str,
        author: &Author,
    ) -> Result<CommitOutcome, EngineError> {
        self.session()?.commit_locally(batch, message, author)
    }

    fn push_to_remote(&self) -> Result<PushOutcome, EngineError> {
        self.session()?.push_to_remote()
    }

    fn unpushed_changes(&self) -> Result<Vec<CommitSummary>, EngineError> {
        pending::unpushed_changes(&self.working_copy.paths, &self.working_copy.remote)
    }

    fn apply(
        &self,
        batch: &MutationBatch,
        message: &str,
        author: &Author,
    ) -> Result<Applied, EngineError> {
        let session = self.session()?;
        let reconcile = session.ensure_fresh()?;
        let commit = session.commit_locally(batch, message, author)?;
        Ok(Applied { reconcile, commit })
    }

    fn publish(&self) -> Result<PublishReport, EngineError> {
        self.session()?.publish()
    }

    fn apply_and_publish(
        &self,
        batch: &MutationBatch,
        message: &str,
        author: &Author,
    ) -> Result<(Applied, PublishReport), EngineError> {
        let session = self.session()?;
        let reconcile = session.ensure_fresh()?;
        let commit = session.commit_locally(batch, message, author)?;
        let report = session.publish()?;
        Ok((Applied { reconcile, commit }, report))
    }

    fn read_file(&self, path: &ContentPath) -> Result<Option<Vec<u8>>, EngineError> {
        reader::read_file(self.working_copy.paths.work_dir(), path)
    }

    fn list_files(
        &self,
        dir: &str,
        extension: Option<&str>,
    ) -> Result<Vec<ContentPath>, EngineError> {
        reader::list_files(self.working_copy.paths.work_dir(), dir, extension)
    }

    fn search(&self, dir: &str, query: &str) -> Result<Vec<SearchHit>, EngineError> {
        reader::search(self.working_copy.paths.work_dir(), dir, query)
    }
}
