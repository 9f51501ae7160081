//! engine::local
//!
//! The local-only store: writes land in a plain directory, there is no
//! history, and there is never anything to publish.
//!
//! Selected once at startup for development and for running without
//! network or credentials. It never takes the gate, never reconciles, and
//! never contacts a remote.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::batch::{Change, MutationBatch};
use super::commit::{remove_file, write_file_atomic, CommitOutcome};
use super::error::EngineError;
use super::pending::CommitSummary;
use super::publish::{PublishReport, PushOutcome};
use super::reader::{self, SearchHit};
use super::reconcile::ReconcileOutcome;
use super::{Applied, ContentStore};
use crate::core::config::{Mode, Settings};
use crate::core::types::{Author, ContentPath};

/// Plain-directory store.
#[derive(Debug, Clone)]
pub struct LocalStore {
    output_dir: PathBuf,
    /// An existing clone to read through to, if one is present.
    versioned_source: Option<PathBuf>,
}

impl LocalStore {
    pub fn new(settings: &Settings) -> Self {
        let clone_dir = &settings.paths.clone_dir;
        Self {
            output_dir: settings.output_dir.clone(),
            versioned_source: clone_dir.is_dir().then(|| clone_dir.clone()),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write every change, or none: on the first failure the paths already
    /// touched get their previous content back.
    fn write_batch(&self, batch: &MutationBatch) -> Result<(), EngineError> {
        let mut previous: Vec<(&ContentPath, Option<Vec<u8>>)> =
            Vec::with_capacity(batch.len());
        for (path, change) in batch.iter() {
            let result = self.snapshot(path).and_then(|before| {
                previous.push((path, before));
                match change {
                    Change::Write(content) => write_file_atomic(&self.output_dir, path, content),
                    Change::Delete => remove_file(&self.output_dir, path),
                }
            });
            if let Err(err) = result {
                tracing::warn!(path = %path, error = %err, "local write failed, undoing batch");
                self.undo(&previous);
                return Err(EngineError::Write {
                    path: path.to_string(),
                    message: err.to_string(),
                });
            }
        }
        tracing::debug!(paths = batch.len(), dir = %self.output_dir.display(), "wrote batch locally");
        Ok(())
    }

    /// Current content of `path` in the output dir, `None` if absent.
    fn snapshot(&self, path: &ContentPath) -> std::io::Result<Option<Vec<u8>>> {
        match fs::read(path.under(&self.output_dir)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn undo(&self, previous: &[(&ContentPath, Option<Vec<u8>>)]) {
        for (path, before) in previous.iter().rev() {
            let result = match before {
                Some(bytes) => write_file_atomic(&self.output_dir, path, bytes),
                None => remove_file(&self.output_dir, path),
            };
            if let Err(err) = result {
                tracing::warn!(path = %path, error = %err, "could not undo local write");
            }
        }
    }

    /// Roots to read from, in preference order.
    fn read_roots(&self) -> impl Iterator<Item = &Path> {
        self.versioned_source
            .as_deref()
            .into_iter()
            .chain(std::iter::once(self.output_dir.as_path()))
    }
}

impl ContentStore for LocalStore {
    fn mode(&self) -> Mode {
        Mode::LocalOnly
    }

    fn ensure_fresh(&self) -> Result<ReconcileOutcome, EngineError> {
        Ok(ReconcileOutcome::UpToDate)
    }

    fn commit_locally(
        &self,
        batch: &MutationBatch,
        _message: &str,
        _author: &Author,
    ) -> Result<CommitOutcome, EngineError> {
        self.write_batch(batch)?;
        Ok(CommitOutcome::Offline)
    }

    fn push_to_remote(&self) -> Result<PushOutcome, EngineError> {
        Ok(PushOutcome { pushed: 0 })
    }

    fn unpushed_changes(&self) -> Result<Vec<CommitSummary>, EngineError> {
        Ok(Vec::new())
    }

    fn apply(
        &self,
        batch: &MutationBatch,
        message: &str,
        author: &Author,
    ) -> Result<Applied, EngineError> {
        Ok(Applied {
            reconcile: ReconcileOutcome::UpToDate,
            commit: self.commit_locally(batch, message, author)?,
        })
    }

    fn publish(&self) -> Result<PublishReport, EngineError> {
        Ok(PublishReport {
            pushed: 0,
            attempts: 0,
            reconciles: Vec::new(),
        })
    }

    fn read_file(&self, path: &ContentPath) -> Result<Option<Vec<u8>>, EngineError> {
        for root in self.read_roots() {
            if let Some(bytes) = reader::read_file(root, path)? {
                return Ok(Some(bytes));
            }
        }
        Ok(None)
    }

    fn list_files(
        &self,
        dir: &str,
        extension: Option<&str>,
    ) -> Result<Vec<ContentPath>, EngineError> {
        let mut all = Vec::new();
        for root in self.read_roots() {
            all.extend(reader::list_files(root, dir, extension)?);
        }
        all.sort();
        all.dedup();
        Ok(all)
    }

    fn search(&self, dir: &str, query: &str) -> Result<Vec<SearchHit>, EngineError> {
        // A path found under an earlier root shadows the same path later on.
        let mut shadowed = BTreeSet::new();
        let mut hits = Vec::new();
        for root in self.read_roots() {
            hits.extend(
                reader::search(root, dir, query)?
                    .into_iter()
                    .filter(|hit| !shadowed.contains(&hit.path)),
            );
            shadowed.extend(reader::list_files(root, dir, None)?);
        }
        Ok(hits)
    }
}
