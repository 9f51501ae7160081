//! engine::audit
//!
//! Audit entries built from engine results.
//!
//! The audit trail belongs to the surrounding application; the engine only
//! supplies the data (new commit sha, push outcome, reset counts) and a
//! simple append-only JSON-lines sink for callers that want one.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::commit::CommitOutcome;
use super::error::EngineError;
use super::publish::PublishReport;
use super::reconcile::ReconcileOutcome;

/// Errors from audit sinks.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("failed to write audit log {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode audit entry: {0}")]
    Encode(#[from] serde_json::Error),
}

/// What was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Commit,
    Publish,
    Reconcile,
}

/// How it ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    NoOp,
    /// Succeeded, but local commits were discarded on the way.
    Reset { discarded: usize },
    Failed { kind: String, message: String },
}

/// One append-only audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub actor: String,
    pub action: AuditAction,
    /// Content id or path the action was about; empty for publish.
    pub target: String,
    pub timestamp: DateTime<Utc>,
    pub outcome: AuditOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_sha: Option<String>,
}

impl AuditEntry {
    fn new(actor: &str, action: AuditAction, target: &str, outcome: AuditOutcome) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor: actor.to_string(),
            action,
            target: target.to_string(),
            timestamp: Utc::now(),
            outcome,
            commit_sha: None,
        }
    }

    pub fn for_commit(
        actor: &str,
        target: &str,
        result: Result<&CommitOutcome, &EngineError>,
    ) -> Self {
        match result {
            Ok(CommitOutcome::Committed(commit)) => {
                let mut entry = Self::new(actor, AuditAction::Commit, target, AuditOutcome::Success);
                entry.commit_sha = Some(commit.sha.to_string());
                entry
            }
            Ok(CommitOutcome::NoOp) | Ok(CommitOutcome::Offline) => {
                Self::new(actor, AuditAction::Commit, target, AuditOutcome::NoOp)
            }
            Err(err) => Self::new(actor, AuditAction::Commit, target, failed(err)),
        }
    }

    pub fn for_publish(actor: &str, result: Result<&PublishReport, &EngineError>) -> Self {
        let outcome = match result {
            Ok(report) if report.discarded() > 0 => AuditOutcome::Reset {
                discarded: report.discarded(),
            },
            Ok(report) if report.pushed == 0 => AuditOutcome::NoOp,
            Ok(_) => AuditOutcome::Success,
            Err(err) => failed(err),
        };
        Self::new(actor, AuditAction::Publish, "", outcome)
    }

    pub fn for_reconcile(actor: &str, result: Result<&ReconcileOutcome, &EngineError>) -> Self {
        let outcome = match result {
            Ok(ReconcileOutcome::Reset { discarded }) => AuditOutcome::Reset {
                discarded: *discarded,
            },
            Ok(ReconcileOutcome::UpToDate) => AuditOutcome::NoOp,
            Ok(_) => AuditOutcome::Success,
            Err(err) => failed(err),
        };
        Self::new(actor, AuditAction::Reconcile, "", outcome)
    }
}

fn failed(err: &EngineError) -> AuditOutcome {
    AuditOutcome::Failed {
        kind: err.kind().to_string(),
        message: err.to_string(),
    }
}

/// Where audit entries go.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: &AuditEntry) -> Result<(), AuditError>;
}

/// Appends one JSON object per line to a file.
#[derive(Debug, Clone)]
pub struct JsonlAuditLog {
    path: PathBuf,
}

impl JsonlAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for JsonlAuditLog {
    fn record(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let io_err = |source| AuditError::Io {
            path: self.path.clone(),
            source,
        };

        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_err)?;
        // One write call per line so concurrent appenders don't interleave.
        file.write_all(&line).map_err(io_err)
    }
}
