//! engine::working_copy
//!
//! The single on-disk clone that every mutation passes through.
//!
//! A [`WorkingCopy`] binds a local directory to one remote URL and one
//! branch. It is cloned lazily on the first gated operation and never
//! removed afterwards.

use std::fs;

use super::error::EngineError;
use super::gate::GateGuard;
use crate::core::config::RemoteSettings;
use crate::core::paths::StorePaths;
use crate::git::{redact, Credentials, Git, GitError};

/// One clone of one remote branch.
#[derive(Debug, Clone)]
pub struct WorkingCopy {
    pub(crate) paths: StorePaths,
    pub(crate) remote: RemoteSettings,
    pub(crate) creds: Credentials,
}

impl WorkingCopy {
    pub fn new(paths: StorePaths, remote: RemoteSettings) -> Self {
        let creds = Credentials::new(remote.token.clone());
        Self {
            paths,
            remote,
            creds,
        }
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    pub fn remote(&self) -> &RemoteSettings {
        &self.remote
    }

    /// Open the clone for reading. Fails if it does not exist yet.
    pub(crate) fn open(&self) -> Result<Git, EngineError> {
        Git::open(self.paths.work_dir()).map_err(EngineError::corrupt)
    }

    /// Open the clone, cloning it first if the directory is missing or
    /// empty. Returns whether a fresh clone was made.
    pub(crate) fn open_or_clone(&self, _guard: &GateGuard<'_>) -> Result<(Git, bool), EngineError> {
        if self.paths.is_cloned() {
            return Ok((self.open()?, false));
        }

        let dir = self.paths.work_dir();
        if dir.exists() && !is_empty_dir(dir) {
            return Err(EngineError::CorruptRepository {
                message: format!("{} exists but is not a clone", dir.display()),
            });
        }

        tracing::info!(
            url = %redact(&self.remote.url),
            branch = %self.remote.branch,
            dir = %dir.display(),
            "cloning working copy"
        );
        let git = Git::clone_branch(
            &self.remote.url,
            dir,
            &self.remote.name,
            &self.remote.branch,
            &self.creds,
        )
        .map_err(|err| match err {
            GitError::RemoteUnavailable { message } => EngineError::Unavailable { message },
            other => EngineError::corrupt(other),
        })?;

        Ok((git, true))
    }
}

fn is_empty_dir(dir: &std::path::Path) -> bool {
    fs::read_dir(dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::BranchName;
    use tempfile::TempDir;

    fn remote() -> RemoteSettings {
        RemoteSettings {
            url: "/nonexistent/origin.git".to_string(),
            name: "origin".to_string(),
            branch: BranchName::default(),
            token: Some("secret".to_string()),
        }
    }

    #[test]
    fn empty_directory_detection() {
        let temp = TempDir::new().unwrap();
        assert!(is_empty_dir(temp.path()));
        fs::write(temp.path().join("file"), "x").unwrap();
        assert!(!is_empty_dir(temp.path()));
    }

    #[test]
    fn open_without_clone_is_corrupt() {
        let temp = TempDir::new().unwrap();
        let wc = WorkingCopy::new(StorePaths::new(temp.path().join("site"), None), remote());
        assert!(matches!(wc.open(), Err(EngineError::CorruptRepository { .. })));
    }

    #[test]
    fn credentials_debug_hides_token() {
        let temp = TempDir::new().unwrap();
        let wc = WorkingCopy::new(StorePaths::new(temp.path().join("site"), None), remote());
        assert!(!format!("{:?}", wc).contains("secret"));
    }
}
