//! git::interface
//!
//! Git interface implementation using git2.
//!
//! This module provides the **single doorway** to all Git operations. All
//! reads and writes of the working copy's history flow through [`Git`],
//! which returns strong types and normalizes errors into typed failure
//! categories.
//!
//! # Error Handling
//!
//! Git errors are categorized into typed variants:
//! - [`GitError::NotARepo`]: Directory is not a usable clone
//! - [`GitError::CasFailed`]: Compare-and-swap precondition failed
//! - [`GitError::PushRejected`]: Remote refused a non-fast-forward update
//! - [`GitError::RemoteUnavailable`]: Network or transport failure
//!
//! # Example
//!
//! ```ignore
//! use batchpress::git::Git;
//!
//! let git = Git::open(Path::new("/srv/site"))?;
//! let tip = git.resolve_ref("refs/heads/main")?;
//! println!("main is at {}", tip.short(8));
//! ```

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::types::{Author, BranchName, ContentPath, Oid, TypeError};

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not a usable (non-bare) repository.
    #[error("not a git repository: {path}")]
    NotARepo { path: PathBuf },

    /// Repository is bare (no working directory).
    #[error("bare repository not supported")]
    BareRepo,

    /// Requested ref does not exist.
    #[error("ref not found: {refname}")]
    RefNotFound { refname: String },

    /// Compare-and-swap precondition failed.
    #[error("CAS failed for {refname}: expected {expected}, found {actual}")]
    CasFailed {
        refname: String,
        expected: String,
        actual: String,
    },

    /// Object not found in repository.
    #[error("object not found: {oid}")]
    ObjectNotFound { oid: String },

    /// Invalid object id format.
    #[error("invalid object id: {oid}")]
    InvalidOid { oid: String },

    /// Remote refused the update because it is not a fast-forward.
    #[error("push rejected: {message}")]
    PushRejected { message: String },

    /// Network, transport, or authentication failure talking to the remote.
    #[error("remote unavailable: {message}")]
    RemoteUnavailable { message: String },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal { message: String },
}

impl GitError {
    fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => GitError::ObjectNotFound {
                oid: context.to_string(),
            },
            git2::ErrorCode::InvalidSpec => GitError::InvalidOid {
                oid: context.to_string(),
            },
            _ => GitError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }

    fn internal(err: git2::Error) -> Self {
        GitError::Internal {
            message: err.message().to_string(),
        }
    }

    /// Classify a transport error raised while pushing.
    fn from_push(err: git2::Error) -> Self {
        let msg = err.message().to_string();
        if err.code() == git2::ErrorCode::NotFastForward || is_rejection_message(&msg) {
            GitError::PushRejected { message: msg }
        } else {
            GitError::RemoteUnavailable { message: msg }
        }
    }
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidOid(msg) => GitError::InvalidOid { oid: msg },
            other => GitError::Internal {
                message: other.to_string(),
            },
        }
    }
}

fn is_rejection_message(msg: &str) -> bool {
    let msg = msg.to_ascii_lowercase();
    msg.contains("non-fast-forward")
        || msg.contains("non-fastforwardable")
        || msg.contains("fetch first")
        || msg.contains("not present locally")
        || msg.contains("rejected")
}

/// State of in-progress Git operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitState {
    Clean,
    Rebase,
    Merge,
    CherryPick,
    Revert,
    Bisect,
    ApplyMailbox,
}

impl GitState {
    pub fn is_in_progress(&self) -> bool {
        !matches!(self, GitState::Clean)
    }

    pub fn description(&self) -> &'static str {
        match self {
            GitState::Clean => "clean",
            GitState::Rebase => "rebase",
            GitState::Merge => "merge",
            GitState::CherryPick => "cherry-pick",
            GitState::Revert => "revert",
            GitState::Bisect => "bisect",
            GitState::ApplyMailbox => "apply-mailbox",
        }
    }
}

impl std::fmt::Display for GitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// Summary of working tree status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorktreeStatus {
    /// Number of staged changes
    pub staged: usize,
    /// Number of unstaged changes to tracked files
    pub unstaged: usize,
    /// Number of untracked files
    pub untracked: usize,
    /// Whether there are unresolved conflicts
    pub has_conflicts: bool,
}

impl WorktreeStatus {
    /// No staged, unstaged, or conflicted entries. Untracked files don't count.
    pub fn is_clean(&self) -> bool {
        self.staged == 0 && self.unstaged == 0 && !self.has_conflicts
    }
}

/// Information about a commit.
#[derive(Debug, Clone)]
pub struct CommitInfo {
    pub oid: Oid,
    /// First line of the commit message
    pub summary: String,
    /// Full commit message
    pub message: String,
    pub author_name: String,
    pub author_email: String,
    pub author_time: chrono::DateTime<chrono::Utc>,
    pub commit_time: chrono::DateTime<chrono::Utc>,
    pub parent_count: usize,
}

/// Result of replaying one commit on top of another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Replay {
    /// A new commit was created with the same change on the new base.
    Applied(Oid),
    /// The change is already present on the new base; nothing to create.
    AlreadyApplied,
    /// The change does not apply without conflicts.
    Conflict,
}

/// One staged path change for [`Git::stage_and_commit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagedPath {
    /// The file exists in the work tree and should be added.
    Upsert(ContentPath),
    /// The file was removed from the work tree and should be removed from the index.
    Remove(ContentPath),
}

/// Authentication for remote operations.
///
/// Tried in order: token as HTTPS basic auth, SSH agent, git credential helper.
#[derive(Clone, Default)]
pub struct Credentials {
    token: Option<String>,
}

impl Credentials {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }

    fn callbacks<'a>(&'a self, cfg: Option<git2::Config>) -> git2::RemoteCallbacks<'a> {
        let mut callbacks = git2::RemoteCallbacks::new();
        let mut attempts = 0u32;
        callbacks.credentials(move |url, username_from_url, allowed| {
            // libgit2 keeps asking while credentials are refused; bail out.
            attempts += 1;
            if attempts > 3 {
                return Err(git2::Error::from_str("authentication failed"));
            }
            if allowed.is_user_pass_plaintext() {
                if let Some(token) = &self.token {
                    return git2::Cred::userpass_plaintext("x-access-token", token);
                }
            }
            if allowed.is_ssh_key() {
                if let Some(user) = username_from_url {
                    return git2::Cred::ssh_key_from_agent(user);
                }
            }
            if allowed.is_user_pass_plaintext() {
                if let Some(cfg) = &cfg {
                    if let Ok(cred) = git2::Cred::credential_helper(cfg, url, username_from_url) {
                        return Ok(cred);
                    }
                }
            }
            git2::Cred::default()
        });
        callbacks
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// The Git interface.
///
/// All ref mutations use compare-and-swap semantics so that a branch
/// pointer only moves if it still points where the caller last saw it.
pub struct Git {
    repo: git2::Repository,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl Git {
    // =========================================================================
    // Repository Opening
    // =========================================================================

    /// Open the repository whose work tree root is exactly `path`.
    ///
    /// Unlike discovery, this never walks up to a parent repository.
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::open(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;

        if repo.is_bare() {
            return Err(GitError::BareRepo);
        }

        Ok(Self { repo })
    }

    /// Clone `branch` of `url` into `dest`, naming the remote `remote`.
    pub fn clone_branch(
        url: &str,
        dest: &Path,
        remote: &str,
        branch: &BranchName,
        creds: &Credentials,
    ) -> Result<Self, GitError> {
        let mut fetch_options = git2::FetchOptions::new();
        fetch_options.remote_callbacks(creds.callbacks(git2::Config::open_default().ok()));

        let repo = git2::build::RepoBuilder::new()
            .branch(branch.as_str())
            .fetch_options(fetch_options)
            .clone(url, dest)
            .map_err(|e| GitError::RemoteUnavailable {
                message: format!("clone of {} failed: {}", redact(url), e.message()),
            })?;

        if remote != "origin" {
            repo.remote_rename("origin", remote)
                .map_err(GitError::internal)?;
        }

        Ok(Self { repo })
    }

    /// The work tree root.
    pub fn work_dir(&self) -> Result<&Path, GitError> {
        self.repo.workdir().ok_or(GitError::BareRepo)
    }

    // =========================================================================
    // State Detection
    // =========================================================================

    /// Current in-progress operation, if any.
    pub fn state(&self) -> GitState {
        match self.repo.state() {
            git2::RepositoryState::Clean => GitState::Clean,
            git2::RepositoryState::Rebase
            | git2::RepositoryState::RebaseInteractive
            | git2::RepositoryState::RebaseMerge => GitState::Rebase,
            git2::RepositoryState::Merge => GitState::Merge,
            git2::RepositoryState::CherryPick | git2::RepositoryState::CherryPickSequence => {
                GitState::CherryPick
            }
            git2::RepositoryState::Revert | git2::RepositoryState::RevertSequence => {
                GitState::Revert
            }
            git2::RepositoryState::Bisect => GitState::Bisect,
            git2::RepositoryState::ApplyMailbox | git2::RepositoryState::ApplyMailboxOrRebase => {
                GitState::ApplyMailbox
            }
        }
    }

    /// Drop any in-progress operation state files (MERGE_HEAD and friends).
    pub fn cleanup_state(&self) -> Result<(), GitError> {
        self.repo.cleanup_state().map_err(GitError::internal)
    }

    /// Working tree status summary.
    pub fn worktree_status(&self, include_untracked: bool) -> Result<WorktreeStatus, GitError> {
        let mut opts = git2::StatusOptions::new();
        opts.include_untracked(include_untracked)
            .include_ignored(false);

        let statuses = self
            .repo
            .statuses(Some(&mut opts))
            .map_err(GitError::internal)?;

        let mut result = WorktreeStatus::default();
        for entry in statuses.iter() {
            let status = entry.status();
            if status.is_conflicted() {
                result.has_conflicts = true;
            }
            if status.intersects(
                git2::Status::INDEX_NEW
                    | git2::Status::INDEX_MODIFIED
                    | git2::Status::INDEX_DELETED
                    | git2::Status::INDEX_RENAMED
                    | git2::Status::INDEX_TYPECHANGE,
            ) {
                result.staged += 1;
            }
            if status.intersects(
                git2::Status::WT_MODIFIED
                    | git2::Status::WT_DELETED
                    | git2::Status::WT_RENAMED
                    | git2::Status::WT_TYPECHANGE,
            ) {
                result.unstaged += 1;
            }
            if status.contains(git2::Status::WT_NEW) {
                result.untracked += 1;
            }
        }

        Ok(result)
    }

    // =========================================================================
    // Ref Operations
    // =========================================================================

    /// Resolve a ref to the commit it points at.
    pub fn resolve_ref(&self, refname: &str) -> Result<Oid, GitError> {
        self.try_resolve_ref(refname)?
            .ok_or_else(|| GitError::RefNotFound {
                refname: refname.to_string(),
            })
    }

    /// Resolve a ref, returning `Ok(None)` if it does not exist.
    pub fn try_resolve_ref(&self, refname: &str) -> Result<Option<Oid>, GitError> {
        match self.repo.refname_to_id(refname) {
            Ok(oid) => Ok(Some(Oid::new(oid.to_string())?)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::from_git2(e, refname)),
        }
    }

    /// Update a ref with compare-and-swap semantics.
    ///
    /// `expected_old = None` means the ref must not exist yet.
    pub fn update_ref_cas(
        &self,
        refname: &str,
        new_oid: &Oid,
        expected_old: Option<&Oid>,
        message: &str,
    ) -> Result<(), GitError> {
        let current = self.try_resolve_ref(refname)?;
        if current.as_ref() != expected_old {
            return Err(GitError::CasFailed {
                refname: refname.to_string(),
                expected: expected_old
                    .map(|o| o.to_string())
                    .unwrap_or_else(|| "<none>".to_string()),
                actual: current
                    .map(|o| o.to_string())
                    .unwrap_or_else(|| "<none>".to_string()),
            });
        }

        let new = to_git2(new_oid)?;
        let result = match expected_old {
            Some(old) => self
                .repo
                .reference_matching(refname, new, true, to_git2(old)?, message),
            None => self.repo.reference(refname, new, false, message),
        };
        result.map_err(|e| GitError::from_git2(e, refname))?;
        Ok(())
    }

    /// Force a ref to a value. Only used for scratch and remote-tracking refs.
    pub fn set_ref(&self, refname: &str, oid: &Oid, message: &str) -> Result<(), GitError> {
        self.repo
            .reference(refname, to_git2(oid)?, true, message)
            .map_err(|e| GitError::from_git2(e, refname))?;
        Ok(())
    }

    /// Delete a ref if it exists.
    pub fn delete_ref(&self, refname: &str) -> Result<(), GitError> {
        match self.repo.find_reference(refname) {
            Ok(mut reference) => reference
                .delete()
                .map_err(|e| GitError::from_git2(e, refname)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(()),
            Err(e) => Err(GitError::from_git2(e, refname)),
        }
    }

    /// Point HEAD at a (local branch) ref.
    pub fn set_head(&self, refname: &str) -> Result<(), GitError> {
        self.repo
            .set_head(refname)
            .map_err(|e| GitError::from_git2(e, refname))
    }

    /// Name of the ref HEAD points at, if HEAD is symbolic.
    pub fn head_ref_name(&self) -> Option<String> {
        let head = self.repo.find_reference("HEAD").ok()?;
        head.symbolic_target().map(String::from)
    }

    // =========================================================================
    // Ancestry Queries
    // =========================================================================

    /// Check if `ancestor` is an ancestor of (or equal to) `descendant`.
    pub fn is_ancestor(&self, ancestor: &Oid, descendant: &Oid) -> Result<bool, GitError> {
        if ancestor == descendant {
            return Ok(true);
        }
        self.repo
            .graph_descendant_of(to_git2(descendant)?, to_git2(ancestor)?)
            .map_err(GitError::internal)
    }

    /// Commits reachable from `tip` but not from `base`, oldest first.
    ///
    /// With `base = None` every commit reachable from `tip` is returned.
    pub fn commits_between(&self, base: Option<&Oid>, tip: &Oid) -> Result<Vec<Oid>, GitError> {
        let mut revwalk = self.repo.revwalk().map_err(GitError::internal)?;
        revwalk
            .set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::REVERSE)
            .map_err(GitError::internal)?;
        revwalk.push(to_git2(tip)?).map_err(GitError::internal)?;
        if let Some(base) = base {
            revwalk.hide(to_git2(base)?).map_err(GitError::internal)?;
        }

        revwalk
            .map(|oid| {
                let oid = oid.map_err(GitError::internal)?;
                Ok(Oid::new(oid.to_string())?)
            })
            .collect()
    }

    // =========================================================================
    // Commit Information
    // =========================================================================

    pub fn commit_info(&self, oid: &Oid) -> Result<CommitInfo, GitError> {
        let commit = self
            .repo
            .find_commit(to_git2(oid)?)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))?;

        let author = commit.author();
        Ok(CommitInfo {
            oid: oid.clone(),
            summary: commit.summary().unwrap_or("").to_string(),
            message: commit.message().unwrap_or("").to_string(),
            author_name: author.name().unwrap_or("").to_string(),
            author_email: author.email().unwrap_or("").to_string(),
            author_time: to_utc(author.when()),
            commit_time: to_utc(commit.time()),
            parent_count: commit.parent_count(),
        })
    }

    /// Paths changed by a commit relative to its first parent.
    pub fn changed_paths(&self, oid: &Oid) -> Result<Vec<String>, GitError> {
        let commit = self
            .repo
            .find_commit(to_git2(oid)?)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))?;
        let tree = commit.tree().map_err(GitError::internal)?;
        let parent_tree = match commit.parent(0) {
            Ok(parent) => Some(parent.tree().map_err(GitError::internal)?),
            Err(_) => None,
        };

        let diff = self
            .repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)
            .map_err(GitError::internal)?;

        let mut paths: Vec<String> = diff
            .deltas()
            .filter_map(|d| d.new_file().path().or_else(|| d.old_file().path()))
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .collect();
        paths.sort();
        paths.dedup();
        Ok(paths)
    }

    // =========================================================================
    // Replay (rebase building block)
    // =========================================================================

    /// Re-create `commit`'s change on top of `onto` without touching any ref,
    /// the index, or the work tree.
    ///
    /// Author and message are preserved; the committer timestamp is now.
    /// Merge commits cannot be replayed and report [`Replay::Conflict`].
    pub fn replay_commit(&self, commit: &Oid, onto: &Oid) -> Result<Replay, GitError> {
        let source = self
            .repo
            .find_commit(to_git2(commit)?)
            .map_err(|e| GitError::from_git2(e, commit.as_str()))?;
        let base = self
            .repo
            .find_commit(to_git2(onto)?)
            .map_err(|e| GitError::from_git2(e, onto.as_str()))?;

        if source.parent_count() != 1 {
            return Ok(Replay::Conflict);
        }

        let mut index = self
            .repo
            .cherrypick_commit(&source, &base, 0, None)
            .map_err(GitError::internal)?;
        if index.has_conflicts() {
            return Ok(Replay::Conflict);
        }

        let tree_oid = index.write_tree_to(&self.repo).map_err(GitError::internal)?;
        if tree_oid == base.tree_id() {
            return Ok(Replay::AlreadyApplied);
        }
        let tree = self.repo.find_tree(tree_oid).map_err(GitError::internal)?;

        let committer_sig = source.committer();
        let committer = git2::Signature::now(
            committer_sig.name().unwrap_or("batchpress"),
            committer_sig.email().unwrap_or("batchpress@localhost"),
        )
        .map_err(GitError::internal)?;

        let new_oid = self
            .repo
            .commit(
                None,
                &source.author(),
                &committer,
                source.message().unwrap_or(""),
                &tree,
                &[&base],
            )
            .map_err(GitError::internal)?;

        Ok(Replay::Applied(Oid::new(new_oid.to_string())?))
    }

    // =========================================================================
    // Work Tree and Index
    // =========================================================================

    /// Make the index and work tree match HEAD exactly, deleting untracked files.
    ///
    /// A hard reset rather than a plain checkout, so conflict entries left in
    /// the index by an interrupted operation are dropped too.
    pub fn checkout_head_clean(&self) -> Result<(), GitError> {
        let head = self
            .repo
            .head()
            .and_then(|h| h.peel(git2::ObjectType::Commit))
            .map_err(GitError::internal)?;
        let mut checkout = git2::build::CheckoutBuilder::new();
        checkout.force().remove_untracked(true);
        self.repo
            .reset(&head, git2::ResetType::Hard, Some(&mut checkout))
            .map_err(GitError::internal)
    }

    /// Restore specific paths in the index and work tree to their HEAD content.
    ///
    /// Paths absent from HEAD are removed from the index and the work tree.
    pub fn restore_paths(&self, paths: &[ContentPath]) -> Result<(), GitError> {
        if paths.is_empty() {
            return Ok(());
        }

        let head_tree = self.head_tree()?;
        let mut index = self.repo.index().map_err(GitError::internal)?;
        let work_dir = self.work_dir()?.to_path_buf();

        let mut tracked = Vec::new();
        for path in paths {
            let rel = Path::new(path.as_str());
            match head_tree.get_path(rel) {
                Ok(_) => tracked.push(path),
                Err(_) => {
                    let _ = index.remove_path(rel);
                    let full = path.under(&work_dir);
                    if full.is_file() {
                        std::fs::remove_file(&full).map_err(|e| GitError::Internal {
                            message: format!("cannot remove {}: {}", full.display(), e),
                        })?;
                    }
                }
            }
        }
        index.write().map_err(GitError::internal)?;

        if !tracked.is_empty() {
            let mut checkout = git2::build::CheckoutBuilder::new();
            checkout.force().update_index(true);
            for path in &tracked {
                checkout.path(path.as_str());
            }
            self.repo
                .checkout_tree(head_tree.as_object(), Some(&mut checkout))
                .map_err(GitError::internal)?;
        }

        Ok(())
    }

    /// Blob id of `path` in HEAD's tree, if present as a file.
    pub fn head_blob(&self, path: &ContentPath) -> Result<Option<git2::Oid>, GitError> {
        let tree = self.head_tree()?;
        match tree.get_path(Path::new(path.as_str())) {
            Ok(entry) if entry.kind() == Some(git2::ObjectType::Blob) => Ok(Some(entry.id())),
            Ok(_) => Ok(None),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::internal(e)),
        }
    }

    /// Blob id `content` would have, without writing it.
    pub fn hash_blob(content: &[u8]) -> Result<git2::Oid, GitError> {
        git2::Oid::hash_object(git2::ObjectType::Blob, content).map_err(GitError::internal)
    }

    /// Stage exactly `changes` and create one commit on HEAD's branch.
    ///
    /// Returns the new commit's id.
    pub fn stage_and_commit(
        &self,
        changes: &[StagedPath],
        message: &str,
        author: &Author,
    ) -> Result<Oid, GitError> {
        let mut index = self.repo.index().map_err(GitError::internal)?;
        for change in changes {
            match change {
                StagedPath::Upsert(path) => index.add_path(Path::new(path.as_str())),
                StagedPath::Remove(path) => index.remove_path(Path::new(path.as_str())),
            }
            .map_err(GitError::internal)?;
        }
        index.write().map_err(GitError::internal)?;

        let tree_oid = index.write_tree().map_err(GitError::internal)?;
        let tree = self.repo.find_tree(tree_oid).map_err(GitError::internal)?;
        let parent = self
            .repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .map_err(GitError::internal)?;

        let signature =
            git2::Signature::now(&author.name, &author.email).map_err(GitError::internal)?;
        let oid = self
            .repo
            .commit(
                Some("HEAD"),
                &signature,
                &signature,
                message,
                &tree,
                &[&parent],
            )
            .map_err(GitError::internal)?;

        Ok(Oid::new(oid.to_string())?)
    }

    /// Reset the index to HEAD's tree, leaving the work tree alone.
    pub fn reset_index_to_head(&self) -> Result<(), GitError> {
        let tree = self.head_tree()?;
        let mut index = self.repo.index().map_err(GitError::internal)?;
        index.read_tree(&tree).map_err(GitError::internal)?;
        index.write().map_err(GitError::internal)
    }

    fn head_tree(&self) -> Result<git2::Tree<'_>, GitError> {
        self.repo
            .head()
            .and_then(|h| h.peel_to_tree())
            .map_err(GitError::internal)
    }

    // =========================================================================
    // Remote Operations
    // =========================================================================

    /// Create the remote or point it at `url`.
    pub fn ensure_remote_url(&self, name: &str, url: &str) -> Result<(), GitError> {
        match self.repo.find_remote(name) {
            Ok(remote) if remote.url() == Some(url) => Ok(()),
            Ok(_) => self
                .repo
                .remote_set_url(name, url)
                .map_err(GitError::internal),
            Err(e) if e.code() == git2::ErrorCode::NotFound => {
                self.repo.remote(name, url).map_err(GitError::internal)?;
                Ok(())
            }
            Err(e) => Err(GitError::internal(e)),
        }
    }

    /// Fetch `branch` from `remote` into its remote-tracking ref.
    pub fn fetch_branch(
        &self,
        remote: &str,
        branch: &BranchName,
        creds: &Credentials,
    ) -> Result<(), GitError> {
        let mut handle = self.repo.find_remote(remote).map_err(GitError::internal)?;
        let mut fetch_options = git2::FetchOptions::new();
        fetch_options.remote_callbacks(creds.callbacks(self.repo.config().ok()));

        let refspec = branch.fetch_refspec(remote);
        handle
            .fetch(&[refspec.as_str()], Some(&mut fetch_options), None)
            .map_err(|e| GitError::RemoteUnavailable {
                message: e.message().to_string(),
            })
    }

    /// Push `branch` to the same branch on `remote`, never forcing.
    pub fn push_branch(
        &self,
        remote: &str,
        branch: &BranchName,
        creds: &Credentials,
    ) -> Result<(), GitError> {
        let mut handle = self.repo.find_remote(remote).map_err(GitError::internal)?;
        let refspec = branch.push_refspec();
        let rejection: RefCell<Option<String>> = RefCell::new(None);

        {
            let mut callbacks = creds.callbacks(self.repo.config().ok());
            callbacks.push_update_reference(|_refname, status| {
                if let Some(msg) = status {
                    *rejection.borrow_mut() = Some(msg.to_string());
                }
                Ok(())
            });

            let mut push_options = git2::PushOptions::new();
            push_options.remote_callbacks(callbacks);

            handle
                .push(&[refspec.as_str()], Some(&mut push_options))
                .map_err(GitError::from_push)?;
        }

        if let Some(message) = rejection.into_inner() {
            return Err(GitError::PushRejected { message });
        }
        Ok(())
    }
}

fn to_git2(oid: &Oid) -> Result<git2::Oid, GitError> {
    git2::Oid::from_str(oid.as_str()).map_err(|e| GitError::from_git2(e, oid.as_str()))
}

fn to_utc(time: git2::Time) -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::from_timestamp(time.seconds(), 0).unwrap_or_default()
}

/// Strip userinfo from a URL before it reaches a log line or error message.
pub fn redact(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let authority_end = rest.find('/').unwrap_or(rest.len());
    match rest[..authority_end].rfind('@') {
        Some(at) => format!("{scheme}://***@{}", &rest[at + 1..]),
        None => url.to_string(),
    }
}
