//! Integration tests for the publish engine.
//!
//! Each test builds a bare "origin" repository plus a seed clone that plays
//! the part of an external writer (another deploy, a developer pushing by
//! hand). The engine's own working copies are cloned from origin on first
//! use, exactly as in production.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;

use batchpress::core::config::Settings;
use batchpress::core::types::{Author, BranchName, ContentPath};
use batchpress::engine::{
    open_store, CommitOutcome, CommitSummary, ContentStore, EngineError, MutationBatch,
    ReconcileOutcome, VersionedStore,
};

// =============================================================================
// Test Fixtures
// =============================================================================

/// A bare origin plus an external writer's clone.
struct Origin {
    dir: TempDir,
}

impl Origin {
    /// Create origin with `README.md` and `content/about.md` on main.
    fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let bare = dir.path().join("origin.git");
        let seed = dir.path().join("seed");
        std::fs::create_dir_all(&bare).unwrap();
        std::fs::create_dir_all(&seed).unwrap();

        run_git(&bare, &["init", "--bare"]);
        run_git(&bare, &["symbolic-ref", "HEAD", "refs/heads/main"]);

        run_git(&seed, &["init"]);
        run_git(&seed, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        run_git(&seed, &["config", "user.email", "external@example.com"]);
        run_git(&seed, &["config", "user.name", "External Writer"]);
        std::fs::write(seed.join("README.md"), "# Site\n").unwrap();
        std::fs::create_dir_all(seed.join("content")).unwrap();
        std::fs::write(seed.join("content/about.md"), "About us\n").unwrap();
        run_git(&seed, &["add", "."]);
        run_git(&seed, &["commit", "-m", "Initial content"]);
        run_git(&seed, &["remote", "add", "origin", bare.to_str().unwrap()]);
        run_git(&seed, &["push", "origin", "main"]);

        Self { dir }
    }

    fn bare(&self) -> PathBuf {
        self.dir.path().join("origin.git")
    }

    fn seed(&self) -> PathBuf {
        self.dir.path().join("seed")
    }

    fn settings(&self, clone_name: &str) -> Settings {
        Settings::versioned(
            self.bare().display().to_string(),
            self.dir.path().join(clone_name),
            BranchName::new("main").unwrap(),
        )
        .with_lock_timeout(Duration::from_secs(10))
    }

    /// A versioned store with its own clone directory.
    fn store(&self, clone_name: &str) -> VersionedStore {
        VersionedStore::new(&self.settings(clone_name))
    }

    fn clone_dir(&self, clone_name: &str) -> PathBuf {
        self.dir.path().join(clone_name)
    }

    /// Commit and push a file from the external writer.
    fn external_commit(&self, path: &str, content: &str, message: &str) {
        let seed = self.seed();
        run_git(&seed, &["fetch", "origin"]);
        run_git(&seed, &["reset", "--hard", "origin/main"]);
        let full = seed.join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full, content).unwrap();
        run_git(&seed, &["add", path]);
        run_git(&seed, &["commit", "-m", message]);
        run_git(&seed, &["push", "origin", "main"]);
    }

    fn remote_head(&self) -> String {
        git_output(&self.bare(), &["rev-parse", "refs/heads/main"])
    }

    fn remote_file(&self, path: &str) -> Option<String> {
        let output = Command::new("git")
            .args(["show", &format!("main:{}", path)])
            .current_dir(self.bare())
            .output()
            .expect("git show failed");
        output
            .status
            .success()
            .then(|| String::from_utf8(output.stdout).unwrap())
    }

    fn remote_commit_count(&self) -> usize {
        git_output(&self.bare(), &["rev-list", "--count", "refs/heads/main"])
            .parse()
            .unwrap()
    }
}

fn run_git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed");

    if !output.status.success() {
        panic!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

fn git_output(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

fn author() -> Author {
    Author::new("Editor", "editor@example.org")
}

fn write_batch(path: &str, content: &str) -> MutationBatch {
    MutationBatch::new().write(path, content).unwrap()
}

fn messages(commits: &[CommitSummary]) -> Vec<&str> {
    commits.iter().map(|c| c.message.as_str()).collect()
}

/// Tracked-file status of a clone, as `git status --porcelain` sees it.
fn porcelain(dir: &Path) -> String {
    git_output(dir, &["status", "--porcelain", "--untracked-files=no"])
}

// =============================================================================
// Working copy lifecycle
// =============================================================================

mod working_copy {
    use super::*;

    #[test]
    fn first_use_clones_the_remote_branch() {
        let origin = Origin::new();
        let store = origin.store("site");

        assert_eq!(store.ensure_fresh().unwrap(), ReconcileOutcome::UpToDate);
        let about = std::fs::read_to_string(origin.clone_dir("site").join("content/about.md"));
        assert_eq!(about.unwrap(), "About us\n");
        assert_eq!(
            git_output(&origin.clone_dir("site"), &["rev-parse", "HEAD"]),
            origin.remote_head()
        );
    }

    #[test]
    fn repeated_sync_is_up_to_date() {
        let origin = Origin::new();
        let store = origin.store("site");
        store.ensure_fresh().unwrap();
        assert_eq!(store.ensure_fresh().unwrap(), ReconcileOutcome::UpToDate);
        assert_eq!(store.ensure_fresh().unwrap(), ReconcileOutcome::UpToDate);
    }

    #[test]
    fn non_repository_directory_is_corrupt() {
        let origin = Origin::new();
        let clone = origin.clone_dir("site");
        std::fs::create_dir_all(&clone).unwrap();
        std::fs::write(clone.join("stray.txt"), "not a repo").unwrap();

        let err = origin.store("site").ensure_fresh().unwrap_err();
        assert!(matches!(err, EngineError::CorruptRepository { .. }), "{err:?}");
    }

    #[test]
    fn stray_edits_are_cleaned_before_a_batch() {
        let origin = Origin::new();
        let store = origin.store("site");
        store.ensure_fresh().unwrap();

        let clone = origin.clone_dir("site");
        std::fs::write(clone.join("README.md"), "half-written by a crash").unwrap();

        store
            .apply(&write_batch("content/news.md", "News\n"), "Add news", &author())
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(clone.join("README.md")).unwrap(),
            "# Site\n"
        );
        assert_eq!(porcelain(&clone), "");
    }

    #[test]
    fn remote_url_is_refreshed_on_each_sync() {
        let origin = Origin::new();
        origin.store("site").ensure_fresh().unwrap();

        let clone = origin.clone_dir("site");
        run_git(&clone, &["remote", "set-url", "origin", "/nowhere/else.git"]);

        assert!(origin.store("site").ensure_fresh().is_ok());
        assert_eq!(
            git_output(&clone, &["remote", "get-url", "origin"]),
            origin.bare().display().to_string()
        );
    }
}

// =============================================================================
// Commit batcher
// =============================================================================

mod commit_batcher {
    use super::*;

    #[test]
    fn identical_content_is_a_noop() {
        let origin = Origin::new();
        let store = origin.store("site");
        let batch = write_batch("content/about.md", "About us\n");

        for _ in 0..3 {
            let applied = store.apply(&batch, "Touch about", &author()).unwrap();
            assert_eq!(applied.commit, CommitOutcome::NoOp);
        }
        assert!(!store.has_unpushed_commits().unwrap());
        assert_eq!(
            git_output(&origin.clone_dir("site"), &["rev-list", "--count", "HEAD"]),
            "1"
        );
    }

    #[test]
    fn deleting_a_missing_file_is_a_noop() {
        let origin = Origin::new();
        let store = origin.store("site");
        let batch = MutationBatch::new().delete("content/never.md").unwrap();
        assert!(store.apply(&batch, "rm", &author()).unwrap().commit.is_noop());
    }

    #[test]
    fn commit_records_author_message_and_paths() {
        let origin = Origin::new();
        let store = origin.store("site");
        let batch = MutationBatch::new()
            .write("content/events/gala.md", "Gala\n")
            .unwrap()
            .delete("content/about.md")
            .unwrap();

        let applied = store.apply(&batch, "Add gala, drop about", &author()).unwrap();
        let commit = applied.commit.commit().expect("a commit").clone();

        assert_eq!(commit.message, "Add gala, drop about");
        assert_eq!(commit.author_name, "Editor");
        assert_eq!(commit.author_email, "editor@example.org");
        let paths: Vec<_> = commit.paths.iter().map(|p| p.as_str()).collect();
        assert_eq!(paths, ["content/events/gala.md", "content/about.md"]);

        let clone = origin.clone_dir("site");
        assert!(!clone.join("content/about.md").exists());
        assert_eq!(
            git_output(&clone, &["show", "--name-only", "--format=", "HEAD"]),
            "content/about.md\ncontent/events/gala.md"
        );
        assert_eq!(porcelain(&clone), "");
    }

    #[test]
    fn failing_third_write_leaves_tree_and_history_untouched() {
        let origin = Origin::new();
        let store = origin.store("site");
        store.ensure_fresh().unwrap();
        let clone = origin.clone_dir("site");
        let head_before = git_output(&clone, &["rev-parse", "HEAD"]);

        // Write #3 targets a path below an existing file, which cannot exist.
        let batch = MutationBatch::new()
            .write("content/one.md", "1")
            .unwrap()
            .write("content/about.md", "changed")
            .unwrap()
            .write("README.md/nested.md", "3")
            .unwrap()
            .write("content/four.md", "4")
            .unwrap()
            .delete("README.md")
            .unwrap();

        let err = store.apply(&batch, "Five writes", &author()).unwrap_err();
        match &err {
            EngineError::Write { path, .. } => assert_eq!(path, "README.md/nested.md"),
            other => panic!("expected write error, got {other:?}"),
        }

        assert_eq!(git_output(&clone, &["rev-parse", "HEAD"]), head_before);
        assert_eq!(porcelain(&clone), "");
        assert!(!clone.join("content/one.md").exists());
        assert!(!clone.join("content/four.md").exists());
        assert_eq!(
            std::fs::read_to_string(clone.join("content/about.md")).unwrap(),
            "About us\n"
        );
        assert_eq!(
            std::fs::read_to_string(clone.join("README.md")).unwrap(),
            "# Site\n"
        );
        assert!(!store.has_unpushed_commits().unwrap());
    }

    #[test]
    fn failed_commit_removes_every_written_file() {
        let origin = Origin::new();
        let store = origin.store("site");
        store.ensure_fresh().unwrap();
        let clone = origin.clone_dir("site");
        let head_before = git_output(&clone, &["rev-parse", "HEAD"]);

        // Every write lands on disk; git then refuses the signature.
        let bad_author = Author::new("Mallory", "mallory<at>example.com");
        let batch = MutationBatch::new()
            .write("content/fresh.md", "new page")
            .unwrap()
            .write("content/deep/nested/page.md", "deeper")
            .unwrap()
            .write("content/about.md", "changed")
            .unwrap()
            .delete("README.md")
            .unwrap();

        let err = store.apply(&batch, "Never lands", &bad_author).unwrap_err();
        assert_eq!(err.kind(), "commit_error", "got {err:?}");

        assert_eq!(git_output(&clone, &["rev-parse", "HEAD"]), head_before);
        assert!(!store.has_unpushed_commits().unwrap());
        assert_eq!(
            git_output(&clone, &["status", "--porcelain", "--untracked-files=all"]),
            ""
        );
        assert!(!clone.join("content/fresh.md").exists());
        assert!(!clone.join("content/deep/nested/page.md").exists());
        assert_eq!(
            std::fs::read_to_string(clone.join("content/about.md")).unwrap(),
            "About us\n"
        );
        assert_eq!(
            std::fs::read_to_string(clone.join("README.md")).unwrap(),
            "# Site\n"
        );

        let fresh = ContentPath::new("content/fresh.md").unwrap();
        assert_eq!(store.read_file(&fresh).unwrap(), None);

        // The next batch starts from the clean tree.
        let outcome = store
            .apply(&write_batch("content/fresh.md", "landed"), "Lands", &author())
            .unwrap();
        assert!(outcome.commit.commit().is_some());
        assert_eq!(messages(&store.unpushed_changes().unwrap()), ["Lands"]);
    }

    #[test]
    fn nested_git_directory_never_reaches_the_tree() {
        let origin = Origin::new();
        let store = origin.store("site");
        store.ensure_fresh().unwrap();
        let clone = origin.clone_dir("site");

        assert!(MutationBatch::new().write("content/.git/evil.md", "x").is_err());
        assert!(MutationBatch::new().write("content/.GIT/evil.md", "x").is_err());
        assert!(!clone.join("content/.git").exists());
        assert!(!clone.join("content/.GIT").exists());
    }
}

// =============================================================================
// Pending ledger and publishing
// =============================================================================

mod pending_and_publish {
    use super::*;

    #[test]
    fn pending_lists_commits_in_creation_order_until_published() {
        let origin = Origin::new();
        let store = origin.store("site");

        for i in 1..=3 {
            store
                .apply(
                    &write_batch(&format!("content/post-{i}.md"), &format!("Post {i}\n")),
                    &format!("Add post {i}"),
                    &author(),
                )
                .unwrap();
        }

        let pending = store.unpushed_changes().unwrap();
        assert_eq!(messages(&pending), ["Add post 1", "Add post 2", "Add post 3"]);
        assert_eq!(store.status().unwrap().count, 3);
        assert!(pending.iter().all(|c| c.author == "Editor"));
        // Nothing reached the remote yet.
        assert_eq!(origin.remote_commit_count(), 1);

        let report = store.publish().unwrap();
        assert_eq!(report.pushed, 3);
        assert_eq!(report.attempts, 1);
        assert!(store.unpushed_changes().unwrap().is_empty());
        assert_eq!(origin.remote_commit_count(), 4);
        assert_eq!(origin.remote_file("content/post-2.md").unwrap(), "Post 2\n");
        assert_eq!(
            git_output(&origin.clone_dir("site"), &["rev-parse", "HEAD"]),
            origin.remote_head()
        );
    }

    #[test]
    fn publishing_nothing_pushes_nothing() {
        let origin = Origin::new();
        let store = origin.store("site");
        let before = origin.remote_head();

        assert_eq!(store.publish().unwrap().pushed, 0);
        assert_eq!(store.push_to_remote().unwrap().pushed, 0);
        assert_eq!(origin.remote_head(), before);
    }

    #[test]
    fn apply_and_publish_lands_immediately() {
        let origin = Origin::new();
        let store = origin.store("site");

        let (applied, report) = store
            .apply_and_publish(&write_batch("content/urgent.md", "Now\n"), "Urgent", &author())
            .unwrap();
        assert!(applied.commit.commit().is_some());
        assert_eq!(report.pushed, 1);
        assert_eq!(origin.remote_file("content/urgent.md").unwrap(), "Now\n");
        assert!(!store.has_unpushed_commits().unwrap());
    }

    #[test]
    fn rejected_push_keeps_commits_and_publish_recovers() {
        let origin = Origin::new();
        let first = origin.store("first");
        let second = origin.store("second");
        first.ensure_fresh().unwrap();
        second.ensure_fresh().unwrap();

        first
            .apply(&write_batch("content/a.md", "A\n"), "Add a", &author())
            .unwrap();
        second
            .apply(&write_batch("content/b.md", "B\n"), "Add b", &author())
            .unwrap();
        first.publish().unwrap();

        // Pushing without reconciling races the first writer's publish.
        let err = second.push_to_remote().unwrap_err();
        assert!(matches!(err, EngineError::Rejected { .. }), "{err:?}");
        assert_eq!(messages(&second.unpushed_changes().unwrap()), ["Add b"]);

        let report = second.publish().unwrap();
        assert_eq!(report.pushed, 1);
        assert_eq!(report.reconciles, [ReconcileOutcome::Rebased { commits: 1 }]);
        assert_eq!(origin.remote_file("content/a.md").unwrap(), "A\n");
        assert_eq!(origin.remote_file("content/b.md").unwrap(), "B\n");
        assert!(second.unpushed_changes().unwrap().is_empty());
    }

    #[test]
    fn unavailable_remote_keeps_commits_pending() {
        let origin = Origin::new();
        let store = origin.store("site");
        store
            .apply(&write_batch("content/a.md", "A\n"), "Add a", &author())
            .unwrap();

        let moved = origin.dir.path().join("origin-offline.git");
        std::fs::rename(origin.bare(), &moved).unwrap();

        let err = store.push_to_remote().unwrap_err();
        assert!(matches!(err, EngineError::Unavailable { .. }), "{err:?}");
        let err = store.publish().unwrap_err();
        assert!(matches!(err, EngineError::Unavailable { .. }), "{err:?}");
        assert_eq!(messages(&store.unpushed_changes().unwrap()), ["Add a"]);

        std::fs::rename(&moved, origin.bare()).unwrap();
        assert_eq!(store.publish().unwrap().pushed, 1);
        assert!(store.unpushed_changes().unwrap().is_empty());
    }
}

// =============================================================================
// Reconciler
// =============================================================================

mod reconciler {
    use super::*;

    #[test]
    fn remote_ahead_fast_forwards() {
        let origin = Origin::new();
        let store = origin.store("site");
        store.ensure_fresh().unwrap();

        origin.external_commit("content/external.md", "External\n", "External edit");

        assert_eq!(store.ensure_fresh().unwrap(), ReconcileOutcome::FastForwarded);
        let clone = origin.clone_dir("site");
        assert_eq!(
            std::fs::read_to_string(clone.join("content/external.md")).unwrap(),
            "External\n"
        );
        assert_eq!(git_output(&clone, &["rev-parse", "HEAD"]), origin.remote_head());
    }

    #[test]
    fn local_ahead_is_up_to_date() {
        let origin = Origin::new();
        let store = origin.store("site");
        store
            .apply(&write_batch("content/a.md", "A\n"), "Add a", &author())
            .unwrap();
        assert_eq!(store.ensure_fresh().unwrap(), ReconcileOutcome::UpToDate);
        assert_eq!(store.unpushed_changes().unwrap().len(), 1);
    }

    #[test]
    fn unrelated_remote_change_keeps_pending_commits() {
        let origin = Origin::new();
        let store = origin.store("site");
        store
            .apply(&write_batch("content/local-1.md", "L1\n"), "Local one", &author())
            .unwrap();
        store
            .apply(&write_batch("content/local-2.md", "L2\n"), "Local two", &author())
            .unwrap();
        let before: Vec<String> = store
            .unpushed_changes()
            .unwrap()
            .into_iter()
            .map(|c| c.sha)
            .collect();

        origin.external_commit("content/external.md", "External\n", "External edit");

        assert_eq!(
            store.ensure_fresh().unwrap(),
            ReconcileOutcome::Rebased { commits: 2 }
        );

        let pending = store.unpushed_changes().unwrap();
        assert_eq!(messages(&pending), ["Local one", "Local two"]);
        assert!(pending.iter().all(|c| !before.contains(&c.sha)), "replayed commits get new shas");

        let clone = origin.clone_dir("site");
        assert_eq!(
            git_output(&clone, &["show", "--name-only", "--format=", "HEAD~1"]),
            "content/local-1.md"
        );
        assert_eq!(
            std::fs::read_to_string(clone.join("content/external.md")).unwrap(),
            "External\n"
        );
        assert_eq!(porcelain(&clone), "");
        assert!(!git_output(&clone, &["for-each-ref", "refs/batchpress"]).contains("reconcile"));

        store.publish().unwrap();
        assert_eq!(origin.remote_file("content/local-2.md").unwrap(), "L2\n");
        assert_eq!(origin.remote_file("content/external.md").unwrap(), "External\n");
    }

    #[test]
    fn change_already_on_remote_is_dropped_not_duplicated() {
        let origin = Origin::new();
        let store = origin.store("site");
        store
            .apply(&write_batch("content/same.md", "Same\n"), "Local same", &author())
            .unwrap();

        origin.external_commit("content/same.md", "Same\n", "Remote same");

        assert_eq!(store.ensure_fresh().unwrap(), ReconcileOutcome::FastForwarded);
        assert!(store.unpushed_changes().unwrap().is_empty());
    }

    #[test]
    fn conflicting_remote_change_resets_and_reports_discards() {
        let origin = Origin::new();
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        let store = origin.store("site").with_observer(move |discarded: &[CommitSummary]| {
            recorder
                .lock()
                .unwrap()
                .extend(discarded.iter().map(|c| c.message.clone()));
        });

        store
            .apply(&write_batch("content/about.md", "Local about\n"), "Local about", &author())
            .unwrap();
        origin.external_commit("content/about.md", "Remote about\n", "Remote about");

        let outcome = store.ensure_fresh().unwrap();
        assert_eq!(outcome, ReconcileOutcome::Reset { discarded: 1 });
        assert!(outcome.is_lossy());
        assert_eq!(*seen.lock().unwrap(), ["Local about"]);

        let clone = origin.clone_dir("site");
        assert!(store.unpushed_changes().unwrap().is_empty());
        assert_eq!(git_output(&clone, &["rev-parse", "HEAD"]), origin.remote_head());
        assert_eq!(
            std::fs::read_to_string(clone.join("content/about.md")).unwrap(),
            "Remote about\n"
        );
        assert_eq!(porcelain(&clone), "");
    }

    #[test]
    fn publish_reports_reset_when_local_work_conflicts() {
        let origin = Origin::new();
        let store = origin.store("site");
        store
            .apply(&write_batch("README.md", "Local readme\n"), "Local readme", &author())
            .unwrap();
        origin.external_commit("README.md", "Remote readme\n", "Remote readme");

        let report = store.publish().unwrap();
        assert_eq!(report.pushed, 0);
        assert_eq!(report.discarded(), 1);
        assert_eq!(origin.remote_file("README.md").unwrap(), "Remote readme\n");
    }
}

// =============================================================================
// Mutation serializer
// =============================================================================

mod serializer {
    use super::*;

    #[test]
    fn concurrent_batches_never_interleave() {
        let origin = Origin::new();
        let store = Arc::new(origin.store("site"));
        store.ensure_fresh().unwrap();

        let handles: Vec<_> = ["left", "right"]
            .into_iter()
            .map(|name| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let batch = MutationBatch::new()
                        .write(&format!("content/{name}-1.md"), name)
                        .unwrap()
                        .write(&format!("content/{name}-2.md"), name)
                        .unwrap();
                    store
                        .apply(&batch, &format!("Batch {name}"), &author())
                        .unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap().commit.commit().is_some());
        }

        let pending = store.unpushed_changes().unwrap();
        assert_eq!(pending.len(), 2);

        let clone = origin.clone_dir("site");
        for commit in &pending {
            let name = commit.message.trim_start_matches("Batch ");
            let files = git_output(&clone, &["show", "--name-only", "--format=", &commit.sha]);
            assert_eq!(
                files,
                format!("content/{name}-1.md\ncontent/{name}-2.md"),
                "each commit holds exactly its own batch"
            );
        }
        assert_eq!(porcelain(&clone), "");
    }

    #[test]
    fn held_session_makes_writers_busy() {
        let origin = Origin::new();
        let settings = origin.settings("site").with_lock_timeout(Duration::from_millis(100));
        let store = Arc::new(VersionedStore::new(&settings));

        let session = store.session().unwrap();
        let contender = Arc::clone(&store);
        let result = std::thread::spawn(move || {
            contender
                .apply(&write_batch("content/a.md", "A"), "Add a", &author())
                .map(|_| ())
        })
        .join()
        .unwrap();
        assert!(matches!(result, Err(EngineError::Busy { .. })), "{result:?}");

        // Readers are never blocked.
        assert!(store.unpushed_changes().is_ok());
        drop(session);
        assert!(store
            .apply(&write_batch("content/a.md", "A"), "Add a", &author())
            .is_ok());
    }

    #[test]
    fn second_instance_on_same_clone_waits_on_file_lock() {
        let origin = Origin::new();
        let first = origin.store("site");
        first.ensure_fresh().unwrap();
        let second = VersionedStore::new(
            &origin.settings("site").with_lock_timeout(Duration::from_millis(100)),
        );

        let _held = first.session().unwrap();
        let err = second
            .apply(&write_batch("content/a.md", "A"), "Add a", &author())
            .unwrap_err();
        assert!(matches!(err, EngineError::Busy { .. }), "{err:?}");
    }
}

// =============================================================================
// Offline fallback and reads
// =============================================================================

mod offline_and_reads {
    use super::*;

    #[test]
    fn local_only_mode_never_has_pending_changes() {
        let temp = TempDir::new().unwrap();
        let settings = Settings::local_only(temp.path().join("output"), None);
        let store = open_store(&settings);

        for i in 0..10 {
            let applied = store
                .apply(&write_batch(&format!("post-{i}.md"), "x"), "msg", &author())
                .unwrap();
            assert_eq!(applied.commit, CommitOutcome::Offline);
        }
        assert!(store.unpushed_changes().unwrap().is_empty());
        assert_eq!(store.publish().unwrap().pushed, 0);
        assert_eq!(store.list_files("", Some("md")).unwrap().len(), 10);
    }

    #[test]
    fn versioned_reads_see_committed_content() {
        let origin = Origin::new();
        let store = origin.store("site");
        store
            .apply(
                &write_batch("content/events/gala.md", "Annual Gala\nTickets soon\n"),
                "Add gala",
                &author(),
            )
            .unwrap();

        let gala = ContentPath::new("content/events/gala.md").unwrap();
        assert_eq!(
            store.read_file(&gala).unwrap().unwrap(),
            b"Annual Gala\nTickets soon\n"
        );

        let listed: Vec<String> = store
            .list_files("content", Some("md"))
            .unwrap()
            .into_iter()
            .map(|p| p.to_string())
            .collect();
        assert_eq!(listed, ["content/about.md", "content/events/gala.md"]);

        let hits = store.search("content", "tickets").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].line_number, 2);
    }
}
