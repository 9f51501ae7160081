//! core::paths
//!
//! Centralized path routing for the working copy and its bookkeeping files.
//!
//! # Storage Layout
//!
//! - `<clone_dir>/` - the single on-disk clone of the remote content tree
//! - `<clone_dir>.lock` - exclusive lock file guarding the clone (default)
//! - `<output_dir>/` - plain directory used in local-only mode
//!
//! The lock file lives beside the clone rather than inside `.git/` so that
//! it exists before the first clone is made; cloning is itself a mutation
//! that must be serialized.
//!
//! # Example
//!
//! ```
//! use batchpress::core::paths::StorePaths;
//! use std::path::PathBuf;
//!
//! let paths = StorePaths::new(PathBuf::from("/srv/cms/site"), None);
//! assert_eq!(paths.lock_path(), PathBuf::from("/srv/cms/site.lock"));
//! ```

use std::path::{Path, PathBuf};

/// Paths for one working copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    /// The clone directory (the working tree root).
    pub clone_dir: PathBuf,
    lock_override: Option<PathBuf>,
}

impl StorePaths {
    /// Create paths for a clone directory, with an optional explicit lock path.
    pub fn new(clone_dir: PathBuf, lock_path: Option<PathBuf>) -> Self {
        Self {
            clone_dir,
            lock_override: lock_path,
        }
    }

    /// Path to the exclusive lock file.
    ///
    /// Defaults to `<clone_dir>.lock`.
    pub fn lock_path(&self) -> PathBuf {
        if let Some(path) = &self.lock_override {
            return path.clone();
        }
        let mut name = self
            .clone_dir
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "working-copy".into());
        name.push(".lock");
        self.clone_dir.with_file_name(name)
    }

    /// Path to the `.git` directory of the clone.
    pub fn git_dir(&self) -> PathBuf {
        self.clone_dir.join(".git")
    }

    /// Whether a clone has been made at `clone_dir`.
    pub fn is_cloned(&self) -> bool {
        self.git_dir().exists()
    }

    /// The clone directory.
    pub fn work_dir(&self) -> &Path {
        &self.clone_dir
    }
}
