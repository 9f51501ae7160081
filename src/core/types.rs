//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`BranchName`] - Validated Git branch name
//! - [`Oid`] - Git object identifier (SHA)
//! - [`ContentPath`] - Validated path relative to the content tree root
//! - [`Author`] - Name and identity recorded on local commits
//!
//! # Validation
//!
//! These types enforce validity at construction time. A `ContentPath` that
//! exists is always relative, normalized, and outside `.git/`, so the
//! engine never has to re-check path safety at write time.
//!
//! # Examples
//!
//! ```
//! use batchpress::core::types::{BranchName, ContentPath, Oid};
//!
//! let branch = BranchName::new("main").unwrap();
//! let oid = Oid::new("abc123def4567890abc123def4567890abc12345").unwrap();
//! let path = ContentPath::new("src/content/articles/hello.md").unwrap();
//!
//! assert!(BranchName::new("invalid..name").is_err());
//! assert!(ContentPath::new("../outside.md").is_err());
//! ```

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid object id: {0}")]
    InvalidOid(String),

    #[error("invalid content path: {0}")]
    InvalidPath(String),
}

/// A validated Git branch name.
///
/// Branch names must conform to Git's refname rules (see `git check-ref-format`):
/// - Cannot be empty or exactly `@`
/// - Cannot start with `.` or `-`
/// - Cannot end with `.lock` or `/`
/// - Cannot contain `..`, `@{`, `//`, spaces, `~ ^ : \ ? * [`, or control characters
///
/// # Example
///
/// ```
/// use batchpress::core::types::BranchName;
///
/// let name = BranchName::new("main").unwrap();
/// assert_eq!(name.local_ref(), "refs/heads/main");
/// assert_eq!(name.remote_tracking_ref("origin"), "refs/remotes/origin/main");
///
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new("has space").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        let reject = |why: &str| Err(TypeError::InvalidBranchName(why.to_string()));

        if name.is_empty() {
            return reject("branch name cannot be empty");
        }
        if name == "@" {
            return reject("branch name cannot be '@' (reserved)");
        }
        if name.starts_with('.') || name.starts_with('-') {
            return reject("branch name cannot start with '.' or '-'");
        }
        if name.ends_with(".lock") || name.ends_with('/') {
            return reject("branch name cannot end with '.lock' or '/'");
        }
        for bad in ["..", "@{", "//"] {
            if name.contains(bad) {
                return Err(TypeError::InvalidBranchName(format!(
                    "branch name cannot contain '{bad}'"
                )));
            }
        }

        const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];
        if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c)) {
            return Err(TypeError::InvalidBranchName(format!(
                "branch name cannot contain '{c}'"
            )));
        }
        if name.chars().any(|c| c.is_ascii_control()) {
            return reject("branch name cannot contain control characters");
        }

        for component in name.split('/') {
            if component.starts_with('.') || component.ends_with(".lock") {
                return reject("path component cannot start with '.' or end with '.lock'");
            }
        }

        Ok(())
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The local branch ref, e.g. `refs/heads/main`.
    pub fn local_ref(&self) -> String {
        format!("refs/heads/{}", self.0)
    }

    /// The remote-tracking ref for this branch on `remote`.
    pub fn remote_tracking_ref(&self, remote: &str) -> String {
        format!("refs/remotes/{}/{}", remote, self.0)
    }

    /// The non-forcing refspec used to publish this branch.
    ///
    /// The absence of a leading `+` is what makes a diverged remote
    /// reject the push instead of being overwritten.
    pub fn push_refspec(&self) -> String {
        let local = self.local_ref();
        format!("{local}:{local}")
    }

    /// The refspec used to fetch this branch into its remote-tracking ref.
    pub fn fetch_refspec(&self, remote: &str) -> String {
        format!("+{}:{}", self.local_ref(), self.remote_tracking_ref(remote))
    }
}

impl Default for BranchName {
    /// `main`
    fn default() -> Self {
        Self("main".to_string())
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A Git object identifier (SHA-1 or SHA-256).
///
/// OIDs are normalized to lowercase for consistency.
///
/// # Example
///
/// ```
/// use batchpress::core::types::Oid;
///
/// let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(oid.as_str(), "abc123def4567890abc123def4567890abc12345");
/// assert_eq!(oid.short(8), "abc123de");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Create a new validated object id, normalized to lowercase.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` if the string is not a valid hex OID.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(
                "object id must be hexadecimal".into(),
            ));
        }
        Ok(Self(oid))
    }

    /// Get an abbreviated form of the OID.
    ///
    /// Returns the first `len` characters, or the full OID if shorter.
    pub fn short(&self, len: usize) -> &str {
        let end = len.min(self.0.len());
        &self.0[..end]
    }

    /// Get the object id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A path inside the content tree, relative to the working copy root.
///
/// Stored with forward slashes regardless of platform, since that is the
/// form git records in trees and the form callers see in commit summaries.
///
/// Rejected:
/// - empty paths and absolute paths
/// - `.` / `..` components (after normalization nothing may escape the root)
/// - a `.git` component at any depth, in any letter case
/// - NUL bytes
///
/// # Example
///
/// ```
/// use batchpress::core::types::ContentPath;
///
/// let p = ContentPath::new("./src/content//bios/jane.md").unwrap();
/// assert_eq!(p.as_str(), "src/content/bios/jane.md");
///
/// assert!(ContentPath::new("/etc/passwd").is_err());
/// assert!(ContentPath::new(".git/config").is_err());
/// assert!(ContentPath::new("content/.GIT/x.md").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentPath(String);

impl ContentPath {
    /// Create a validated, normalized content path.
    pub fn new(path: impl AsRef<str>) -> Result<Self, TypeError> {
        let raw = path.as_ref();
        let invalid = |why: &str| TypeError::InvalidPath(format!("{raw:?}: {why}"));

        if raw.is_empty() {
            return Err(invalid("path cannot be empty"));
        }
        if raw.contains('\0') {
            return Err(invalid("path cannot contain NUL"));
        }

        let unified = raw.replace('\\', "/");
        if unified.starts_with('/') || Path::new(&unified).is_absolute() {
            return Err(invalid("path must be relative"));
        }

        let mut parts = Vec::new();
        for component in Path::new(&unified).components() {
            match component {
                Component::Normal(part) => {
                    let part = part
                        .to_str()
                        .ok_or_else(|| invalid("path must be valid UTF-8"))?;
                    parts.push(part.to_string());
                }
                Component::CurDir => {}
                Component::ParentDir => return Err(invalid("path cannot contain '..'")),
                Component::RootDir | Component::Prefix(_) => {
                    return Err(invalid("path must be relative"))
                }
            }
        }

        if parts.is_empty() {
            return Err(invalid("path names no file"));
        }
        // git refuses to track these anywhere, and a nested one makes its
        // parent look like another repository.
        if parts.iter().any(|p| p.eq_ignore_ascii_case(".git")) {
            return Err(invalid("path cannot contain a .git component"));
        }

        Ok(Self(parts.join("/")))
    }

    /// Get the path as a string slice (forward slashes).
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve this path against a directory on disk.
    pub fn under(&self, root: &Path) -> PathBuf {
        self.0.split('/').fold(root.to_path_buf(), |acc, p| acc.join(p))
    }

    /// File extension, if any.
    pub fn extension(&self) -> Option<&str> {
        let name = self.0.rsplit('/').next()?;
        let (stem, ext) = name.rsplit_once('.')?;
        (!stem.is_empty()).then_some(ext)
    }
}

impl TryFrom<String> for ContentPath {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ContentPath> for String {
    fn from(path: ContentPath) -> Self {
        path.0
    }
}

impl std::fmt::Display for ContentPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Commit author: a display name and an identity (email).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub email: String,
}

impl Author {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

impl Default for Author {
    fn default() -> Self {
        Self::new("batchpress", "batchpress@localhost")
    }
}

impl std::fmt::Display for Author {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}
