//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Example
//!
//! ```toml
//! mode = "versioned"
//!
//! [remote]
//! url = "https://github.com/example/site.git"
//! branch = "main"
//! token_env = "BATCHPRESS_TOKEN"
//!
//! [working_copy]
//! clone_dir = "/srv/cms/site"
//!
//! [engine]
//! lock_timeout_ms = 15000
//! publish_retries = 1
//!
//! [author]
//! name = "Site CMS"
//! email = "cms@example.org"
//! ```
//!
//! # Validation
//!
//! Values are validated after parsing: the branch must be a valid branch
//! name, versioned mode needs a remote URL and a clone directory, and the
//! lock timeout must be non-zero.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::BranchName;

/// Which backend the process runs with. Chosen once at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Shared git working copy with batched publishing.
    #[default]
    Versioned,
    /// Plain directory, no history, nothing to publish.
    LocalOnly,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Versioned => "versioned",
            Mode::LocalOnly => "local-only",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// On-disk configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Backend mode (default: versioned)
    pub mode: Option<Mode>,

    /// Remote endpoint
    pub remote: Option<RemoteConfig>,

    /// Working copy location
    pub working_copy: Option<WorkingCopyConfig>,

    /// Local-only mode settings
    pub local: Option<LocalConfig>,

    /// Engine tuning
    pub engine: Option<EngineTuning>,

    /// Default commit author
    pub author: Option<AuthorConfig>,
}

impl ConfigFile {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(remote) = &self.remote {
            remote.validate()?;
        }
        if let Some(engine) = &self.engine {
            engine.validate()?;
        }

        if self.mode.unwrap_or_default() == Mode::Versioned {
            let has_url = self
                .remote
                .as_ref()
                .and_then(|r| r.url.as_deref())
                .is_some_and(|u| !u.is_empty());
            if !has_url {
                return Err(ConfigError::InvalidValue(
                    "versioned mode requires remote.url".to_string(),
                ));
            }
            let has_clone_dir = self
                .working_copy
                .as_ref()
                .and_then(|w| w.clone_dir.as_ref())
                .is_some();
            if !has_clone_dir {
                return Err(ConfigError::InvalidValue(
                    "versioned mode requires working_copy.clone_dir".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Remote endpoint configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteConfig {
    /// Remote URL (https, ssh, or a local path)
    pub url: Option<String>,

    /// Branch to publish (default: "main")
    pub branch: Option<String>,

    /// Remote name inside the clone (default: "origin")
    pub name: Option<String>,

    /// Environment variable holding the auth token (default: BATCHPRESS_TOKEN)
    pub token_env: Option<String>,
}

impl RemoteConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(branch) = &self.branch {
            BranchName::new(branch).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid remote.branch: {}", e))
            })?;
        }
        if let Some(name) = &self.name {
            if name.is_empty() || name.contains('/') || name.contains(char::is_whitespace) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid remote.name '{}'",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Working copy location.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct WorkingCopyConfig {
    /// Where the clone lives
    pub clone_dir: Option<PathBuf>,

    /// Lock file path (default: `<clone_dir>.lock`)
    pub lock_path: Option<PathBuf>,
}

/// Local-only mode settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LocalConfig {
    /// Directory receiving writes in local-only mode (default: "output")
    pub output_dir: Option<PathBuf>,
}

/// Engine tuning knobs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EngineTuning {
    /// Bounded wait for exclusive access, in milliseconds
    pub lock_timeout_ms: Option<u64>,

    /// How many times publish re-reconciles and retries after a rejected push
    pub publish_retries: Option<u32>,
}

impl EngineTuning {
    /// Upper bound on publish retries; more than this hides a real problem.
    pub const MAX_PUBLISH_RETRIES: u32 = 5;

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lock_timeout_ms == Some(0) {
            return Err(ConfigError::InvalidValue(
                "engine.lock_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if let Some(retries) = self.publish_retries {
            if retries > Self::MAX_PUBLISH_RETRIES {
                return Err(ConfigError::InvalidValue(format!(
                    "engine.publish_retries must be at most {}",
                    Self::MAX_PUBLISH_RETRIES
                )));
            }
        }
        Ok(())
    }
}

/// Default author for commits made without an explicit one.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AuthorConfig {
    pub name: Option<String>,
    pub email: Option<String>,
}
