//! core::config
//!
//! Configuration schema, loading, and resolution into engine settings.
//!
//! # Config Locations
//!
//! Searched in order (first hit wins):
//! 1. An explicit path passed by the caller (`bp --config <path>`)
//! 2. `$BATCHPRESS_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/batchpress/config.toml`
//! 4. `~/.batchpress/config.toml` (canonical write location)
//!
//! A missing file is not an error; defaults apply, which means local-only
//! operation is the only thing that works without any configuration.
//!
//! # Secrets
//!
//! The remote token is never read from the file. `remote.token_env` names an
//! environment variable, read once when settings are resolved.
//!
//! # Example
//!
//! ```no_run
//! use batchpress::core::config::Config;
//!
//! let config = Config::load(None).unwrap();
//! let settings = config.settings().unwrap();
//! println!("mode: {}", settings.mode);
//! ```

pub mod schema;

pub use schema::{
    AuthorConfig, ConfigFile, EngineTuning, LocalConfig, Mode, RemoteConfig, WorkingCopyConfig,
};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::core::paths::StorePaths;
use crate::core::types::{Author, BranchName};

/// Default bounded wait for exclusive access to the working copy.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(15);

/// Default number of re-reconcile-and-retry rounds after a rejected push.
pub const DEFAULT_PUBLISH_RETRIES: u32 = 1;

/// Default environment variable holding the remote token.
pub const DEFAULT_TOKEN_ENV: &str = "BATCHPRESS_TOKEN";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("home directory not found")]
    NoHomeDir,
}

/// Loaded configuration plus where it came from.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub file: ConfigFile,
    path: Option<PathBuf>,
}

impl Config {
    /// Load configuration, preferring `explicit` when given.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed or
    /// fails validation. An explicit path that does not exist is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => Self::discover(),
        };

        let Some(found) = path else {
            return Ok(Self::default());
        };
        let file = Self::read_file(&found)?;
        file.validate()?;

        Ok(Self {
            file,
            path: Some(found),
        })
    }

    /// Build a config from an in-memory file (already validated or not).
    pub fn from_file(file: ConfigFile) -> Result<Self, ConfigError> {
        file.validate()?;
        Ok(Self { file, path: None })
    }

    /// Path of the loaded file, if one was found.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn discover() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("BATCHPRESS_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("batchpress/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        let home = dirs::home_dir()?;
        let path = home.join(".batchpress/config.toml");
        path.exists().then_some(path)
    }

    fn read_file(path: &Path) -> Result<ConfigFile, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Canonical write location: `~/.batchpress/config.toml`.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".batchpress/config.toml"))
    }

    /// Write a config file atomically (temp file, fsync, rename).
    pub fn write_atomic(path: &Path, file: &ConfigFile) -> Result<(), ConfigError> {
        let write_err = |p: &Path, e| ConfigError::WriteError {
            path: p.to_path_buf(),
            source: e,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| write_err(path, e))?;
        }

        let contents =
            toml::to_string_pretty(file).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        let temp_path = path.with_extension("toml.tmp");
        let mut out = fs::File::create(&temp_path).map_err(|e| write_err(&temp_path, e))?;
        out.write_all(contents.as_bytes())
            .map_err(|e| write_err(&temp_path, e))?;
        out.sync_all().map_err(|e| write_err(&temp_path, e))?;

        fs::rename(&temp_path, path).map_err(|e| write_err(path, e))
    }

    // =========================================================================
    // Accessors with defaults
    // =========================================================================

    pub fn mode(&self) -> Mode {
        self.file.mode.unwrap_or_default()
    }

    /// Branch name. Defaults to "main".
    pub fn branch(&self) -> &str {
        self.file
            .remote
            .as_ref()
            .and_then(|r| r.branch.as_deref())
            .unwrap_or("main")
    }

    /// Remote name. Defaults to "origin".
    pub fn remote_name(&self) -> &str {
        self.file
            .remote
            .as_ref()
            .and_then(|r| r.name.as_deref())
            .unwrap_or("origin")
    }

    pub fn remote_url(&self) -> Option<&str> {
        self.file.remote.as_ref().and_then(|r| r.url.as_deref())
    }

    pub fn token_env(&self) -> &str {
        self.file
            .remote
            .as_ref()
            .and_then(|r| r.token_env.as_deref())
            .unwrap_or(DEFAULT_TOKEN_ENV)
    }

    pub fn lock_timeout(&self) -> Duration {
        self.file
            .engine
            .as_ref()
            .and_then(|e| e.lock_timeout_ms)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_LOCK_TIMEOUT)
    }

    pub fn publish_retries(&self) -> u32 {
        self.file
            .engine
            .as_ref()
            .and_then(|e| e.publish_retries)
            .unwrap_or(DEFAULT_PUBLISH_RETRIES)
    }

    /// Output directory for local-only mode. Defaults to `./output`.
    pub fn output_dir(&self) -> PathBuf {
        self.file
            .local
            .as_ref()
            .and_then(|l| l.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from("output"))
    }

    pub fn default_author(&self) -> Author {
        let fallback = Author::default();
        let configured = self.file.author.as_ref();
        Author::new(
            configured
                .and_then(|a| a.name.clone())
                .unwrap_or(fallback.name),
            configured
                .and_then(|a| a.email.clone())
                .unwrap_or(fallback.email),
        )
    }

    /// Resolve into the settings the engine runs with.
    ///
    /// Reads the token from the environment here, once.
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        if self.mode() == Mode::Versioned && self.remote_url().map_or(true, str::is_empty) {
            return Err(ConfigError::InvalidValue(
                "no configuration found for versioned mode (set remote.url or mode = \"local-only\")"
                    .to_string(),
            ));
        }

        let branch = BranchName::new(self.branch())
            .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        let working_copy = self.file.working_copy.clone().unwrap_or_default();
        let clone_dir = working_copy
            .clone_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("content-repo"));

        let token = std::env::var(self.token_env())
            .ok()
            .filter(|t| !t.is_empty());

        Ok(Settings {
            mode: self.mode(),
            remote: RemoteSettings {
                url: self.remote_url().unwrap_or_default().to_string(),
                name: self.remote_name().to_string(),
                branch,
                token,
            },
            paths: StorePaths::new(clone_dir, working_copy.lock_path),
            output_dir: self.output_dir(),
            lock_timeout: self.lock_timeout(),
            publish_retries: self.publish_retries(),
            default_author: self.default_author(),
        })
    }
}

/// Remote endpoint, resolved.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteSettings {
    pub url: String,
    pub name: String,
    pub branch: BranchName,
    pub token: Option<String>,
}

impl std::fmt::Debug for RemoteSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSettings")
            .field("url", &self.url)
            .field("name", &self.name)
            .field("branch", &self.branch)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Everything the engine needs, fixed at process configuration time.
#[derive(Debug, Clone)]
pub struct Settings {
    pub mode: Mode,
    pub remote: RemoteSettings,
    pub paths: StorePaths,
    pub output_dir: PathBuf,
    pub lock_timeout: Duration,
    pub publish_retries: u32,
    pub default_author: Author,
}

impl Settings {
    /// Versioned settings for a remote URL, clone directory, and branch,
    /// with default tuning.
    pub fn versioned(url: impl Into<String>, clone_dir: PathBuf, branch: BranchName) -> Self {
        Self {
            mode: Mode::Versioned,
            remote: RemoteSettings {
                url: url.into(),
                name: "origin".to_string(),
                branch,
                token: None,
            },
            paths: StorePaths::new(clone_dir, None),
            output_dir: PathBuf::from("output"),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            publish_retries: DEFAULT_PUBLISH_RETRIES,
            default_author: Author::default(),
        }
    }

    /// Local-only settings writing into `output_dir`, optionally reading
    /// through to an existing clone at `clone_dir`.
    pub fn local_only(output_dir: PathBuf, clone_dir: Option<PathBuf>) -> Self {
        let mut settings = Self::versioned(
            String::new(),
            clone_dir.unwrap_or_else(|| output_dir.join(".no-clone")),
            BranchName::default(),
        );
        settings.mode = Mode::LocalOnly;
        settings.output_dir = output_dir;
        settings
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn with_publish_retries(mut self, retries: u32) -> Self {
        self.publish_retries = retries;
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.remote.token = Some(token.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_without_file() {
        let config = Config::default();
        assert_eq!(config.mode(), Mode::Versioned);
        assert_eq!(config.branch(), "main");
        assert_eq!(config.remote_name(), "origin");
        assert_eq!(config.lock_timeout(), DEFAULT_LOCK_TIMEOUT);
        assert_eq!(config.publish_retries(), DEFAULT_PUBLISH_RETRIES);
        assert_eq!(config.token_env(), DEFAULT_TOKEN_ENV);
    }

    #[test]
    fn unconfigured_versioned_settings_fail() {
        let result = Config::default().settings();
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn load_explicit_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
mode = "versioned"

[remote]
url = "/srv/origin.git"
branch = "content"

[working_copy]
clone_dir = "/srv/site"

[engine]
lock_timeout_ms = 2500
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.path(), Some(path.as_path()));
        assert_eq!(config.branch(), "content");
        assert_eq!(config.remote_url(), Some("/srv/origin.git"));
        assert_eq!(config.lock_timeout(), Duration::from_millis(2500));

        let settings = config.settings().unwrap();
        assert_eq!(settings.remote.branch.as_str(), "content");
        assert_eq!(settings.paths.clone_dir, PathBuf::from("/srv/site"));
    }

    #[test]
    fn missing_explicit_file_is_error() {
        let temp = TempDir::new().unwrap();
        let result = Config::load(Some(&temp.path().join("nope.toml")));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn parse_error_reports_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "mode = [").unwrap();

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn write_atomic_then_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/config.toml");
        let file = ConfigFile {
            mode: Some(Mode::LocalOnly),
            local: Some(LocalConfig {
                output_dir: Some(PathBuf::from("/tmp/out")),
            }),
            ..Default::default()
        };

        Config::write_atomic(&path, &file).unwrap();
        assert!(!path.with_extension("toml.tmp").exists());

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.file, file);
        assert_eq!(loaded.output_dir(), PathBuf::from("/tmp/out"));
    }

    #[test]
    fn default_author_merges_partial_config() {
        let config = Config::from_file(ConfigFile {
            mode: Some(Mode::LocalOnly),
            author: Some(AuthorConfig {
                name: Some("Site CMS".to_string()),
                email: None,
            }),
            ..Default::default()
        })
        .unwrap();

        let author = config.default_author();
        assert_eq!(author.name, "Site CMS");
        assert_eq!(author.email, Author::default().email);
    }

    #[test]
    fn token_is_redacted_in_debug() {
        let settings = Settings::versioned(
            "https://example.org/site.git",
            PathBuf::from("/srv/site"),
            BranchName::new("main").unwrap(),
        )
        .with_token("s3cret");
        let printed = format!("{:?}", settings);
        assert!(!printed.contains("s3cret"));
        assert!(printed.contains("<redacted>"));
    }
}
