//! cli
//!
//! Command-line interface layer for batchpress.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Load configuration and install the log subscriber
//! - Delegate to command handlers
//! - Does NOT touch the working copy directly
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap, builds a [`Context`],
//! and dispatches to handlers that call the [`crate::engine`] through the
//! [`crate::engine::ContentStore`] chosen from the configured mode.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use anyhow::{Context as _, Result};
use tracing_subscriber::EnvFilter;

use crate::core::config::Config;
use crate::core::types::Author;
use crate::engine::{AuditEntry, AuditSink, JsonlAuditLog};
use crate::ui::output::{self, Verbosity};

/// Environment variable holding a `tracing` filter directive.
pub const LOG_ENV: &str = "BATCHPRESS_LOG";

/// Everything a command handler needs from the invocation.
#[derive(Debug)]
pub struct Context {
    pub config: Config,
    pub verbosity: Verbosity,
    pub author: Author,
    pub audit: Option<JsonlAuditLog>,
}

impl Context {
    /// The actor recorded in audit entries.
    pub fn actor(&self) -> &str {
        &self.author.email
    }

    /// Append an audit entry if an audit log was requested. A failing audit
    /// write is reported but does not fail the command; the mutation it
    /// describes already happened.
    pub fn audit(&self, entry: AuditEntry) {
        if let Some(log) = &self.audit {
            if let Err(err) = log.record(&entry) {
                output::warn(format!("audit log: {}", err), self.verbosity);
            }
        }
    }
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.debug);

    // Config is not needed to print completions or write a fresh config.
    let config = match &cli.command {
        args::Command::Completion { .. }
        | args::Command::Config {
            action: args::ConfigAction::Init { .. },
        } => Config::load(cli.config.as_deref()).unwrap_or_default(),
        _ => Config::load(cli.config.as_deref()).context("Failed to load config")?,
    };

    let mut author = config.default_author();
    if let Some(name) = cli.author_name {
        author.name = name;
    }
    if let Some(email) = cli.author_email {
        author.email = email;
    }

    let ctx = Context {
        config,
        verbosity: Verbosity::from_flags(cli.quiet, cli.debug),
        author,
        audit: cli.audit_log.map(JsonlAuditLog::new),
    };

    commands::dispatch(cli.command, &ctx)
}

/// Install the fmt subscriber on stderr.
///
/// `BATCHPRESS_LOG` wins; otherwise `--debug` selects debug for this crate
/// and warnings stay on for everything else.
fn init_tracing(debug: bool) {
    let default = if debug {
        "batchpress=debug,warn"
    } else {
        "batchpress=warn"
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));

    // A second init (tests calling run twice) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
