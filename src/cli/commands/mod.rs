//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Validates command-specific arguments
//! 2. Calls the engine through the configured [`ContentStore`]
//! 3. Formats and displays output, and records an audit entry when asked
//!
//! Handlers do NOT touch the working copy directly.

mod completion;
mod config_cmd;
mod publish;
mod read;
mod status;
mod sync;
mod write;

// Re-export command functions for testing and direct invocation
pub use completion::completion;
pub use config_cmd::{init as config_init, show as config_show};
pub use publish::publish;
pub use read::{cat, ls, search};
pub use status::status;
pub use sync::sync;
pub use write::{rm, write};

use anyhow::{Context as _, Result};

use super::args::{Command, ConfigAction};
use super::Context;
use crate::engine::{open_store, ContentStore};

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Status { json } => status::status(ctx, json),
        Command::Sync => sync::sync(ctx),
        Command::Write {
            path,
            from,
            message,
        } => write::write(ctx, &path, from.as_deref(), &message),
        Command::Rm { paths, message } => write::rm(ctx, &paths, &message),
        Command::Publish => publish::publish(ctx),
        Command::Cat { path } => read::cat(ctx, &path),
        Command::Ls { dir, ext } => read::ls(ctx, &dir, ext.as_deref()),
        Command::Search { query, dir } => read::search(ctx, &dir, &query),
        Command::Config { action } => match action {
            ConfigAction::Init {
                path,
                url,
                clone_dir,
                local_only,
                force,
            } => config_cmd::init(ctx, path, url, clone_dir, local_only, force),
            ConfigAction::Show => config_cmd::show(ctx),
        },
        Command::Completion { shell } => completion::completion(shell),
    }
}

/// Resolve settings and open the backend for the configured mode.
pub(crate) fn open(ctx: &Context) -> Result<Box<dyn ContentStore>> {
    let settings = ctx
        .config
        .settings()
        .context("Invalid configuration")?;
    Ok(open_store(&settings))
}
