//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--config <path>`: Use this config file instead of the lookup chain
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output
//! - `--author-name`, `--author-email`: Commit author for this invocation
//! - `--audit-log <path>`: Append an audit entry per mutation or publish

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// bp - batched publishing for a shared git working copy
#[derive(Parser, Debug)]
#[command(name = "bp")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Commit author name (default: from config)
    #[arg(long, global = true, value_name = "NAME")]
    pub author_name: Option<String>,

    /// Commit author email (default: from config)
    #[arg(long, global = true, value_name = "EMAIL")]
    pub author_email: Option<String>,

    /// Append JSON-lines audit entries to this file
    #[arg(long, global = true, value_name = "PATH")]
    pub audit_log: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show commits waiting to be published
    #[command(
        name = "status",
        long_about = "Show local commits that have not been published yet.\n\n\
            Reads the working copy's refs only: no lock is taken and nothing is \
            fetched, so the answer reflects the remote as of the last sync, \
            write, or publish.",
        after_help = "\
EXAMPLES:
    # Human-readable summary
    bp status

    # For polling from a dashboard
    bp status --json"
    )]
    Status {
        /// Print {count, commits} as JSON
        #[arg(long)]
        json: bool,
    },

    /// Bring the working copy up to date with the remote
    #[command(
        name = "sync",
        long_about = "Fetch the remote branch and reconcile the working copy.\n\n\
            Local commits are kept when they replay cleanly on top of the remote. \
            If the remote changed the same files, local commits are discarded and \
            the working copy is reset to the remote; this is reported as a warning."
    )]
    Sync,

    /// Write one file and commit it
    #[command(
        name = "write",
        after_help = "\
EXAMPLES:
    # From a file
    bp write content/about.md --from ./about.md -m \"Update about page\"

    # From stdin
    echo '# Hello' | bp write content/hello.md -m \"Add hello\""
    )]
    Write {
        /// Path inside the content tree
        path: String,

        /// Read content from this file instead of stdin
        #[arg(long, value_name = "FILE")]
        from: Option<PathBuf>,

        /// Commit message
        #[arg(short, long)]
        message: String,
    },

    /// Delete files and commit the removal
    #[command(name = "rm")]
    Rm {
        /// Paths inside the content tree
        #[arg(required = true)]
        paths: Vec<String>,

        /// Commit message
        #[arg(short, long)]
        message: String,
    },

    /// Push all pending commits to the remote
    #[command(
        name = "publish",
        long_about = "Reconcile with the remote and push every pending commit in one push.\n\n\
            If the remote moved in the meantime the push is rejected; bp reconciles \
            again and retries up to engine.publish_retries times. It never force-pushes."
    )]
    Publish,

    /// Print a file from the content tree
    #[command(name = "cat")]
    Cat {
        /// Path inside the content tree
        path: String,
    },

    /// List files in the content tree
    #[command(name = "ls")]
    Ls {
        /// Directory inside the content tree (default: whole tree)
        #[arg(default_value = "")]
        dir: String,

        /// Only files with this extension (without the dot)
        #[arg(long, value_name = "EXT")]
        ext: Option<String>,
    },

    /// Search file contents (case-insensitive)
    #[command(name = "search")]
    Search {
        /// Text to look for
        query: String,

        /// Directory inside the content tree (default: whole tree)
        #[arg(long, default_value = "")]
        dir: String,
    },

    /// Manage the config file
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        after_help = "\
EXAMPLES:
    bp completion bash > ~/.local/share/bash-completion/completions/bp
    bp completion zsh > ~/.zfunc/_bp"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a starter config file
    Init {
        /// Where to write it (default: ~/.batchpress/config.toml)
        #[arg(long, value_name = "PATH")]
        path: Option<PathBuf>,

        /// Remote URL to publish to
        #[arg(long)]
        url: Option<String>,

        /// Clone directory for the working copy
        #[arg(long, value_name = "DIR")]
        clone_dir: Option<PathBuf>,

        /// Write a local-only config instead
        #[arg(long)]
        local_only: bool,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

/// Shells supported by `bp completion`.
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["bp", "status", "--json", "--config", "/tmp/c.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        assert!(matches!(cli.command, Command::Status { json: true }));
    }

    #[test]
    fn write_requires_message() {
        assert!(Cli::try_parse_from(["bp", "write", "a.md"]).is_err());
        assert!(Cli::try_parse_from(["bp", "write", "a.md", "-m", "msg"]).is_ok());
    }

    #[test]
    fn rm_requires_a_path() {
        assert!(Cli::try_parse_from(["bp", "rm", "-m", "msg"]).is_err());
    }

    #[test]
    fn ls_defaults_to_whole_tree() {
        let cli = Cli::try_parse_from(["bp", "ls", "--ext", "md"]).unwrap();
        match cli.command {
            Command::Ls { dir, ext } => {
                assert_eq!(dir, "");
                assert_eq!(ext.as_deref(), Some("md"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
