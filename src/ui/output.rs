//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Output is formatted consistently and respects the quiet flag.
//! When `--json` is requested, output is machine-readable JSON on stdout.

use std::fmt::Display;

use serde::Serialize;

use crate::engine::{CommitSummary, ReconcileOutcome};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Print a success message (respects quiet mode).
pub fn success(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print a value as pretty JSON (always shown; it is the requested output).
pub fn json<T: Serialize>(value: &T) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Report a reconcile outcome. Resets are always shown, even when quiet,
/// because they mean local commits were dropped.
pub fn reconcile(outcome: &ReconcileOutcome, verbosity: Verbosity) {
    if outcome.is_lossy() {
        eprintln!("warning: {}", outcome);
        eprintln!("warning: local changes conflicting with the remote were discarded");
    } else {
        print(format!("Working copy {}.", outcome), verbosity);
    }
}

/// Format one pending commit for a list.
pub fn format_commit(commit: &CommitSummary) -> String {
    format!(
        "{}  {}  ({}, {})",
        commit.short_sha, commit.message, commit.author, commit.date
    )
}

/// Format a list of items.
pub fn format_list<T: Display>(items: &[T], prefix: &str) -> String {
    items
        .iter()
        .map(|item| format!("{}{}", prefix, item))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_wins_over_debug() {
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Debug);
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
    }

    #[test]
    fn list_formatting() {
        assert_eq!(format_list(&["a", "b"], "  - "), "  - a\n  - b");
        assert_eq!(format_list::<&str>(&[], "- "), "");
    }

    #[test]
    fn commit_formatting() {
        let commit = CommitSummary {
            sha: "0".repeat(40),
            short_sha: "0000000".to_string(),
            message: "Add gala".to_string(),
            author: "Editor".to_string(),
            date: "2026-01-01T00:00:00+00:00".to_string(),
        };
        let line = format_commit(&commit);
        assert!(line.starts_with("0000000  Add gala"));
        assert!(line.contains("Editor"));
    }
}
