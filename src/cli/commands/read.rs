//! cat / ls / search commands - Read the content tree

use std::io::Write;

use anyhow::{bail, Context as _, Result};

use super::open;
use crate::cli::Context;
use crate::core::types::ContentPath;
use crate::ui::output;

/// Print a file's bytes to stdout.
pub fn cat(ctx: &Context, path: &str) -> Result<()> {
    let path = ContentPath::new(path)?;
    let store = open(ctx)?;
    let Some(bytes) = store.read_file(&path)? else {
        bail!("No such file: {}", path);
    };
    std::io::stdout()
        .write_all(&bytes)
        .context("Failed to write to stdout")
}

/// List files, one per line.
pub fn ls(ctx: &Context, dir: &str, ext: Option<&str>) -> Result<()> {
    let store = open(ctx)?;
    let ext = ext.map(|e| e.trim_start_matches('.'));
    for path in store.list_files(dir, ext)? {
        println!("{}", path);
    }
    Ok(())
}

/// Print `path:line: text` for every matching line.
pub fn search(ctx: &Context, dir: &str, query: &str) -> Result<()> {
    let store = open(ctx)?;
    let hits = store.search(dir, query)?;
    if hits.is_empty() {
        output::print(format!("No matches for '{}'.", query), ctx.verbosity);
        return Ok(());
    }
    for hit in hits {
        println!("{}:{}: {}", hit.path, hit.line_number, hit.line.trim());
    }
    Ok(())
}
