//! write / rm commands - Commit content changes locally

use std::io::Read;
use std::path::Path;

use anyhow::{Context as _, Result};

use super::open;
use crate::cli::Context;
use crate::engine::{Applied, AuditEntry, CommitOutcome, ContentStore, MutationBatch};
use crate::ui::output;

/// Write one file (from `from`, or stdin) and commit it.
pub fn write(ctx: &Context, path: &str, from: Option<&Path>, message: &str) -> Result<()> {
    let content = match from {
        Some(file) => {
            std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?
        }
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    let batch = MutationBatch::new().write(path, content)?;
    let store = open(ctx)?;
    apply(ctx, store.as_ref(), &batch, path, message)
}

/// Delete files and commit the removal.
pub fn rm(ctx: &Context, paths: &[String], message: &str) -> Result<()> {
    let mut batch = MutationBatch::new();
    for path in paths {
        batch = batch.delete(path)?;
    }
    let store = open(ctx)?;
    apply(ctx, store.as_ref(), &batch, &paths.join(","), message)
}

fn apply(
    ctx: &Context,
    store: &dyn ContentStore,
    batch: &MutationBatch,
    target: &str,
    message: &str,
) -> Result<()> {
    let result = store.apply(batch, message, &ctx.author);
    ctx.audit(AuditEntry::for_commit(
        ctx.actor(),
        target,
        result.as_ref().map(|applied| &applied.commit),
    ));

    let Applied { reconcile, commit } = result.context("Failed to commit changes")?;
    if reconcile.is_lossy() {
        output::reconcile(&reconcile, ctx.verbosity);
    }

    match commit {
        CommitOutcome::Committed(local) => {
            let pending = store.status().map(|s| s.count).unwrap_or(0);
            output::success(
                format!(
                    "Committed {} ({} change(s) waiting to be published)",
                    local.sha.short(7),
                    pending
                ),
                ctx.verbosity,
            );
        }
        CommitOutcome::NoOp => output::print("No changes.", ctx.verbosity),
        CommitOutcome::Offline => output::success("Written (local-only mode).", ctx.verbosity),
    }
    Ok(())
}
