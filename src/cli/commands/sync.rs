//! sync command - Reconcile the working copy with the remote

use anyhow::{Context as _, Result};

use super::open;
use crate::cli::Context;
use crate::engine::AuditEntry;
use crate::ui::output;

/// Fetch and reconcile, warning loudly if local commits were discarded.
pub fn sync(ctx: &Context) -> Result<()> {
    let store = open(ctx)?;
    let result = store.ensure_fresh();
    ctx.audit(AuditEntry::for_reconcile(ctx.actor(), result.as_ref()));

    let outcome = result.context("Failed to sync working copy")?;
    output::reconcile(&outcome, ctx.verbosity);
    Ok(())
}
