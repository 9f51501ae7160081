//! publish command - Push all pending commits

use anyhow::{Context as _, Result};

use super::open;
use crate::cli::Context;
use crate::engine::AuditEntry;
use crate::ui::output;

/// Reconcile, push, and report. Pending commits survive any failure.
pub fn publish(ctx: &Context) -> Result<()> {
    let store = open(ctx)?;
    let result = store.publish();
    ctx.audit(AuditEntry::for_publish(ctx.actor(), result.as_ref()));

    let report = result.context("Failed to publish")?;
    for outcome in report.reconciles.iter().filter(|o| o.is_lossy()) {
        output::reconcile(outcome, ctx.verbosity);
    }

    if report.pushed == 0 {
        output::print("Nothing to publish.", ctx.verbosity);
    } else {
        output::success(
            format!("Published {} change(s).", report.pushed),
            ctx.verbosity,
        );
    }
    if report.attempts > 1 {
        output::print(
            format!(
                "The remote moved during publish; retried {} time(s).",
                report.attempts - 1
            ),
            ctx.verbosity,
        );
    }
    Ok(())
}
