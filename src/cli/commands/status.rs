//! status command - Show commits waiting to be published

use anyhow::{Context as _, Result};

use super::open;
use crate::cli::Context;
use crate::ui::output;

/// Show the pending ledger. Takes no lock and does not fetch.
pub fn status(ctx: &Context, json: bool) -> Result<()> {
    let store = open(ctx)?;
    let status = store.status().context("Failed to read pending changes")?;

    if json {
        return output::json(&status).context("Failed to encode status");
    }

    if status.count == 0 {
        output::print("Nothing to publish.", ctx.verbosity);
        return Ok(());
    }

    output::print(
        format!("{} change(s) waiting to be published:", status.count),
        ctx.verbosity,
    );
    let lines: Vec<String> = status.commits.iter().map(output::format_commit).collect();
    output::print(output::format_list(&lines, "  "), ctx.verbosity);
    Ok(())
}
