//! bp - batched publishing for a shared git working copy

use std::process::ExitCode;

use batchpress::cli;
use batchpress::ui::output;

fn main() -> ExitCode {
    match cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::error(format!("{:#}", err));
            ExitCode::FAILURE
        }
    }
}
