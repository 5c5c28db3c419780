//! Binary entrypoint for the summary client console.

use std::process::ExitCode;

use summary_client::start_summary_client;

/// Start the console against the configured summarization backend.
fn main() -> ExitCode {
    start_summary_client::run()
}
