//! Binary entrypoint for the live transcript digest pipeline.

use std::process::ExitCode;

use live_digest::start_live_digest;

/// Run the pipeline until Ctrl-C.
fn main() -> ExitCode {
    start_live_digest::run()
}
