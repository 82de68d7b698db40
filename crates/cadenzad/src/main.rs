use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    match cadenzad::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(target: "cadenzad::process", %error, "daemon failed");
            // Telemetry is not installed when bootstrap itself failed.
            let _ = writeln!(io::stderr(), "cadenzad: {error}");
            ExitCode::FAILURE
        }
    }
}
