//! `intake-client` command-line entry point.
//!
//! Startup sequence:
//! 1. Parse the command line.
//! 2. Load and validate [`Config`] from environment variables.
//! 3. Initialise telemetry (JSON logs, optional OTLP export).
//! 4. Run the requested submission or retrieval and report its status.

use std::process::ExitCode;

use clap::Parser;
use tracing::info;

use intake_client::cli::{self, Cli};
use intake_client::{telemetry, Config};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------
    let cfg = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            // Telemetry is not yet up; write to stderr directly.
            eprintln!("ERROR: configuration invalid: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    // -----------------------------------------------------------------------
    // Telemetry
    // -----------------------------------------------------------------------
    let _telemetry = match telemetry::init_telemetry(cfg.otlp_endpoint(), &cfg.log_level) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("ERROR: telemetry init failed: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    info!(
        version = env!("CARGO_PKG_VERSION"),
        base_url = %cfg.base_url,
        "intake-client starting"
    );

    // -----------------------------------------------------------------------
    // Command
    // -----------------------------------------------------------------------
    let outcome = cli::run(cli.command, &cfg).await;
    cli::report(&outcome)
}
