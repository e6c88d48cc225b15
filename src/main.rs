use sedump_pg::cli;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Diagnostics go to stderr; RUST_LOG overrides the default level.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli::cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "sedump-pg failed");
            ExitCode::FAILURE
        }
    }
}
