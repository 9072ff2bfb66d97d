use std::process::ExitCode;

use price_drop_monitor::{Monitor, Settings};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "run aborted");
            ExitCode::FAILURE
        }
    }
}

fn run() -> price_drop_monitor::Result<()> {
    let settings = Settings::from_env()?;
    let mut monitor = Monitor::builder().settings(settings).build()?;
    info!("{}", monitor);
    monitor.run()?;
    Ok(())
}
