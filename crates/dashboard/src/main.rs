//! Carebridge Dashboard
//!
//! Prints a practitioner's appointments across every clinic as JSON.

use carebridge_dashboard::config::DashboardConfig;
use carebridge_dashboard::{init_logging, run};
use clap::Parser;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = DashboardConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    info!(
        catalog = %config.catalog.display(),
        practitioner = %config.practitioner,
        parallel = config.parallel,
        "Starting Carebridge dashboard"
    );

    let report = run(&config).await?;
    for warning in &report.warnings {
        warn!(clinic = %warning.clinic_id, kind = warning.kind, "{}", warning.message);
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
