//! Dashboard configuration.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CAREBRIDGE_CATALOG` | (required) | Clinic catalog JSON file |
//! | `CAREBRIDGE_PRACTITIONER` | (required) | Practitioner to show appointments for |
//! | `CAREBRIDGE_LOG_LEVEL` | info | Log level |
//! | `CAREBRIDGE_DB_USER` | carebridge | User placed in tenant connection strings |
//! | `CAREBRIDGE_DB_PASSWORD` | (empty) | Password placed in tenant connection strings |

use std::path::PathBuf;
use std::time::Duration;

use carebridge_tenancy::{AggregatorConfig, ExecutionMode};
use chrono::{Local, NaiveDate};
use clap::Parser;

/// Dashboard configuration, from command line arguments and environment.
#[derive(Debug, Clone, Parser)]
#[command(name = "carebridge-dashboard")]
#[command(about = "Today's appointments for a practitioner across every clinic")]
pub struct DashboardConfig {
    /// Clinic catalog JSON file.
    #[arg(long, env = "CAREBRIDGE_CATALOG")]
    pub catalog: PathBuf,

    /// Practitioner whose appointments are listed.
    #[arg(short, long, env = "CAREBRIDGE_PRACTITIONER")]
    pub practitioner: String,

    /// Day to list (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Clinic to include; repeat for several. Defaults to every clinic.
    #[arg(long = "clinic")]
    pub clinics: Vec<String>,

    /// Query clinics concurrently.
    #[arg(long)]
    pub parallel: bool,

    /// Maximum clinics queried at once with --parallel.
    #[arg(long, default_value = "8")]
    pub max_concurrency: usize,

    /// Time allowed for each clinic (e.g. "2s", "500ms").
    #[arg(long, default_value = "10s", value_parser = humantime::parse_duration)]
    pub tenant_timeout: Duration,

    /// Maximum number of appointments to list.
    #[arg(long)]
    pub limit: Option<usize>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "CAREBRIDGE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Database user for tenant connection strings.
    #[arg(long, env = "CAREBRIDGE_DB_USER", default_value = "carebridge")]
    pub db_user: String,

    /// Database password for tenant connection strings.
    #[arg(long, env = "CAREBRIDGE_DB_PASSWORD", default_value = "", hide_env_values = true)]
    pub db_password: String,
}

impl DashboardConfig {
    /// Returns the requested day, or today in local time.
    pub fn day(&self) -> NaiveDate {
        self.date.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Builds the aggregator configuration.
    pub fn aggregator_config(&self) -> AggregatorConfig {
        AggregatorConfig {
            mode: if self.parallel {
                ExecutionMode::Parallel
            } else {
                ExecutionMode::Sequential
            },
            max_concurrency: self.max_concurrency,
            per_tenant_timeout: Some(self.tenant_timeout),
            deadline: None,
        }
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.practitioner.trim().is_empty() {
            errors.push("Practitioner cannot be empty".to_string());
        }

        if self.limit == Some(0) {
            errors.push("Limit cannot be 0".to_string());
        }

        if let Err(aggregator_errors) = self.aggregator_config().validate() {
            errors.extend(aggregator_errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
