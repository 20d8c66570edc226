//! Carebridge Dashboard
//!
//! Lists a practitioner's appointments for one day across every clinic they
//! work in. Each clinic is a tenant with its own database; the appointments
//! are gathered with a cross-tenant aggregation and merged by start time.
//!
//! A clinic that cannot be reached does not fail the dashboard. It is
//! reported as a warning next to the appointments that could be read.

pub mod catalog;
pub mod config;
pub mod store;

use std::sync::Arc;

use anyhow::Context;
use carebridge_tenancy::{
    ActiveContext, AggregationRequest, CrossTenantAggregator, DatabasePerTenantConfig,
    DatabasePerTenantStrategy, MergeOptions, OperationResult, TenantId, TenantOperation,
    TenantRegistry, Truncation,
};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::catalog::{Appointment, Catalog};
use crate::config::DashboardConfig;
use crate::store::ClinicDatabases;

/// The rendered dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    /// Practitioner the dashboard was built for.
    pub practitioner: String,
    /// Day shown.
    pub date: NaiveDate,
    /// Number of clinics queried.
    pub clinics_queried: usize,
    /// Appointments in start-time order.
    pub appointments: Vec<DashboardRow>,
    /// Clinics whose appointments are missing from the report.
    pub warnings: Vec<ClinicWarning>,
    /// Set when the aggregation stopped early.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncation: Option<Truncation>,
}

/// One appointment and the clinic it is booked at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardRow {
    /// Clinic tenant id.
    pub clinic_id: TenantId,
    /// Clinic display name.
    pub clinic_name: String,
    /// The appointment.
    #[serde(flatten)]
    pub appointment: Appointment,
}

/// A clinic that did not contribute to the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClinicWarning {
    /// Clinic tenant id.
    pub clinic_id: TenantId,
    /// Failure label, e.g. `tenant_not_found` or `timed_out`.
    pub kind: &'static str,
    /// Human readable reason.
    pub message: String,
}

/// Initialize logging with the given level.
///
/// Logs go to stderr so the report on stdout stays machine readable.
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "carebridge_dashboard={},carebridge_tenancy={}",
            level, level
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// The per-clinic query: `practitioner`'s appointments on `day`, read from
/// whichever clinic database is active when it runs.
pub fn todays_appointments(
    databases: Arc<ClinicDatabases>,
    practitioner: &str,
    day: NaiveDate,
) -> Arc<dyn TenantOperation<Appointment>> {
    let practitioner: Arc<str> = Arc::from(practitioner);
    Arc::new(move |_context: ActiveContext| {
        let databases = Arc::clone(&databases);
        let practitioner = Arc::clone(&practitioner);
        async move {
            let appointments: Vec<Appointment> = databases
                .active_appointments()?
                .iter()
                .filter(|a| {
                    !a.cancelled
                        && a.starts_at.date() == day
                        && a.practitioner == practitioner.as_ref()
                })
                .cloned()
                .collect();
            OperationResult::Ok(appointments)
        }
    })
}

/// Builds the dashboard described by `config`.
///
/// Returns an error only if the catalog cannot be loaded or provisioned, or
/// the aggregation request is malformed.
pub async fn run(config: &DashboardConfig) -> anyhow::Result<DashboardReport> {
    let catalog = Catalog::load(&config.catalog)?;
    let strategy = DatabasePerTenantStrategy::new(DatabasePerTenantConfig::default())
        .context("Invalid tenant id pattern")?;
    let (registry, databases) =
        catalog.provision(&strategy, &config.db_user, &config.db_password)?;
    let registry = Arc::new(registry);

    let clinics: Vec<TenantId> = if config.clinics.is_empty() {
        registry.tenant_ids().await?
    } else {
        config
            .clinics
            .iter()
            .map(|id| TenantId::new(id.as_str()))
            .collect()
    };

    let day = config.day();
    let mut merge = MergeOptions::by(|appointment: &Appointment| appointment.starts_at);
    if let Some(limit) = config.limit {
        merge = merge.limit(limit);
    }

    let request = AggregationRequest::new(
        clinics,
        todays_appointments(Arc::new(databases), &config.practitioner, day),
    )
    .merge(merge);
    let aggregator = CrossTenantAggregator::with_config(registry, config.aggregator_config());
    let result = aggregator.aggregate(request).await?;

    let clinics_queried = result.tenant_count();
    let appointments: Vec<DashboardRow> = result
        .records
        .into_iter()
        .map(|tagged| DashboardRow {
            clinic_name: catalog
                .clinic_name(&tagged.tenant_id)
                .unwrap_or(tagged.tenant_id.as_str())
                .to_string(),
            clinic_id: tagged.tenant_id,
            appointment: tagged.value,
        })
        .collect();
    let warnings: Vec<ClinicWarning> = result
        .failed
        .into_iter()
        .map(|failure| ClinicWarning {
            kind: failure.kind.label(),
            message: failure.kind.to_string(),
            clinic_id: failure.tenant_id,
        })
        .collect();

    info!(
        practitioner = %config.practitioner,
        date = %day,
        appointments = appointments.len(),
        warnings = warnings.len(),
        "Dashboard ready"
    );

    Ok(DashboardReport {
        practitioner: config.practitioner.clone(),
        date: day,
        clinics_queried,
        appointments,
        warnings,
        truncation: result.truncation,
    })
}
