//! The clinic catalog file.
//!
//! ```json
//! {
//!   "clinics": [
//!     {
//!       "id": "northside",
//!       "name": "Northside Physiotherapy",
//!       "appointments": [
//!         {
//!           "id": "apt-1",
//!           "practitioner": "dr-osei",
//!           "patient": "P. Mensah",
//!           "starts_at": "2026-10-17T09:00:00"
//!         }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! Each clinic becomes a tenant: its descriptor is provisioned through the
//! database-per-tenant strategy and its appointments are loaded into that
//! tenant's database in [`ClinicDatabases`].

use std::fs;
use std::path::Path;

use anyhow::Context;
use carebridge_tenancy::{DatabasePerTenantStrategy, InMemoryTenantRegistry, TenantId};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::store::ClinicDatabases;

/// The clinics known to the central registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    /// Every clinic, in catalog order.
    pub clinics: Vec<Clinic>,
}

/// One clinic and the appointments held in its database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clinic {
    /// Tenant id.
    pub id: TenantId,
    /// Display name.
    pub name: String,
    /// Appointments stored in the clinic's database.
    #[serde(default)]
    pub appointments: Vec<Appointment>,
}

/// A booked appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    /// Appointment id, unique within its clinic.
    pub id: String,
    /// Practitioner seeing the patient.
    pub practitioner: String,
    /// Patient display name.
    pub patient: String,
    /// Local start time.
    pub starts_at: NaiveDateTime,
    /// Length in minutes.
    #[serde(default = "default_duration_minutes")]
    pub duration_minutes: u32,
    /// Cancelled appointments stay on file but are not shown.
    #[serde(default)]
    pub cancelled: bool,
}

fn default_duration_minutes() -> u32 {
    30
}

impl Catalog {
    /// Reads a catalog from a JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog {}", path.display()))?;
        let catalog = Self::from_json(&json)
            .with_context(|| format!("Invalid catalog {}", path.display()))?;
        info!(path = %path.display(), clinics = catalog.clinics.len(), "Loaded clinic catalog");
        Ok(catalog)
    }

    /// Parses a catalog from JSON.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Registers every clinic as a tenant and loads its appointments into
    /// the tenant's database.
    pub fn provision(
        &self,
        strategy: &DatabasePerTenantStrategy,
        user: &str,
        password: &str,
    ) -> anyhow::Result<(InMemoryTenantRegistry, ClinicDatabases)> {
        let registry = InMemoryTenantRegistry::new();
        let mut databases = ClinicDatabases::new();

        for clinic in &self.clinics {
            let descriptor = strategy.descriptor(&clinic.id, &clinic.name, user, password)?;
            debug!(
                clinic = %clinic.id,
                database = %descriptor.database(),
                appointments = clinic.appointments.len(),
                "Provisioning clinic"
            );
            databases.insert(descriptor.database(), clinic.appointments.clone());
            registry.register(descriptor)?;
        }

        Ok((registry, databases))
    }

    /// Returns the display name of a clinic.
    pub fn clinic_name(&self, id: &TenantId) -> Option<&str> {
        self.clinics
            .iter()
            .find(|clinic| &clinic.id == id)
            .map(|clinic| clinic.name.as_str())
    }
}
