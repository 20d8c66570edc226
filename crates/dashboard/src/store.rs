//! In-memory clinic databases.

use std::collections::HashMap;

use carebridge_tenancy::OperationResult;
use carebridge_tenancy::context;

use crate::catalog::Appointment;

/// Appointment tables for every clinic, keyed by database name.
///
/// Reads go through [`active_appointments`](Self::active_appointments), which
/// only ever sees the database of the currently active tenant context.
#[derive(Debug, Clone, Default)]
pub struct ClinicDatabases {
    databases: HashMap<String, Vec<Appointment>>,
}

impl ClinicDatabases {
    /// Creates an empty set of databases.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the contents of `database`.
    pub fn insert(&mut self, database: impl Into<String>, appointments: Vec<Appointment>) {
        self.databases.insert(database.into(), appointments);
    }

    /// Returns the appointments stored in `database`.
    pub fn appointments(&self, database: &str) -> Option<&[Appointment]> {
        self.databases.get(database).map(Vec::as_slice)
    }

    /// Returns the number of databases.
    pub fn len(&self) -> usize {
        self.databases.len()
    }

    /// Returns `true` if there are no databases.
    pub fn is_empty(&self) -> bool {
        self.databases.is_empty()
    }

    /// Reads the appointments of the active tenant.
    ///
    /// Fails in the central context, or if the tenant's database was never
    /// provisioned.
    pub fn active_appointments(&self) -> OperationResult<&[Appointment]> {
        let active = context::current();
        let descriptor = active
            .descriptor()
            .ok_or("appointments are tenant data; no clinic context is active")?;
        self.appointments(descriptor.database())
            .ok_or_else(|| format!("database {} is not provisioned", descriptor.database()).into())
    }
}
