//! Tenant descriptors held by the central registry.

use serde::{Deserialize, Serialize};

use super::id::TenantId;

/// Connection parameters for one data store.
///
/// The core treats these as opaque: they are handed to whatever driver the
/// caller's operation uses. The database-per-tenant strategy produces them
/// from a connection template, or they can be loaded verbatim from a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionParams {
    /// The database name.
    pub database: String,
    /// The full connection string.
    #[serde(default)]
    pub connection_string: String,
}

impl ConnectionParams {
    /// Creates connection parameters for the given database and connection string.
    pub fn new(database: impl Into<String>, connection_string: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            connection_string: connection_string.into(),
        }
    }
}

/// Everything the core needs to switch into a tenant's data context.
///
/// Descriptors are immutable once created. They are owned by the registry and
/// shared as `Arc<TenantDescriptor>`.
///
/// # Examples
///
/// ```
/// use carebridge_tenancy::tenant::{ConnectionParams, TenantDescriptor, TenantId};
///
/// let descriptor = TenantDescriptor::new(
///     TenantId::new("northside"),
///     "Northside Physiotherapy",
///     ConnectionParams::new("tenant_northside", "postgres://db/tenant_northside"),
/// );
/// assert_eq!(descriptor.database(), "tenant_northside");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantDescriptor {
    id: TenantId,
    display_name: String,
    connection: ConnectionParams,
}

impl TenantDescriptor {
    /// Creates a new descriptor.
    pub fn new(
        id: TenantId,
        display_name: impl Into<String>,
        connection: ConnectionParams,
    ) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            connection,
        }
    }

    /// Returns the tenant ID.
    pub fn id(&self) -> &TenantId {
        &self.id
    }

    /// Returns the human-readable name.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Returns the connection parameters.
    pub fn connection(&self) -> &ConnectionParams {
        &self.connection
    }

    /// Shorthand for the database name in the connection parameters.
    pub fn database(&self) -> &str {
        &self.connection.database
    }
}
