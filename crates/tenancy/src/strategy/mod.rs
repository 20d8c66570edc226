//! Tenant provisioning strategies.
//!
//! A strategy turns a tenant id into the connection parameters of that
//! tenant's isolated store, and knows the parameters of the central store.
//! The registry then hands those descriptors to the aggregator.
//!
//! - [`DatabasePerTenantStrategy`] - One database per tenant, named from the tenant id
//!
//! # Example
//!
//! ```
//! use carebridge_tenancy::strategy::{DatabasePerTenantConfig, DatabasePerTenantStrategy};
//! use carebridge_tenancy::tenant::TenantId;
//!
//! let strategy = DatabasePerTenantStrategy::new(DatabasePerTenantConfig::default()).unwrap();
//! let descriptor = strategy
//!     .descriptor(&TenantId::new("clinic-a"), "Clinic A", "app", "secret")
//!     .unwrap();
//!
//! assert_eq!(descriptor.database(), "tenant_clinic_a");
//! assert_eq!(strategy.central_params().database, "carebridge_central");
//! ```

mod database_per_tenant;

pub use database_per_tenant::{DatabasePerTenantConfig, DatabasePerTenantStrategy};

use thiserror::Error;

/// Error when a tenant id cannot be used by a strategy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid tenant '{tenant_id}': {reason}")]
pub struct TenantValidationError {
    /// The rejected tenant id.
    pub tenant_id: String,
    /// Why it was rejected.
    pub reason: String,
}
