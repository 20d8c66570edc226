//! Tenant catalog types.
//!
//! This module provides the types that describe tenants as the central
//! catalog knows them:
//!
//! - [`TenantId`] - Opaque tenant identifier
//! - [`TenantDescriptor`] - Immutable description of a tenant and how to reach its store
//! - [`TenantRegistry`] - Resolves identifiers to descriptors
//!
//! # Examples
//!
//! ```
//! use carebridge_tenancy::tenant::{
//!     ConnectionParams, InMemoryTenantRegistry, TenantDescriptor, TenantId, TenantRegistry,
//! };
//!
//! # tokio_test::block_on(async {
//! let registry = InMemoryTenantRegistry::from_descriptors(vec![TenantDescriptor::new(
//!     TenantId::new("westgate"),
//!     "Westgate Family Practice",
//!     ConnectionParams::new("tenant_westgate", "postgres://db/tenant_westgate"),
//! )])
//! .unwrap();
//!
//! let descriptor = registry.resolve(&TenantId::new("westgate")).await.unwrap();
//! assert_eq!(descriptor.display_name(), "Westgate Family Practice");
//! # });
//! ```

mod descriptor;
mod id;
mod registry;

pub use descriptor::{ConnectionParams, TenantDescriptor};
pub use id::TenantId;
pub use registry::{CachingTenantRegistry, InMemoryTenantRegistry, TenantRegistry};
