//! Carebridge Tenancy
//!
//! This crate switches the active data context between the central store and
//! individual tenant stores, and runs one logical query across many tenants
//! with per-tenant isolation and failure handling.
//!
//! # Architecture
//!
//! - [`tenant`] - Tenant identifiers, descriptors and the registry that resolves them
//! - [`context`] - The context stack, its scope guard and the task-local active context
//! - [`executor`] - Runs one operation inside one pushed context, restoring it on every exit path
//! - [`aggregate`] - Cross-tenant aggregation and result merging
//! - [`strategy`] - Derives per-tenant connection parameters (database-per-tenant)
//! - [`config`] - Aggregator defaults
//! - [`error`] - Error types
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use carebridge_tenancy::aggregate::{AggregationRequest, CrossTenantAggregator, MergeOptions};
//! use carebridge_tenancy::context::{self, ActiveContext};
//! use carebridge_tenancy::error::OperationResult;
//! use carebridge_tenancy::executor::TenantOperation;
//! use carebridge_tenancy::strategy::{DatabasePerTenantConfig, DatabasePerTenantStrategy};
//! use carebridge_tenancy::tenant::{InMemoryTenantRegistry, TenantId};
//!
//! # tokio_test::block_on(async {
//! let strategy = DatabasePerTenantStrategy::new(DatabasePerTenantConfig::default()).unwrap();
//! let registry = InMemoryTenantRegistry::new();
//! for (id, name) in [("northside", "Northside Physio"), ("westgate", "Westgate Clinic")] {
//!     registry
//!         .register(strategy.descriptor(&TenantId::new(id), name, "app", "secret").unwrap())
//!         .unwrap();
//! }
//!
//! // The operation asks which store is active, as any data-access code would.
//! let operation: Arc<dyn TenantOperation<String>> =
//!     Arc::new(|_context: ActiveContext| async move {
//!         let database = context::current()
//!             .descriptor()
//!             .map(|d| d.database().to_string())
//!             .unwrap_or_default();
//!         OperationResult::Ok(vec![database])
//!     });
//!
//! let aggregator = CrossTenantAggregator::new(Arc::new(registry));
//! let result = aggregator
//!     .aggregate(
//!         AggregationRequest::new(["westgate", "northside"], operation)
//!             .merge(MergeOptions::by(|database: &String| database.clone())),
//!     )
//!     .await
//!     .unwrap();
//!
//! let databases: Vec<&str> = result.values().map(String::as_str).collect();
//! assert_eq!(databases, vec!["tenant_northside", "tenant_westgate"]);
//! assert!(result.is_complete());
//! # });
//! ```
//!
//! # Failure Handling
//!
//! A tenant that is missing from the registry, or whose operation fails,
//! panics or exceeds its timeout, is listed in
//! [`AggregationResult::failed`](aggregate::AggregationResult::failed) and the
//! rest of the aggregation carries on. Only a malformed request or an
//! unbalanced context stack is returned as an
//! [`AggregationError`](error::AggregationError).

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod aggregate;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod strategy;
pub mod tenant;

// Re-export commonly used types at crate root
pub use aggregate::{
    AggregationRequest, AggregationResult, CancellationSignal, CrossTenantAggregator,
    MergeOptions, ResultMerger, SortDirection, Tagged, TenantFailure, Truncation,
};
pub use config::{AggregatorConfig, ExecutionMode};
pub use context::{ActiveContext, ContextHandle, ContextStack};
pub use error::{
    AggregationError, ContextError, FailureKind, OperationError, OperationResult, RegistryError,
};
pub use executor::{ScopedExecutor, ScopedResult, TenantOperation};
pub use strategy::{DatabasePerTenantConfig, DatabasePerTenantStrategy, TenantValidationError};
pub use tenant::{
    CachingTenantRegistry, ConnectionParams, InMemoryTenantRegistry, TenantDescriptor, TenantId,
    TenantRegistry,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
