//! Error types for the tenancy layer.
//!
//! This module separates hard errors, which indicate a bug or a malformed
//! request and are returned to the caller, from per-tenant failures, which are
//! recorded as data in an [`AggregationResult`](crate::aggregate::AggregationResult)
//! and never raised.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use std::time::Duration;

use thiserror::Error;

use crate::tenant::TenantId;

/// The error type an operation supplied by a caller may fail with.
pub type OperationError = Box<dyn std::error::Error + Send + Sync>;

/// Result type alias for caller-supplied operations.
pub type OperationResult<T> = Result<T, OperationError>;

/// Errors raised by the context stack.
///
/// Both variants indicate mismatched push/pop pairs and are never recoverable
/// at the point they are detected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// `pop` was called on a stack with no frames above central.
    #[error("context stack underflow: pop called with no active tenant context")]
    StackUnderflow,

    /// A scope was released while frames pushed after it were still active.
    #[error("context stack unbalanced: expected depth {expected}, found {actual}")]
    Unbalanced { expected: usize, actual: usize },
}

/// Errors raised by a tenant registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No tenant with the given identifier exists in the catalog.
    #[error("tenant not found: {tenant_id}")]
    NotFound { tenant_id: TenantId },

    /// The registry's backing store could not be reached.
    #[error("tenant registry unavailable: {message}")]
    Unavailable { message: String },

    /// A tenant with the same identifier is already registered.
    #[error("duplicate tenant: {tenant_id}")]
    DuplicateTenant { tenant_id: TenantId },

    /// A tenant catalog could not be parsed.
    #[error("invalid tenant catalog: {message}")]
    Catalog { message: String },
}

/// Hard errors returned by the aggregator.
#[derive(Error, Debug)]
pub enum AggregationError {
    /// The context stack was left in an inconsistent state.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// The request could not be executed as given.
    #[error("invalid aggregation request: {message}")]
    InvalidRequest { message: String },
}

/// Why a single tenant did not contribute results to an aggregation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The tenant id is not in the registry.
    #[error("tenant not found")]
    TenantNotFound,

    /// The registry failed while resolving the tenant.
    #[error("registry error: {0}")]
    Registry(String),

    /// The operation returned an error.
    #[error("operation failed: {0}")]
    Operation(String),

    /// The operation did not finish within the per-tenant timeout.
    #[error("operation timed out after {}ms", .0.as_millis())]
    TimedOut(Duration),

    /// The operation panicked.
    #[error("operation panicked: {0}")]
    Panicked(String),

    /// The aggregation was cancelled or hit its deadline before this tenant
    /// produced an outcome.
    #[error("abandoned before completion")]
    Abandoned,
}

impl FailureKind {
    /// Returns a short stable label for logs and reports.
    pub fn label(&self) -> &'static str {
        match self {
            FailureKind::TenantNotFound => "tenant_not_found",
            FailureKind::Registry(_) => "registry",
            FailureKind::Operation(_) => "operation",
            FailureKind::TimedOut(_) => "timed_out",
            FailureKind::Panicked(_) => "panicked",
            FailureKind::Abandoned => "abandoned",
        }
    }
}

impl From<RegistryError> for FailureKind {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound { .. } => FailureKind::TenantNotFound,
            other => FailureKind::Registry(other.to_string()),
        }
    }
}
