//! Cross-tenant aggregation.
//!
//! Runs the same logical query once per tenant, each run inside that
//! tenant's data context, and combines the per-tenant records into a single
//! tagged view.
//!
//! - [`CrossTenantAggregator`] - Resolves tenants, drives the scoped executor, collects outcomes
//! - [`AggregationRequest`] - The tenants, the operation and per-request overrides
//! - [`AggregationResult`] - Tagged records plus per-tenant successes and failures
//! - [`ResultMerger`] - Stable sort, optional dedup and limit over tagged records
//! - [`CancellationSignal`] - Stops an aggregation from outside
//!
//! Per-tenant failures never abort the aggregation; they are returned as data
//! next to the records that did arrive.

mod aggregator;
mod cancel;
mod merger;
mod request;
mod result;

pub use crate::config::ExecutionMode;
pub use aggregator::CrossTenantAggregator;
pub use cancel::CancellationSignal;
pub use merger::{DedupKey, MergeKey, MergeOptions, ResultMerger, SortDirection};
pub use request::AggregationRequest;
pub use result::{AggregationResult, Tagged, TenantFailure, Truncation};
