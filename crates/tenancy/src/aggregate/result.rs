//! Aggregation outcome types.

use serde::{Deserialize, Serialize};

use crate::error::FailureKind;
use crate::tenant::TenantId;

/// A record tagged with the tenant it came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tagged<T> {
    /// The tenant that produced the record.
    pub tenant_id: TenantId,

    /// The record itself.
    pub value: T,
}

impl<T> Tagged<T> {
    /// Tags `value` with `tenant_id`.
    pub fn new(tenant_id: TenantId, value: T) -> Self {
        Self { tenant_id, value }
    }

    /// Discards the tag.
    pub fn into_value(self) -> T {
        self.value
    }
}

/// A tenant that contributed no records, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantFailure {
    /// The tenant that failed.
    pub tenant_id: TenantId,

    /// What went wrong.
    pub kind: FailureKind,
}

/// Why an aggregation stopped before visiting every tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Truncation {
    /// The caller's cancellation signal was triggered.
    Cancelled,

    /// The aggregation deadline elapsed.
    DeadlineElapsed,
}

/// The outcome of a cross-tenant aggregation.
///
/// Every requested tenant appears exactly once, in either `succeeded` or
/// `failed`. A tenant that succeeded with no records is still in `succeeded`.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationResult<T> {
    /// Records from every successful tenant, merged if merge options were given.
    pub records: Vec<Tagged<T>>,

    /// Tenants whose operation succeeded, in request order.
    pub succeeded: Vec<TenantId>,

    /// Tenants that contributed nothing, in request order.
    pub failed: Vec<TenantFailure>,

    /// Set when the aggregation was cut short.
    pub truncation: Option<Truncation>,
}

impl<T> AggregationResult<T> {
    /// Creates a result with no tenants.
    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            succeeded: Vec::new(),
            failed: Vec::new(),
            truncation: None,
        }
    }

    /// Returns the number of tenants accounted for.
    pub fn tenant_count(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// Returns `true` if every tenant succeeded and nothing was cut short.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.truncation.is_none()
    }

    /// Returns `true` if the aggregation was cancelled or hit its deadline.
    pub fn is_truncated(&self) -> bool {
        self.truncation.is_some()
    }

    /// Returns the failure recorded for `tenant_id`, if any.
    pub fn failure_for(&self, tenant_id: &TenantId) -> Option<&FailureKind> {
        self.failed
            .iter()
            .find(|failure| &failure.tenant_id == tenant_id)
            .map(|failure| &failure.kind)
    }

    /// Iterates over the untagged record values.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.records.iter().map(|record| &record.value)
    }
}

impl<T> Default for AggregationResult<T> {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_result() {
        let result: AggregationResult<u8> = AggregationResult::default();
        assert_eq!(result.tenant_count(), 0);
        assert!(result.is_complete());
        assert!(!result.is_truncated());
    }

    #[test]
    fn test_failure_lookup() {
        let result: AggregationResult<u8> = AggregationResult {
            records: vec![Tagged::new(TenantId::new("a"), 1)],
            succeeded: vec![TenantId::new("a")],
            failed: vec![TenantFailure {
                tenant_id: TenantId::new("b"),
                kind: FailureKind::TenantNotFound,
            }],
            truncation: None,
        };

        assert_eq!(result.tenant_count(), 2);
        assert!(!result.is_complete());
        assert_eq!(
            result.failure_for(&TenantId::new("b")),
            Some(&FailureKind::TenantNotFound)
        );
        assert!(result.failure_for(&TenantId::new("a")).is_none());
        assert_eq!(result.values().copied().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_tagged_serializes_with_tenant() {
        let tagged = Tagged::new(TenantId::new("clinic-a"), 7);
        let json = serde_json::to_value(&tagged).unwrap();
        assert_eq!(json, serde_json::json!({ "tenant_id": "clinic-a", "value": 7 }));
        assert_eq!(tagged.into_value(), 7);
    }

    #[test]
    fn test_truncation_serialization() {
        let json = serde_json::to_string(&Truncation::DeadlineElapsed).unwrap();
        assert_eq!(json, "\"deadline_elapsed\"");
    }
}
