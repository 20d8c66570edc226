//! Aggregation requests.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::merger::MergeOptions;
use crate::config::ExecutionMode;
use crate::executor::TenantOperation;
use crate::tenant::TenantId;

/// One logical query to run against a set of tenants.
///
/// Fields left as `None` fall back to the aggregator's
/// [`AggregatorConfig`](crate::config::AggregatorConfig).
pub struct AggregationRequest<T> {
    /// Tenants to visit, in order. Repeated ids are visited once.
    pub tenant_ids: Vec<TenantId>,

    /// The query run once per tenant.
    pub operation: Arc<dyn TenantOperation<T>>,

    /// How to order the combined records. `None` keeps processing order.
    pub merge: Option<MergeOptions<T>>,

    /// Time allowed for one tenant's operation.
    pub per_tenant_timeout: Option<Duration>,

    /// Time allowed for the whole aggregation.
    pub deadline: Option<Duration>,

    /// Sequential or parallel execution.
    pub mode: Option<ExecutionMode>,

    /// Concurrency limit in parallel mode.
    pub max_concurrency: Option<usize>,
}

impl<T> AggregationRequest<T> {
    /// Creates a request that runs `operation` for each of `tenant_ids`.
    pub fn new<I>(tenant_ids: I, operation: Arc<dyn TenantOperation<T>>) -> Self
    where
        I: IntoIterator,
        I::Item: Into<TenantId>,
    {
        Self {
            tenant_ids: tenant_ids.into_iter().map(Into::into).collect(),
            operation,
            merge: None,
            per_tenant_timeout: None,
            deadline: None,
            mode: None,
            max_concurrency: None,
        }
    }

    /// Orders the combined records with `merge`.
    pub fn merge(mut self, merge: MergeOptions<T>) -> Self {
        self.merge = Some(merge);
        self
    }

    /// Overrides the per-tenant timeout.
    pub fn per_tenant_timeout(mut self, timeout: Duration) -> Self {
        self.per_tenant_timeout = Some(timeout);
        self
    }

    /// Sets a deadline for the whole aggregation.
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Visits tenants one at a time.
    pub fn sequential(mut self) -> Self {
        self.mode = Some(ExecutionMode::Sequential);
        self
    }

    /// Visits up to `max_concurrency` tenants at once.
    pub fn parallel(mut self, max_concurrency: usize) -> Self {
        self.mode = Some(ExecutionMode::Parallel);
        self.max_concurrency = Some(max_concurrency);
        self
    }

    /// Returns the tenant ids with repeats removed, keeping first occurrences.
    pub(crate) fn unique_tenant_ids(&self) -> Vec<TenantId> {
        let mut seen = HashSet::with_capacity(self.tenant_ids.len());
        self.tenant_ids
            .iter()
            .filter(|id| seen.insert(*id))
            .cloned()
            .collect()
    }
}

impl<T> fmt::Debug for AggregationRequest<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregationRequest")
            .field("tenant_ids", &self.tenant_ids)
            .field("merge", &self.merge)
            .field("per_tenant_timeout", &self.per_tenant_timeout)
            .field("deadline", &self.deadline)
            .field("mode", &self.mode)
            .field("max_concurrency", &self.max_concurrency)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ActiveContext;
    use crate::error::OperationResult;

    fn noop() -> Arc<dyn TenantOperation<u8>> {
        Arc::new(|_ctx: ActiveContext| async move { OperationResult::<Vec<u8>>::Ok(vec![]) })
    }

    #[test]
    fn test_unique_tenant_ids_keeps_first_occurrence() {
        let request = AggregationRequest::new(["b", "a", "b", "c", "a"], noop());
        let unique: Vec<String> = request
            .unique_tenant_ids()
            .into_iter()
            .map(|id| id.to_string())
            .collect();
        assert_eq!(unique, vec!["b", "a", "c"]);
        assert_eq!(request.tenant_ids.len(), 5);
    }

    #[test]
    fn test_builder_sets_overrides() {
        let request = AggregationRequest::new(["a"], noop())
            .parallel(4)
            .per_tenant_timeout(Duration::from_millis(200))
            .deadline(Duration::from_secs(2));

        assert_eq!(request.mode, Some(ExecutionMode::Parallel));
        assert_eq!(request.max_concurrency, Some(4));
        assert_eq!(request.per_tenant_timeout, Some(Duration::from_millis(200)));
        assert_eq!(request.deadline, Some(Duration::from_secs(2)));
        assert!(format!("{:?}", request).contains("AggregationRequest"));
    }

    #[test]
    fn test_defaults_defer_to_config() {
        let request = AggregationRequest::new(Vec::<TenantId>::new(), noop());
        assert!(request.mode.is_none());
        assert!(request.merge.is_none());
        assert!(request.per_tenant_timeout.is_none());
    }
}
