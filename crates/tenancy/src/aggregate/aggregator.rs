//! The cross-tenant aggregator.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use super::cancel::CancellationSignal;
use super::merger::ResultMerger;
use super::request::AggregationRequest;
use super::result::{AggregationResult, Tagged, TenantFailure, Truncation};
use crate::config::{AggregatorConfig, ExecutionMode};
use crate::context::{ContextHandle, ContextStack};
use crate::error::{AggregationError, ContextError, FailureKind};
use crate::executor::{self, ScopedExecutor, ScopedResult, TenantOperation};
use crate::tenant::{TenantId, TenantRegistry};

/// Runs one operation against many tenants and combines the results.
///
/// A tenant that cannot be resolved, or whose operation fails, panics or
/// times out, is recorded in [`AggregationResult::failed`] and the remaining
/// tenants still run. Only malformed requests and a corrupted context stack
/// are returned as errors.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use carebridge_tenancy::aggregate::{AggregationRequest, CrossTenantAggregator, MergeOptions};
/// use carebridge_tenancy::context::ActiveContext;
/// use carebridge_tenancy::error::OperationResult;
/// use carebridge_tenancy::executor::TenantOperation;
/// use carebridge_tenancy::tenant::{
///     ConnectionParams, InMemoryTenantRegistry, TenantDescriptor, TenantId,
/// };
///
/// # tokio_test::block_on(async {
/// let registry = InMemoryTenantRegistry::from_descriptors([
///     TenantDescriptor::new(TenantId::new("a"), "A", ConnectionParams::new("tenant_a", "")),
///     TenantDescriptor::new(TenantId::new("b"), "B", ConnectionParams::new("tenant_b", "")),
/// ])
/// .unwrap();
///
/// let operation: Arc<dyn TenantOperation<usize>> =
///     Arc::new(|context: ActiveContext| async move {
///         OperationResult::Ok(vec![context.database().map_or(0, str::len)])
///     });
///
/// let aggregator = CrossTenantAggregator::new(Arc::new(registry));
/// let request = AggregationRequest::new(["b", "a", "missing"], operation)
///     .merge(MergeOptions::by(|n: &usize| *n));
/// let result = aggregator.aggregate(request).await.unwrap();
///
/// assert_eq!(result.succeeded.len(), 2);
/// assert_eq!(result.failed.len(), 1);
/// # });
/// ```
pub struct CrossTenantAggregator {
    registry: Arc<dyn TenantRegistry>,
    config: AggregatorConfig,
    merger: ResultMerger,
}

/// Effective settings for one aggregation after applying request overrides.
#[derive(Debug, Clone, Copy)]
struct Plan {
    mode: ExecutionMode,
    max_concurrency: usize,
    per_tenant_timeout: Option<Duration>,
    deadline: Option<Duration>,
}

impl CrossTenantAggregator {
    /// Creates an aggregator with default configuration.
    pub fn new(registry: Arc<dyn TenantRegistry>) -> Self {
        Self::with_config(registry, AggregatorConfig::default())
    }

    /// Creates an aggregator with the given configuration.
    pub fn with_config(registry: Arc<dyn TenantRegistry>, config: AggregatorConfig) -> Self {
        Self {
            registry,
            config,
            merger: ResultMerger::new(),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Returns the tenant registry.
    pub fn registry(&self) -> &Arc<dyn TenantRegistry> {
        &self.registry
    }

    /// Runs `request` on a fresh context stack with no external cancellation.
    pub async fn aggregate<T: Send + 'static>(
        &self,
        request: AggregationRequest<T>,
    ) -> Result<AggregationResult<T>, AggregationError> {
        let mut stack = ContextStack::new();
        self.aggregate_with(&mut stack, request, &CancellationSignal::new())
            .await
    }

    /// Runs `request` on the caller's context stack.
    ///
    /// Sequential runs push each tenant onto `stack`; parallel runs give every
    /// branch its own stack. Either way `stack` is left at the depth it had on
    /// entry. If `signal` fires or the deadline elapses, in-flight work is
    /// aborted, unvisited tenants are marked [`FailureKind::Abandoned`], and
    /// the partial result is returned with its `truncation` set.
    pub async fn aggregate_with<T: Send + 'static>(
        &self,
        stack: &mut ContextStack,
        request: AggregationRequest<T>,
        signal: &CancellationSignal,
    ) -> Result<AggregationResult<T>, AggregationError> {
        let plan = self.plan(&request)?;
        let tenant_ids = request.unique_tenant_ids();
        if tenant_ids.is_empty() {
            debug!("Aggregation requested for no tenants");
            return Ok(AggregationResult::empty());
        }

        let aggregation_id = Uuid::new_v4();
        let span = info_span!(
            "aggregation",
            %aggregation_id,
            tenants = tenant_ids.len(),
            mode = %plan.mode
        );

        self.execute(stack, request, tenant_ids, plan, signal)
            .instrument(span)
            .await
    }

    fn plan<T>(&self, request: &AggregationRequest<T>) -> Result<Plan, AggregationError> {
        if let Some(id) = request.tenant_ids.iter().find(|id| !id.is_well_formed()) {
            return Err(invalid(format!("ill-formed tenant id {:?}", id.as_str())));
        }

        let plan = Plan {
            mode: request.mode.unwrap_or(self.config.mode),
            max_concurrency: request
                .max_concurrency
                .unwrap_or(self.config.max_concurrency),
            per_tenant_timeout: request
                .per_tenant_timeout
                .or(self.config.per_tenant_timeout),
            deadline: request.deadline.or(self.config.deadline),
        };

        if plan.per_tenant_timeout == Some(Duration::ZERO) {
            return Err(invalid("per-tenant timeout must be greater than zero"));
        }
        if plan.deadline == Some(Duration::ZERO) {
            return Err(invalid("deadline must be greater than zero"));
        }
        if plan.mode == ExecutionMode::Parallel && plan.max_concurrency == 0 {
            return Err(invalid("max concurrency must be greater than zero"));
        }

        Ok(plan)
    }

    async fn execute<T: Send + 'static>(
        &self,
        stack: &mut ContextStack,
        request: AggregationRequest<T>,
        tenant_ids: Vec<TenantId>,
        plan: Plan,
        signal: &CancellationSignal,
    ) -> Result<AggregationResult<T>, AggregationError> {
        debug!(
            per_tenant_timeout = ?plan.per_tenant_timeout,
            deadline = ?plan.deadline,
            "Aggregation started"
        );

        let executor = ScopedExecutor::new().timeout(plan.per_tenant_timeout);
        let mut outcomes: Vec<Option<ScopedResult<T>>> =
            std::iter::repeat_with(|| None).take(tenant_ids.len()).collect();

        let truncation = {
            let run = async {
                match plan.mode {
                    ExecutionMode::Sequential => {
                        self.run_sequential(
                            stack,
                            &tenant_ids,
                            &request.operation,
                            &executor,
                            &mut outcomes,
                        )
                        .await
                    }
                    ExecutionMode::Parallel => {
                        self.run_parallel(
                            &tenant_ids,
                            &request.operation,
                            &executor,
                            plan.max_concurrency,
                            &mut outcomes,
                        )
                        .await
                    }
                }
            };

            tokio::select! {
                biased;
                _ = signal.cancelled() => Some(Truncation::Cancelled),
                _ = deadline_elapsed(plan.deadline) => Some(Truncation::DeadlineElapsed),
                finished = run => {
                    finished?;
                    None
                }
            }
        };

        let mut result = AggregationResult::empty();
        for (tenant_id, outcome) in tenant_ids.into_iter().zip(outcomes) {
            let outcome = outcome.unwrap_or_else(|| {
                log_exclusion(&tenant_id, &FailureKind::Abandoned);
                Err(FailureKind::Abandoned)
            });
            match outcome {
                Ok(records) => {
                    result.records.extend(
                        records
                            .into_iter()
                            .map(|value| Tagged::new(tenant_id.clone(), value)),
                    );
                    result.succeeded.push(tenant_id);
                }
                Err(kind) => result.failed.push(TenantFailure { tenant_id, kind }),
            }
        }
        result.truncation = truncation;

        if let Some(merge) = &request.merge {
            let records = std::mem::take(&mut result.records);
            result.records = self.merger.merge(records, merge);
        }

        info!(
            succeeded = result.succeeded.len(),
            failed = result.failed.len(),
            records = result.records.len(),
            truncation = ?result.truncation,
            "Aggregation finished"
        );

        Ok(result)
    }

    async fn run_sequential<T: Send + 'static>(
        &self,
        stack: &mut ContextStack,
        tenant_ids: &[TenantId],
        operation: &Arc<dyn TenantOperation<T>>,
        executor: &ScopedExecutor,
        outcomes: &mut [Option<ScopedResult<T>>],
    ) -> Result<(), ContextError> {
        for (index, tenant_id) in tenant_ids.iter().enumerate() {
            let outcome = run_tenant(
                self.registry.as_ref(),
                executor,
                stack,
                tenant_id,
                Arc::clone(operation),
            )
            .await?;
            record(&mut outcomes[index], tenant_id, outcome);
        }
        Ok(())
    }

    async fn run_parallel<T: Send + 'static>(
        &self,
        tenant_ids: &[TenantId],
        operation: &Arc<dyn TenantOperation<T>>,
        executor: &ScopedExecutor,
        max_concurrency: usize,
        outcomes: &mut [Option<ScopedResult<T>>],
    ) -> Result<(), ContextError> {
        let permits = Arc::new(Semaphore::new(max_concurrency));
        let mut branches = JoinSet::new();
        let mut positions = HashMap::with_capacity(tenant_ids.len());

        for (index, tenant_id) in tenant_ids.iter().enumerate() {
            let registry = Arc::clone(&self.registry);
            let operation = Arc::clone(operation);
            let executor = executor.clone();
            let permits = Arc::clone(&permits);
            let tenant_id = tenant_id.clone();

            let branch = branches.spawn(
                async move {
                    let Ok(_permit) = permits.acquire_owned().await else {
                        return Ok(Err(FailureKind::Abandoned));
                    };
                    let mut stack = ContextStack::new();
                    run_tenant(registry.as_ref(), &executor, &mut stack, &tenant_id, operation)
                        .await
                }
                .in_current_span(),
            );
            positions.insert(branch.id(), index);
        }

        // Dropping the JoinSet aborts every branch still running.
        while let Some(joined) = branches.join_next_with_id().await {
            match joined {
                Ok((id, outcome)) => {
                    if let Some(&index) = positions.get(&id) {
                        record(&mut outcomes[index], &tenant_ids[index], outcome?);
                    }
                }
                Err(err) => {
                    if let Some(&index) = positions.get(&err.id()) {
                        let failure = Err(branch_failure(err));
                        record(&mut outcomes[index], &tenant_ids[index], failure);
                    }
                }
            }
        }

        Ok(())
    }
}

/// Resolves one tenant and runs the operation in its context.
async fn run_tenant<T: Send + 'static>(
    registry: &dyn TenantRegistry,
    executor: &ScopedExecutor,
    stack: &mut ContextStack,
    tenant_id: &TenantId,
    operation: Arc<dyn TenantOperation<T>>,
) -> Result<ScopedResult<T>, ContextError> {
    let descriptor = match registry.resolve(tenant_id).await {
        Ok(descriptor) => descriptor,
        Err(err) => return Ok(Err(FailureKind::from(err))),
    };
    executor
        .run_in(stack, ContextHandle::tenant(descriptor), operation)
        .await
}

/// Stores a tenant's outcome, logging it as it lands.
fn record<T>(
    slot: &mut Option<ScopedResult<T>>,
    tenant_id: &TenantId,
    outcome: ScopedResult<T>,
) {
    match &outcome {
        Ok(records) => {
            debug!(tenant = %tenant_id, records = records.len(), "Tenant contributed records")
        }
        Err(kind) => log_exclusion(tenant_id, kind),
    }
    *slot = Some(outcome);
}

fn log_exclusion(tenant_id: &TenantId, kind: &FailureKind) {
    warn!(
        tenant = %tenant_id,
        error = %kind,
        kind = kind.label(),
        "Tenant excluded from aggregation"
    );
}

async fn deadline_elapsed(deadline: Option<Duration>) {
    match deadline {
        Some(deadline) => tokio::time::sleep(deadline).await,
        None => std::future::pending().await,
    }
}

fn branch_failure(err: JoinError) -> FailureKind {
    if err.is_panic() {
        FailureKind::Panicked(executor::panic_message(err.into_panic()))
    } else {
        FailureKind::Abandoned
    }
}

fn invalid(message: impl Into<String>) -> AggregationError {
    AggregationError::InvalidRequest {
        message: message.into(),
    }
}
