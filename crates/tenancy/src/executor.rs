//! Scoped execution of one operation against one data context.
//!
//! [`ScopedExecutor::run_in`] pushes a context, runs a caller-supplied
//! [`TenantOperation`] against it, and restores the previous context on
//! every exit path. Operation errors, panics and timeouts come back as a
//! [`FailureKind`]; only a corrupted context stack is a hard error.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use carebridge_tenancy::context::{ActiveContext, ContextHandle, ContextStack};
//! use carebridge_tenancy::error::OperationResult;
//! use carebridge_tenancy::executor::{ScopedExecutor, TenantOperation};
//! use carebridge_tenancy::tenant::{ConnectionParams, TenantDescriptor, TenantId};
//!
//! # tokio_test::block_on(async {
//! let clinic = Arc::new(TenantDescriptor::new(
//!     TenantId::new("clinic-a"),
//!     "Clinic A",
//!     ConnectionParams::new("tenant_clinic_a", ""),
//! ));
//!
//! let operation: Arc<dyn TenantOperation<String>> =
//!     Arc::new(|context: ActiveContext| async move {
//!         let database = context.database().unwrap_or("central").to_string();
//!         OperationResult::Ok(vec![database])
//!     });
//!
//! let mut stack = ContextStack::new();
//! let outcome = ScopedExecutor::new()
//!     .run_in(&mut stack, ContextHandle::tenant(clinic), operation)
//!     .await
//!     .unwrap();
//!
//! assert_eq!(outcome.unwrap(), vec!["tenant_clinic_a".to_string()]);
//! assert_eq!(stack.depth(), 0);
//! # });
//! ```

use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug};

use crate::context::{self, ActiveContext, ContextHandle, ContextStack};
use crate::error::{ContextError, FailureKind, OperationResult};

/// A unit of work run once per data context.
///
/// The operation receives the context it runs in and returns the records it
/// produced there. The same context is also visible through
/// [`context::current`] for code that does not have the argument at hand.
///
/// Any `Fn(ActiveContext) -> impl Future<Output = OperationResult<Vec<T>>>`
/// closure is an operation.
#[async_trait]
pub trait TenantOperation<T>: Send + Sync {
    /// Runs the operation against `context`.
    async fn run(&self, context: ActiveContext) -> OperationResult<Vec<T>>;
}

#[async_trait]
impl<T, F, Fut> TenantOperation<T> for F
where
    T: Send + 'static,
    F: Fn(ActiveContext) -> Fut + Send + Sync,
    Fut: Future<Output = OperationResult<Vec<T>>> + Send + 'static,
{
    async fn run(&self, context: ActiveContext) -> OperationResult<Vec<T>> {
        (self)(context).await
    }
}

/// Outcome of one scoped run: the operation's records, or why there are none.
pub type ScopedResult<T> = Result<Vec<T>, FailureKind>;

/// Runs operations inside a pushed context with guaranteed restoration.
#[derive(Debug, Clone, Default)]
pub struct ScopedExecutor {
    timeout: Option<Duration>,
}

impl ScopedExecutor {
    /// Creates an executor without a per-operation timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an executor that fails operations running longer than `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }

    /// Sets or clears the per-operation timeout.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the per-operation timeout.
    pub fn operation_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Runs `operation` with `handle` as the active context.
    ///
    /// The previous context is restored before this returns, whether the
    /// operation succeeded, failed, panicked or timed out. If the future
    /// returned here is dropped before completion, the context is still
    /// restored and the in-flight operation is aborted.
    ///
    /// Returns `Err` only if the stack was found unbalanced on the way out.
    pub async fn run_in<T: Send + 'static>(
        &self,
        stack: &mut ContextStack,
        handle: ContextHandle,
        operation: Arc<dyn TenantOperation<T>>,
    ) -> Result<ScopedResult<T>, ContextError> {
        let guard = stack.enter(handle);
        let active = guard.active();
        debug!(context = %active.handle(), depth = active.depth(), "Running scoped operation");

        let outcome = self.execute(active, operation).await;

        guard.release()?;
        Ok(outcome)
    }

    async fn execute<T: Send + 'static>(
        &self,
        active: ActiveContext,
        operation: Arc<dyn TenantOperation<T>>,
    ) -> ScopedResult<T> {
        let published = active.clone();
        let mut task = AbortOnDrop(tokio::spawn(
            context::scope(published, async move { operation.run(active).await })
                .in_current_span(),
        ));

        let joined = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut task.0).await {
                Ok(joined) => joined,
                Err(_) => return Err(FailureKind::TimedOut(limit)),
            },
            None => (&mut task.0).await,
        };

        match joined {
            Ok(Ok(records)) => Ok(records),
            Ok(Err(err)) => Err(FailureKind::Operation(err.to_string())),
            Err(err) if err.is_panic() => Err(FailureKind::Panicked(panic_message(
                err.into_panic(),
            ))),
            Err(err) => Err(FailureKind::Operation(err.to_string())),
        }
    }
}

/// Aborts the wrapped task when dropped, so abandoned operations stop.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
