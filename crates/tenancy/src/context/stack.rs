//! The context stack and its scope guard.

use tracing::{error, trace};

use super::handle::{ActiveContext, ContextHandle};
use crate::error::ContextError;

/// Tracks the active data context for one unit of execution.
///
/// A stack starts from the context published for the current task: central
/// at the top level, or the operation's own context when created inside an
/// operation. A stack is an owned value: it is handed to the code that
/// switches contexts by `&mut` reference, so two concurrent tasks can never
/// share one. Parallel work creates one stack per branch.
///
/// Contexts are switched only through
/// [`ScopedExecutor::run_in`](crate::executor::ScopedExecutor::run_in), which
/// publishes the pushed frame to the code it runs. The stack's own view and
/// [`context::current`](super::current) therefore never disagree.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use carebridge_tenancy::context::{self, ActiveContext, ContextHandle, ContextStack};
/// use carebridge_tenancy::error::OperationResult;
/// use carebridge_tenancy::executor::{ScopedExecutor, TenantOperation};
/// use carebridge_tenancy::tenant::{ConnectionParams, TenantDescriptor, TenantId};
///
/// # tokio_test::block_on(async {
/// let clinic = Arc::new(TenantDescriptor::new(
///     TenantId::new("clinic-a"),
///     "Clinic A",
///     ConnectionParams::new("tenant_clinic_a", ""),
/// ));
///
/// let mut stack = ContextStack::new();
/// assert!(stack.current().is_central());
///
/// let seen: Arc<dyn TenantOperation<String>> = Arc::new(|_ctx: ActiveContext| async move {
///     OperationResult::Ok(vec![context::current().to_string()])
/// });
/// let outcome = ScopedExecutor::new()
///     .run_in(&mut stack, ContextHandle::tenant(clinic), seen)
///     .await
///     .unwrap();
///
/// assert_eq!(outcome.unwrap(), vec!["tenant:clinic-a".to_string()]);
/// assert_eq!(stack.depth(), 0);
/// assert!(stack.current().is_central());
/// # });
/// ```
#[derive(Debug)]
pub struct ContextStack {
    base: ContextHandle,
    frames: Vec<ContextHandle>,
}

impl Default for ContextStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextStack {
    /// Creates a stack based on the context published for the current task.
    pub fn new() -> Self {
        Self {
            base: super::current(),
            frames: Vec::new(),
        }
    }

    /// Makes `handle` the active context.
    pub(crate) fn push(&mut self, handle: ContextHandle) {
        trace!(context = %handle, depth = self.frames.len() + 1, "Context pushed");
        self.frames.push(handle);
    }

    /// Discards the active context and restores the previous one.
    ///
    /// Fails with [`ContextError::StackUnderflow`] when only the base remains.
    pub(crate) fn pop(&mut self) -> Result<ContextHandle, ContextError> {
        match self.frames.pop() {
            Some(handle) => {
                trace!(context = %handle, depth = self.frames.len(), "Context popped");
                Ok(handle)
            }
            None => {
                error!("Context stack underflow: pop without matching push");
                Err(ContextError::StackUnderflow)
            }
        }
    }

    /// Returns the active context.
    pub fn current(&self) -> &ContextHandle {
        self.frames.last().unwrap_or(&self.base)
    }

    /// Returns the number of contexts pushed above the base.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Pushes `handle` and returns a guard that restores the previous context
    /// when released or dropped.
    pub(crate) fn enter(&mut self, handle: ContextHandle) -> ContextGuard<'_> {
        self.push(handle);
        let depth = self.depth();
        ContextGuard {
            stack: self,
            depth,
            released: false,
        }
    }

    /// Pops the frame that was pushed at `depth`.
    ///
    /// Frames left above it are discarded so the previous context is restored
    /// either way, but their presence is still reported as an error.
    fn unwind_to(&mut self, depth: usize) -> Result<ContextHandle, ContextError> {
        let actual = self.depth();
        if actual < depth {
            error!(expected = depth, actual, "Context frame already popped");
            return Err(ContextError::StackUnderflow);
        }
        if actual > depth {
            error!(
                expected = depth,
                actual, "Context scope released with frames still active"
            );
            self.frames.truncate(depth - 1);
            return Err(ContextError::Unbalanced {
                expected: depth,
                actual,
            });
        }
        self.pop()
    }
}

/// Scope guard for one pushed context.
///
/// The guard pops its frame exactly once: through [`release`](Self::release)
/// on the normal path, or in `Drop` on every other path (early return, panic
/// unwinding, or the owning future being cancelled).
#[must_use = "dropping the guard immediately restores the previous context"]
pub(crate) struct ContextGuard<'a> {
    stack: &'a mut ContextStack,
    depth: usize,
    released: bool,
}

impl ContextGuard<'_> {
    /// Returns the context this guard activated.
    pub fn active(&self) -> ActiveContext {
        // The guard's own frame may have been popped by misbehaving nested code.
        let handle = self
            .stack
            .frames
            .get(self.depth - 1)
            .cloned()
            .unwrap_or_default();
        ActiveContext::new(handle, self.depth)
    }

    /// Returns the underlying stack, for nested scopes.
    #[cfg(test)]
    pub fn stack(&mut self) -> &mut ContextStack {
        self.stack
    }

    /// Restores the previous context and reports whether the stack was
    /// balanced.
    pub fn release(mut self) -> Result<ContextHandle, ContextError> {
        self.released = true;
        self.stack.unwind_to(self.depth)
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        if !self.released {
            // Errors are already logged by unwind_to; Drop cannot surface them.
            let _ = self.stack.unwind_to(self.depth);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::tenant::{ConnectionParams, TenantDescriptor, TenantId};

    fn tenant(id: &str) -> ContextHandle {
        ContextHandle::tenant(Arc::new(TenantDescriptor::new(
            TenantId::new(id),
            id,
            ConnectionParams::new(format!("tenant_{}", id), ""),
        )))
    }

    #[test]
    fn test_push_pop_lifo() {
        let mut stack = ContextStack::new();
        stack.push(tenant("a"));
        stack.push(tenant("b"));
        assert_eq!(stack.current().tenant_id(), Some(&TenantId::new("b")));

        let popped = stack.pop().unwrap();
        assert_eq!(popped.tenant_id(), Some(&TenantId::new("b")));
        assert_eq!(stack.current().tenant_id(), Some(&TenantId::new("a")));

        stack.pop().unwrap();
        assert!(stack.current().is_central());
    }

    #[test]
    fn test_pop_empty_underflows() {
        let mut stack = ContextStack::new();
        assert_eq!(stack.pop(), Err(ContextError::StackUnderflow));
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn test_central_can_be_pushed_explicitly() {
        let mut stack = ContextStack::new();
        stack.push(tenant("a"));
        stack.push(ContextHandle::Central);
        assert!(stack.current().is_central());
        assert_eq!(stack.depth(), 2);
    }

    #[test]
    fn test_guard_release_restores_previous() {
        let mut stack = ContextStack::new();
        stack.push(tenant("outer"));

        let guard = stack.enter(tenant("inner"));
        assert_eq!(guard.active().tenant_id(), Some(&TenantId::new("inner")));
        assert_eq!(guard.active().depth(), 2);
        let released = guard.release().unwrap();
        assert_eq!(released.tenant_id(), Some(&TenantId::new("inner")));

        assert_eq!(stack.current().tenant_id(), Some(&TenantId::new("outer")));
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn test_guard_drop_restores_previous() {
        let mut stack = ContextStack::new();
        {
            let _guard = stack.enter(tenant("a"));
        }
        assert!(stack.current().is_central());
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn test_guard_nested_scopes() {
        let mut stack = ContextStack::new();
        let mut outer = stack.enter(tenant("a"));
        {
            let inner = outer.stack().enter(tenant("b"));
            assert_eq!(inner.active().depth(), 2);
            inner.release().unwrap();
        }
        assert_eq!(outer.stack().current().tenant_id(), Some(&TenantId::new("a")));
        outer.release().unwrap();
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn test_guard_detects_leftover_frames() {
        let mut stack = ContextStack::new();
        let mut guard = stack.enter(tenant("a"));
        guard.stack().push(tenant("leaked"));

        let err = guard.release().unwrap_err();
        assert_eq!(
            err,
            ContextError::Unbalanced {
                expected: 1,
                actual: 2
            }
        );
        // The previous context is still restored.
        assert_eq!(stack.depth(), 0);
        assert!(stack.current().is_central());
    }

    #[test]
    fn test_guard_detects_extra_pop() {
        let mut stack = ContextStack::new();
        let mut guard = stack.enter(tenant("a"));
        guard.stack().pop().unwrap();

        assert!(guard.active().handle().is_central());
        assert_eq!(guard.release().unwrap_err(), ContextError::StackUnderflow);
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn test_guard_restores_on_panic() {
        let mut stack = ContextStack::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = stack.enter(tenant("a"));
            panic!("operation blew up");
        }));
        assert!(result.is_err());
        assert_eq!(stack.depth(), 0);
    }

    #[tokio::test]
    async fn test_stack_starts_from_published_context() {
        let published = ActiveContext::new(tenant("a"), 1);
        let (base, after) = crate::context::scope(published, async {
            let mut stack = ContextStack::new();
            let base = stack.current().clone();
            stack.push(tenant("b"));
            stack.pop().unwrap();
            (base, stack.current().clone())
        })
        .await;

        assert_eq!(base.tenant_id(), Some(&TenantId::new("a")));
        assert_eq!(after, base);
        assert!(ContextStack::new().current().is_central());
    }
}
