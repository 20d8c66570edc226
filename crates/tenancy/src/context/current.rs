//! Task-local publication of the active context.
//!
//! While the scoped executor runs an operation, the operation's context is
//! published in a tokio task-local. Code deep inside the operation can then
//! ask which store is active without having the handle threaded through
//! every call. Task-locals are not inherited by spawned tasks, so one task's
//! context switch never reaches another task's queries.

use std::future::Future;

use super::handle::{ActiveContext, ContextHandle};

tokio::task_local! {
    static ACTIVE: ActiveContext;
}

/// Returns the context active for the current task.
///
/// Outside any published scope this is the central context.
///
/// ```
/// use carebridge_tenancy::context;
///
/// assert!(context::current().is_central());
/// ```
pub fn current() -> ContextHandle {
    ACTIVE
        .try_with(|active| active.handle().clone())
        .unwrap_or_default()
}

/// Returns the published context for the current task, if any.
pub fn current_active() -> Option<ActiveContext> {
    ACTIVE.try_with(Clone::clone).ok()
}

/// Runs `future` with `active` published as the current task's context.
pub(crate) async fn scope<F: Future>(active: ActiveContext, future: F) -> F::Output {
    ACTIVE.scope(active, future).await
}
