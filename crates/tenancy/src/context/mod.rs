//! Data context tracking.
//!
//! Every query issued by the wider application implicitly targets "the active
//! store": the central database or one tenant's database. This module keeps
//! track of which store that is.
//!
//! - [`ContextStack`] - LIFO stack of contexts for one unit of execution
//! - [`current`] / [`current_active`] - Task-local view of the active context
//!
//! A context is switched by
//! [`ScopedExecutor::run_in`](crate::executor::ScopedExecutor::run_in): it
//! pushes a frame through a scope guard, publishes that frame to the
//! operation's task, and restores the previous frame on every exit path.
//! What the stack reports and what a query sees through [`current`] are
//! always the same context.
//!
//! There is deliberately no process-wide "current tenant". A stack belongs to
//! one task; concurrent work gets one stack per branch.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use carebridge_tenancy::context::{self, ActiveContext, ContextHandle, ContextStack};
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
//! let database: Arc<dyn TenantOperation<String>> = Arc::new(|_ctx: ActiveContext| async move {
//!     let active = context::current();
//!     OperationResult::Ok(active.descriptor().map(|d| d.database().to_string()).into_iter().collect())
//! });
//!
//! let mut stack = ContextStack::new();
//! let outcome = ScopedExecutor::new()
//!     .run_in(&mut stack, ContextHandle::tenant(clinic), database)
//!     .await
//!     .unwrap();
//!
//! assert_eq!(outcome.unwrap(), vec!["tenant_clinic_a".to_string()]);
//! assert!(stack.current().is_central());
//! assert!(context::current().is_central());
//! # });
//! ```

mod current;
mod handle;
mod stack;

pub(crate) use current::scope;
pub use current::{current, current_active};
pub use handle::{ActiveContext, ContextHandle};
pub use stack::ContextStack;
