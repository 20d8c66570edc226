//! Tests for context isolation.
//!
//! Reads made while a tenant's context is active must only ever see that
//! tenant's store, and every switch must be undone on the way out.

mod common;

use std::sync::Arc;

use carebridge_tenancy::context::{self, ActiveContext, ContextHandle, ContextStack};
use carebridge_tenancy::error::{FailureKind, OperationError, OperationResult};
use carebridge_tenancy::executor::{ScopedExecutor, TenantOperation};
use carebridge_tenancy::tenant::TenantRegistry;

use common::*;

async fn handle(id: &str) -> ContextHandle {
    let registry = registry(&[id]);
    ContextHandle::tenant(registry.resolve(&id.into()).await.unwrap())
}

// ============================================================================
// Isolation
// ============================================================================

#[tokio::test]
async fn test_reads_see_only_active_tenant() {
    let store = ClinicStore::new().with("a", &[1, 2]).with("b", &[99]);
    let executor = ScopedExecutor::new();
    let mut stack = ContextStack::new();

    let from_a = executor
        .run_in(&mut stack, handle("a").await, read_visits(store.clone()))
        .await
        .unwrap();
    let from_b = executor
        .run_in(&mut stack, handle("b").await, read_visits(store))
        .await
        .unwrap();

    assert_eq!(from_a, Ok(vec![1, 2]));
    assert_eq!(from_b, Ok(vec![99]));
}

#[tokio::test]
async fn test_stack_and_reads_agree_at_every_level() {
    let store = ClinicStore::new().with("a", &[1]).with("b", &[2]);
    let b = handle("b").await;
    let outer_store = store.clone();

    let nested: Arc<dyn TenantOperation<String>> = Arc::new(move |_ctx: ActiveContext| {
        let store = outer_store.clone();
        let b = b.clone();
        async move {
            let mut stack = ContextStack::new();
            let mut seen = vec![format!("{} {:?}", stack.current(), store.read_active()?)];
            let inner = ScopedExecutor::new()
                .run_in(&mut stack, b, read_visits(store.clone()))
                .await?;
            seen.push(format!("{:?}", inner));
            seen.push(format!("{} {:?}", stack.current(), store.read_active()?));
            OperationResult::Ok(seen)
        }
    });

    let mut stack = ContextStack::new();
    let seen = ScopedExecutor::new()
        .run_in(&mut stack, handle("a").await, nested)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(seen, vec!["tenant:a [1]", "Ok([2])", "tenant:a [1]"]);
    assert!(stack.current().is_central());
    assert!(context::current().is_central());
    assert!(store.read_active().is_err());
}

#[tokio::test]
async fn test_context_not_visible_outside_operation() {
    let executor = ScopedExecutor::new();
    let mut stack = ContextStack::new();
    let observed: Arc<dyn TenantOperation<String>> = Arc::new(|ctx: ActiveContext| async move {
        OperationResult::Ok(vec![context::current().to_string(), ctx.handle().to_string()])
    });

    let seen = executor
        .run_in(&mut stack, handle("a").await, observed)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(seen, vec!["tenant:a".to_string(), "tenant:a".to_string()]);
    assert!(context::current().is_central());
}

#[tokio::test]
async fn test_concurrent_tasks_do_not_share_context() {
    let store = ClinicStore::new().with("a", &[1]).with("b", &[2]);
    let mut tasks = tokio::task::JoinSet::new();

    for id in ["a", "b", "a", "b"] {
        let store = store.clone();
        tasks.spawn(async move {
            let mut stack = ContextStack::new();
            let outcome = ScopedExecutor::new()
                .run_in(&mut stack, handle(id).await, read_visits(store))
                .await
                .unwrap();
            (id, outcome)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let (id, outcome) = joined.unwrap();
        let expected = if id == "a" { vec![1] } else { vec![2] };
        assert_eq!(outcome, Ok(expected));
    }
}

// ============================================================================
// Balance
// ============================================================================

#[tokio::test]
async fn test_failing_runs_leave_depth_unchanged() {
    let failing: Arc<dyn TenantOperation<u32>> = Arc::new(|_ctx: ActiveContext| async move {
        Err::<Vec<u32>, _>(OperationError::from("constraint violated"))
    });
    let executor = ScopedExecutor::new();
    let mut stack = ContextStack::new();

    for _ in 0..5 {
        let outcome = executor
            .run_in(&mut stack, handle("a").await, Arc::clone(&failing))
            .await
            .unwrap();
        assert!(matches!(outcome, Err(FailureKind::Operation(_))));
    }

    assert_eq!(stack.depth(), 0);
    assert!(stack.current().is_central());
    assert!(context::current().is_central());
}
