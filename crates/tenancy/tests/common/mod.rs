//! Shared helpers for the tenancy integration tests.
//!
//! Each tenant's "database" is a list of numbered visits in a
//! [`ClinicStore`]. Operations built here read whichever database is active
//! through `context::current()`, the way real data-access code would.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use carebridge_tenancy::context::{self, ActiveContext};
use carebridge_tenancy::error::{OperationError, OperationResult, RegistryError};
use carebridge_tenancy::executor::TenantOperation;
use carebridge_tenancy::tenant::{
    ConnectionParams, InMemoryTenantRegistry, TenantDescriptor, TenantId, TenantRegistry,
};

// ============================================================================
// Fixtures
// ============================================================================

/// Database name used for a test tenant.
pub fn database_for(id: &str) -> String {
    format!("tenant_{}", id.replace('-', "_"))
}

/// Creates a descriptor for a test tenant.
pub fn descriptor(id: &str) -> TenantDescriptor {
    TenantDescriptor::new(
        TenantId::new(id),
        format!("Clinic {}", id),
        ConnectionParams::new(database_for(id), format!("memory://{}", database_for(id))),
    )
}

/// Creates a registry holding the given tenants.
pub fn registry(ids: &[&str]) -> Arc<InMemoryTenantRegistry> {
    Arc::new(
        InMemoryTenantRegistry::from_descriptors(ids.iter().map(|id| descriptor(id)))
            .expect("fixture ids are unique"),
    )
}

/// Per-tenant visit lists keyed by database name.
#[derive(Debug, Default, Clone)]
pub struct ClinicStore {
    databases: HashMap<String, Vec<u32>>,
}

impl ClinicStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the database of tenant `id` with `visits`.
    pub fn with(mut self, id: &str, visits: &[u32]) -> Self {
        self.databases.insert(database_for(id), visits.to_vec());
        self
    }

    /// Reads every visit from the active tenant's database.
    pub fn read_active(&self) -> OperationResult<Vec<u32>> {
        let handle = context::current();
        let descriptor = handle
            .descriptor()
            .ok_or_else(|| OperationError::from("no tenant context active"))?;
        self.databases
            .get(descriptor.database())
            .cloned()
            .ok_or_else(|| OperationError::from(format!("unknown database {}", descriptor.database())))
    }
}

// ============================================================================
// Operations
// ============================================================================

/// Reads the active tenant's visits.
pub fn read_visits(store: ClinicStore) -> Arc<dyn TenantOperation<u32>> {
    let store = Arc::new(store);
    Arc::new(move |_ctx: ActiveContext| {
        let store = Arc::clone(&store);
        async move { store.read_active() }
    })
}

/// Reads the active tenant's visits, failing for `failing` tenants.
pub fn read_visits_failing_for(
    store: ClinicStore,
    failing: &'static [&'static str],
) -> Arc<dyn TenantOperation<u32>> {
    let store = Arc::new(store);
    Arc::new(move |ctx: ActiveContext| {
        let store = Arc::clone(&store);
        async move {
            let id = ctx.tenant_id().map(|id| id.as_str()).unwrap_or_default();
            if failing.contains(&id) {
                return Err(OperationError::from(format!("{} database offline", id)));
            }
            store.read_active()
        }
    })
}

/// Sleeps for the configured duration of the active tenant, then reads.
pub fn read_visits_after(
    store: ClinicStore,
    delays: &'static [(&'static str, Duration)],
) -> Arc<dyn TenantOperation<u32>> {
    let store = Arc::new(store);
    Arc::new(move |ctx: ActiveContext| {
        let store = Arc::clone(&store);
        async move {
            let id = ctx.tenant_id().map(|id| id.as_str()).unwrap_or_default();
            if let Some((_, delay)) = delays.iter().find(|(tenant, _)| *tenant == id) {
                tokio::time::sleep(*delay).await;
            }
            store.read_active()
        }
    })
}

/// Counts how often the wrapped operation runs.
pub struct CountingOperation<T> {
    inner: Arc<dyn TenantOperation<T>>,
    calls: AtomicUsize,
}

impl<T> CountingOperation<T> {
    pub fn new(inner: Arc<dyn TenantOperation<T>>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<T: Send + 'static> TenantOperation<T> for CountingOperation<T> {
    async fn run(&self, context: ActiveContext) -> OperationResult<Vec<T>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.run(context).await
    }
}

// ============================================================================
// Registries
// ============================================================================

/// Counts lookups against an inner registry.
pub struct CountingRegistry<R> {
    inner: R,
    resolves: AtomicUsize,
    listings: AtomicUsize,
}

impl<R: TenantRegistry> CountingRegistry<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            resolves: AtomicUsize::new(0),
            listings: AtomicUsize::new(0),
        }
    }

    pub fn resolves(&self) -> usize {
        self.resolves.load(Ordering::SeqCst)
    }

    pub fn listings(&self) -> usize {
        self.listings.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<R: TenantRegistry> TenantRegistry for CountingRegistry<R> {
    async fn resolve(&self, tenant_id: &TenantId) -> Result<Arc<TenantDescriptor>, RegistryError> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        self.inner.resolve(tenant_id).await
    }

    async fn tenant_ids(&self) -> Result<Vec<TenantId>, RegistryError> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        self.inner.tenant_ids().await
    }
}

/// A registry whose backing store is unreachable for some tenants.
pub struct FlakyRegistry {
    inner: Arc<InMemoryTenantRegistry>,
    unavailable: &'static [&'static str],
}

impl FlakyRegistry {
    pub fn new(inner: Arc<InMemoryTenantRegistry>, unavailable: &'static [&'static str]) -> Self {
        Self { inner, unavailable }
    }
}

#[async_trait]
impl TenantRegistry for FlakyRegistry {
    async fn resolve(&self, tenant_id: &TenantId) -> Result<Arc<TenantDescriptor>, RegistryError> {
        if self.unavailable.contains(&tenant_id.as_str()) {
            return Err(RegistryError::Unavailable {
                message: "catalog replica lagging".to_string(),
            });
        }
        self.inner.resolve(tenant_id).await
    }

    async fn tenant_ids(&self) -> Result<Vec<TenantId>, RegistryError> {
        self.inner.tenant_ids().await
    }
}

// ============================================================================
// Assertions
// ============================================================================

/// Returns `(tenant, value)` pairs from tagged records.
pub fn pairs(records: &[carebridge_tenancy::Tagged<u32>]) -> Vec<(String, u32)> {
    records
        .iter()
        .map(|r| (r.tenant_id.to_string(), r.value))
        .collect()
}

/// Returns tenant ids as strings.
pub fn ids(ids: &[TenantId]) -> Vec<String> {
    ids.iter().map(ToString::to_string).collect()
}
