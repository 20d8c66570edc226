//! Tenant registry: resolves tenant identifiers to descriptors.
//!
//! The registry is the central catalog of tenants. It is read-only from the
//! point of view of the aggregator, and descriptors never change once
//! registered, which makes resolutions safe to cache.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use super::descriptor::TenantDescriptor;
use super::id::TenantId;
use crate::error::RegistryError;

/// Resolves tenant identifiers against the central catalog.
#[async_trait]
pub trait TenantRegistry: Send + Sync {
    /// Resolves a tenant ID to its descriptor.
    ///
    /// Returns [`RegistryError::NotFound`] if the tenant is not in the catalog.
    async fn resolve(&self, tenant_id: &TenantId) -> Result<Arc<TenantDescriptor>, RegistryError>;

    /// Lists every tenant in the catalog, in catalog order.
    async fn tenant_ids(&self) -> Result<Vec<TenantId>, RegistryError>;
}

#[derive(Debug, Default)]
struct Catalog {
    order: Vec<TenantId>,
    by_id: HashMap<TenantId, Arc<TenantDescriptor>>,
}

/// A registry held entirely in memory.
///
/// # Examples
///
/// ```
/// use carebridge_tenancy::tenant::{
///     ConnectionParams, InMemoryTenantRegistry, TenantDescriptor, TenantId,
/// };
///
/// let registry = InMemoryTenantRegistry::new();
/// registry
///     .register(TenantDescriptor::new(
///         TenantId::new("clinic-a"),
///         "Clinic A",
///         ConnectionParams::new("tenant_clinic_a", ""),
///     ))
///     .unwrap();
/// assert_eq!(registry.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryTenantRegistry {
    catalog: RwLock<Catalog>,
}

impl InMemoryTenantRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry from a list of descriptors.
    ///
    /// Fails with [`RegistryError::DuplicateTenant`] if two descriptors share an id.
    pub fn from_descriptors(
        descriptors: impl IntoIterator<Item = TenantDescriptor>,
    ) -> Result<Self, RegistryError> {
        let registry = Self::new();
        for descriptor in descriptors {
            registry.register(descriptor)?;
        }
        Ok(registry)
    }

    /// Creates a registry from a JSON array of descriptors.
    pub fn from_catalog_json(json: &str) -> Result<Self, RegistryError> {
        let descriptors: Vec<TenantDescriptor> =
            serde_json::from_str(json).map_err(|e| RegistryError::Catalog {
                message: e.to_string(),
            })?;
        Self::from_descriptors(descriptors)
    }

    /// Registers a tenant.
    ///
    /// Tenant ids are unique: registering an id twice is an error and leaves
    /// the existing descriptor in place.
    pub fn register(&self, descriptor: TenantDescriptor) -> Result<(), RegistryError> {
        let mut catalog = self.catalog.write();
        let id = descriptor.id().clone();
        if catalog.by_id.contains_key(&id) {
            return Err(RegistryError::DuplicateTenant { tenant_id: id });
        }
        debug!(tenant = %id, database = %descriptor.database(), "Registered tenant");
        catalog.order.push(id.clone());
        catalog.by_id.insert(id, Arc::new(descriptor));
        Ok(())
    }

    /// Returns the number of registered tenants.
    pub fn len(&self) -> usize {
        self.catalog.read().order.len()
    }

    /// Returns `true` if no tenants are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TenantRegistry for InMemoryTenantRegistry {
    async fn resolve(&self, tenant_id: &TenantId) -> Result<Arc<TenantDescriptor>, RegistryError> {
        self.catalog
            .read()
            .by_id
            .get(tenant_id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound {
                tenant_id: tenant_id.clone(),
            })
    }

    async fn tenant_ids(&self) -> Result<Vec<TenantId>, RegistryError> {
        Ok(self.catalog.read().order.clone())
    }
}

/// Memoizes successful resolutions of an inner registry.
///
/// Only hits are cached. A tenant that was not found may be provisioned later,
/// so misses always go to the inner registry.
pub struct CachingTenantRegistry<R> {
    inner: R,
    cache: RwLock<HashMap<TenantId, Arc<TenantDescriptor>>>,
}

impl<R: TenantRegistry> CachingTenantRegistry<R> {
    /// Wraps a registry with a resolution cache.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the number of cached descriptors.
    pub fn cached(&self) -> usize {
        self.cache.read().len()
    }

    /// Drops every cached descriptor.
    pub fn clear(&self) {
        self.cache.write().clear();
    }

    /// Returns the wrapped registry.
    pub fn inner(&self) -> &R {
        &self.inner
    }
}

#[async_trait]
impl<R: TenantRegistry> TenantRegistry for CachingTenantRegistry<R> {
    async fn resolve(&self, tenant_id: &TenantId) -> Result<Arc<TenantDescriptor>, RegistryError> {
        if let Some(hit) = self.cache.read().get(tenant_id).cloned() {
            return Ok(hit);
        }

        let descriptor = self.inner.resolve(tenant_id).await?;
        self.cache
            .write()
            .insert(tenant_id.clone(), Arc::clone(&descriptor));
        Ok(descriptor)
    }

    async fn tenant_ids(&self) -> Result<Vec<TenantId>, RegistryError> {
        self.inner.tenant_ids().await
    }
}
