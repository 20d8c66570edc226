//! Context handles: which data store is active.

use std::fmt;
use std::sync::Arc;

use crate::tenant::{TenantDescriptor, TenantId};

/// A data context: the central store or one tenant's store.
///
/// Handles are cheap to clone; a tenant handle shares its descriptor with
/// the registry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ContextHandle {
    /// The central, non-tenant-scoped store (users, tenant catalog).
    #[default]
    Central,

    /// A single tenant's isolated store.
    Tenant(Arc<TenantDescriptor>),
}

impl ContextHandle {
    /// Creates a tenant handle from a descriptor.
    pub fn tenant(descriptor: Arc<TenantDescriptor>) -> Self {
        ContextHandle::Tenant(descriptor)
    }

    /// Returns `true` for the central context.
    pub fn is_central(&self) -> bool {
        matches!(self, ContextHandle::Central)
    }

    /// Returns the tenant ID, or `None` for the central context.
    pub fn tenant_id(&self) -> Option<&TenantId> {
        self.descriptor().map(|d| d.id())
    }

    /// Returns the tenant descriptor, or `None` for the central context.
    pub fn descriptor(&self) -> Option<&Arc<TenantDescriptor>> {
        match self {
            ContextHandle::Central => None,
            ContextHandle::Tenant(descriptor) => Some(descriptor),
        }
    }
}

impl fmt::Display for ContextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextHandle::Central => write!(f, "central"),
            ContextHandle::Tenant(descriptor) => write!(f, "tenant:{}", descriptor.id()),
        }
    }
}

/// The context an operation runs in, as seen by the operation.
///
/// This is the handle that was pushed for the operation together with the
/// stack depth it was pushed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveContext {
    handle: ContextHandle,
    depth: usize,
}

impl ActiveContext {
    pub(crate) fn new(handle: ContextHandle, depth: usize) -> Self {
        Self { handle, depth }
    }

    /// Returns the active handle.
    pub fn handle(&self) -> &ContextHandle {
        &self.handle
    }

    /// Returns the depth of this frame above central.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns the tenant ID, or `None` for the central context.
    pub fn tenant_id(&self) -> Option<&TenantId> {
        self.handle.tenant_id()
    }

    /// Returns the tenant descriptor, or `None` for the central context.
    pub fn descriptor(&self) -> Option<&Arc<TenantDescriptor>> {
        self.handle.descriptor()
    }

    /// Returns the database name of the active tenant, or `None` for central.
    pub fn database(&self) -> Option<&str> {
        self.handle.descriptor().map(|d| d.database())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenant::ConnectionParams;

    fn tenant(id: &str) -> ContextHandle {
        ContextHandle::tenant(Arc::new(TenantDescriptor::new(
            TenantId::new(id),
            id,
            ConnectionParams::new(format!("tenant_{}", id), ""),
        )))
    }

    #[test]
    fn test_central_handle() {
        let handle = ContextHandle::default();
        assert!(handle.is_central());
        assert!(handle.tenant_id().is_none());
        assert_eq!(handle.to_string(), "central");
    }

    #[test]
    fn test_tenant_handle() {
        let handle = tenant("a");
        assert!(!handle.is_central());
        assert_eq!(handle.tenant_id(), Some(&TenantId::new("a")));
        assert_eq!(handle.to_string(), "tenant:a");
    }

    #[test]
    fn test_active_context_database() {
        let active = ActiveContext::new(tenant("a"), 1);
        assert_eq!(active.database(), Some("tenant_a"));
        assert_eq!(active.depth(), 1);

        let central = ActiveContext::new(ContextHandle::Central, 0);
        assert_eq!(central.database(), None);
    }
}
