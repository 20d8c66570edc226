//! Tenant identifier type.
//!
//! This module defines the [`TenantId`] type, an opaque identifier for a
//! tenant (one clinic's isolated database) in the central catalog.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An opaque tenant identifier.
///
/// Identifiers are unique within the central registry. The core never
/// interprets them beyond checking that they are well formed; mapping an id
/// to a database is the job of the registry and the tenancy strategy.
///
/// # Examples
///
/// ```
/// use carebridge_tenancy::tenant::TenantId;
///
/// let clinic = TenantId::new("northside-physio");
/// assert_eq!(clinic.as_str(), "northside-physio");
/// assert!(clinic.is_well_formed());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Creates a new tenant ID from the given string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the tenant ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the identifier is non-empty and carries no
    /// surrounding whitespace.
    ///
    /// ```
    /// use carebridge_tenancy::tenant::TenantId;
    ///
    /// assert!(TenantId::new("clinic-7").is_well_formed());
    /// assert!(!TenantId::new("").is_well_formed());
    /// assert!(!TenantId::new(" clinic-7").is_well_formed());
    /// ```
    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty() && self.0.trim() == self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TenantId({})", self.0)
    }
}

impl FromStr for TenantId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(TenantId::new(s))
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        TenantId::new(s)
    }
}

impl From<String> for TenantId {
    fn from(s: String) -> Self {
        TenantId::new(s)
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_id_creation() {
        let tenant = TenantId::new("clinic-a");
        assert_eq!(tenant.as_str(), "clinic-a");
        assert_eq!(tenant.to_string(), "clinic-a");
        assert_eq!(format!("{:?}", tenant), "TenantId(clinic-a)");
    }

    #[test]
    fn test_well_formed() {
        assert!(TenantId::new("a").is_well_formed());
        assert!(!TenantId::new("").is_well_formed());
        assert!(!TenantId::new("clinic ").is_well_formed());
        assert!(!TenantId::new("\tclinic").is_well_formed());
    }

    #[test]
    fn test_serde_transparent() {
        let tenant = TenantId::new("clinic-a");
        let json = serde_json::to_string(&tenant).unwrap();
        assert_eq!(json, "\"clinic-a\"");

        let parsed: TenantId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, tenant);
    }

    #[test]
    fn test_from_string() {
        let tenant: TenantId = "clinic-a".into();
        let tenant2: TenantId = String::from("clinic-a").into();
        let tenant3: TenantId = "clinic-a".parse().unwrap();
        assert_eq!(tenant, tenant2);
        assert_eq!(tenant2, tenant3);
    }
}
