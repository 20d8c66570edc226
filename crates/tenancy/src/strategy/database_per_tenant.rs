//! Database-per-tenant strategy.
//!
//! Each clinic's records live in a database of their own. This strategy
//! derives that database's name and connection string from the tenant id,
//! so a catalog only needs ids and display names.

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::TenantValidationError;
use crate::tenant::{ConnectionParams, TenantDescriptor, TenantId};

/// Maximum length of a database identifier.
const MAX_DATABASE_NAME_LENGTH: usize = 63;

/// Configuration for the database-per-tenant strategy.
///
/// # Example
///
/// ```
/// use carebridge_tenancy::strategy::DatabasePerTenantConfig;
///
/// let config = DatabasePerTenantConfig {
///     connection_template: "postgres://{user}:{password}@{host}:{port}/{database}".to_string(),
///     host: "db.internal".to_string(),
///     ..Default::default()
/// };
/// assert_eq!(config.database_prefix, "tenant_");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabasePerTenantConfig {
    /// Connection string template.
    ///
    /// `{database}`, `{tenant}`, `{host}`, `{port}`, `{user}` and `{password}`
    /// are substituted; `{tenant}` is the sanitized tenant id.
    pub connection_template: String,

    /// Sanitized ids longer than this are replaced by a hash.
    pub max_tenant_id_length: usize,

    /// Regex every tenant id must match.
    pub tenant_id_pattern: String,

    /// Prepended to every tenant database name.
    pub database_prefix: String,

    /// Appended to every tenant database name.
    pub database_suffix: String,

    /// Database server host.
    pub host: String,

    /// Database server port.
    pub port: u16,

    /// Database holding the central, non-tenant data.
    pub central_database: String,
}

impl Default for DatabasePerTenantConfig {
    fn default() -> Self {
        Self {
            connection_template: "postgres://{user}:{password}@{host}:{port}/{database}".into(),
            max_tenant_id_length: 32,
            tenant_id_pattern: r"^[a-zA-Z][a-zA-Z0-9_-]*$".into(),
            database_prefix: "tenant_".into(),
            database_suffix: String::new(),
            host: "localhost".into(),
            port: 5432,
            central_database: "carebridge_central".into(),
        }
    }
}

impl DatabasePerTenantConfig {
    /// Creates a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the connection template.
    pub fn with_connection_template(mut self, template: impl Into<String>) -> Self {
        self.connection_template = template.into();
        self
    }

    /// Sets the database prefix.
    pub fn with_database_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.database_prefix = prefix.into();
        self
    }

    /// Sets the central database name.
    pub fn with_central_database(mut self, database: impl Into<String>) -> Self {
        self.central_database = database.into();
        self
    }
}

/// Derives per-tenant databases from tenant ids.
///
/// # Database Naming
///
/// ```text
/// tenant_id: "Clinic-North"
/// database:  "tenant_clinic_north"  (with default prefix/suffix)
/// ```
#[derive(Debug, Clone)]
pub struct DatabasePerTenantStrategy {
    config: DatabasePerTenantConfig,
    tenant_pattern: Regex,
}

impl DatabasePerTenantStrategy {
    /// Creates a strategy, compiling the configured tenant id pattern.
    pub fn new(config: DatabasePerTenantConfig) -> Result<Self, regex::Error> {
        let tenant_pattern = Regex::new(&config.tenant_id_pattern)?;
        Ok(Self {
            config,
            tenant_pattern,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &DatabasePerTenantConfig {
        &self.config
    }

    /// Generates the database name for a tenant.
    pub fn database_name(&self, tenant_id: &TenantId) -> String {
        format!(
            "{}{}{}",
            self.config.database_prefix,
            self.sanitize_tenant_id(tenant_id),
            self.config.database_suffix
        )
    }

    /// Builds the connection parameters for a tenant.
    pub fn connection_params(
        &self,
        tenant_id: &TenantId,
        user: &str,
        password: &str,
    ) -> ConnectionParams {
        let database = self.database_name(tenant_id);
        let connection_string = self.render(
            &database,
            &self.sanitize_tenant_id(tenant_id),
            user,
            password,
        );
        ConnectionParams::new(database, connection_string)
    }

    /// Returns the connection parameters of the central database.
    ///
    /// Credentials are left empty; the central store is usually reached
    /// through a separately configured pool.
    pub fn central_params(&self) -> ConnectionParams {
        let database = self.config.central_database.clone();
        let connection_string = self.render(&database, "central", "", "");
        ConnectionParams::new(database, connection_string)
    }

    /// Checks that a tenant id can be turned into a database name.
    pub fn validate(&self, tenant_id: &TenantId) -> Result<(), TenantValidationError> {
        let id = tenant_id.as_str();

        if !self.tenant_pattern.is_match(id) {
            return Err(TenantValidationError {
                tenant_id: id.to_string(),
                reason: format!(
                    "tenant ID does not match required pattern for database names: {}",
                    self.config.tenant_id_pattern
                ),
            });
        }

        if self.database_name(tenant_id).len() > MAX_DATABASE_NAME_LENGTH {
            return Err(TenantValidationError {
                tenant_id: id.to_string(),
                reason: format!(
                    "database name would exceed the length limit ({} chars)",
                    MAX_DATABASE_NAME_LENGTH
                ),
            });
        }

        Ok(())
    }

    /// Validates `tenant_id` and builds its registry descriptor.
    pub fn descriptor(
        &self,
        tenant_id: &TenantId,
        display_name: impl Into<String>,
        user: &str,
        password: &str,
    ) -> Result<TenantDescriptor, TenantValidationError> {
        self.validate(tenant_id)?;
        let connection = self.connection_params(tenant_id, user, password);
        debug!(tenant = %tenant_id, database = %connection.database, "Provisioned tenant descriptor");
        Ok(TenantDescriptor::new(
            tenant_id.clone(),
            display_name,
            connection,
        ))
    }

    fn render(&self, database: &str, tenant: &str, user: &str, password: &str) -> String {
        self.config
            .connection_template
            .replace("{database}", database)
            .replace("{tenant}", tenant)
            .replace("{host}", &self.config.host)
            .replace("{port}", &self.config.port.to_string())
            .replace("{user}", user)
            .replace("{password}", password)
    }

    /// Sanitizes a tenant ID for use in database names.
    fn sanitize_tenant_id(&self, tenant_id: &TenantId) -> String {
        let sanitized = tenant_id.as_str().replace(['-', '/', '.'], "_");

        if sanitized.len() > self.config.max_tenant_id_length {
            Self::hash_tenant_id(tenant_id)
        } else {
            sanitized.to_lowercase()
        }
    }

    /// First 64 bits of the id's SHA-256, hex encoded.
    ///
    /// Database names are persisted, so the digest must not change between
    /// builds or toolchains.
    fn hash_tenant_id(tenant_id: &TenantId) -> String {
        let digest = Sha256::digest(tenant_id.as_str().as_bytes());
        format!("t_{}", &hex::encode(digest)[..16])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strategy() -> DatabasePerTenantStrategy {
        DatabasePerTenantStrategy::new(DatabasePerTenantConfig::default()).unwrap()
    }

    #[test]
    fn test_database_name_is_sanitized() {
        let strategy = strategy();
        assert_eq!(
            strategy.database_name(&TenantId::new("Clinic-North")),
            "tenant_clinic_north"
        );
    }

    #[test]
    fn test_long_id_is_hashed() {
        let strategy = strategy();
        let long = TenantId::new("a".repeat(50));
        let name = strategy.database_name(&long);

        assert!(name.starts_with("tenant_t_"));
        assert_eq!(name, strategy.database_name(&long));
        assert!(strategy.validate(&long).is_ok());
    }

    #[test]
    fn test_hashed_name_is_stable() {
        let strategy = strategy();
        assert_eq!(
            strategy.database_name(&TenantId::new("a".repeat(50))),
            "tenant_t_160b4e433e384e05"
        );
        assert_eq!(
            strategy.database_name(&TenantId::new(
                "clinic-with-an-unusually-long-identifier-2026"
            )),
            "tenant_t_23c478e8690556b5"
        );
    }

    #[test]
    fn test_connection_params_render_template() {
        let strategy = DatabasePerTenantStrategy::new(DatabasePerTenantConfig {
            host: "db.internal".to_string(),
            port: 6432,
            ..Default::default()
        })
        .unwrap();

        let params = strategy.connection_params(&TenantId::new("clinic-a"), "app", "pw");
        assert_eq!(params.database, "tenant_clinic_a");
        assert_eq!(
            params.connection_string,
            "postgres://app:pw@db.internal:6432/tenant_clinic_a"
        );
    }

    #[test]
    fn test_validate_rejects_pattern_mismatch() {
        let err = strategy().validate(&TenantId::new("9-clinic")).unwrap_err();
        assert_eq!(err.tenant_id, "9-clinic");
        assert!(err.reason.contains("pattern"));
    }

    #[test]
    fn test_validate_rejects_overlong_database_name() {
        let strategy = DatabasePerTenantStrategy::new(
            DatabasePerTenantConfig::new().with_database_prefix("p".repeat(60)),
        )
        .unwrap();
        let err = strategy.validate(&TenantId::new("clinic")).unwrap_err();
        assert!(err.reason.contains("63"));
    }

    #[test]
    fn test_descriptor_validates_first() {
        let strategy = strategy();
        assert!(
            strategy
                .descriptor(&TenantId::new("bad id"), "Bad", "u", "p")
                .is_err()
        );

        let descriptor = strategy
            .descriptor(&TenantId::new("clinic-b"), "Clinic B", "u", "p")
            .unwrap();
        assert_eq!(descriptor.display_name(), "Clinic B");
        assert_eq!(descriptor.database(), "tenant_clinic_b");
    }

    #[test]
    fn test_central_params() {
        let strategy = DatabasePerTenantStrategy::new(
            DatabasePerTenantConfig::new()
                .with_central_database("central")
                .with_connection_template("sqlite://{database}.db"),
        )
        .unwrap();
        let params = strategy.central_params();
        assert_eq!(params.database, "central");
        assert_eq!(params.connection_string, "sqlite://central.db");
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let config = DatabasePerTenantConfig {
            tenant_id_pattern: "([".to_string(),
            ..Default::default()
        };
        assert!(DatabasePerTenantStrategy::new(config).is_err());
    }

    #[test]
    fn test_config_deserialize_defaults() {
        let config: DatabasePerTenantConfig =
            serde_json::from_str(r#"{ "database_prefix": "clinic_" }"#).unwrap();
        assert_eq!(config.database_prefix, "clinic_");
        assert_eq!(config.central_database, "carebridge_central");
        assert_eq!(config.port, 5432);
    }
}
