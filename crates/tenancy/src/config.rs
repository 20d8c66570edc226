//! Configuration for cross-tenant aggregation.
//!
//! [`AggregatorConfig`] holds the defaults an aggregator applies to every
//! request. Individual requests may override the mode, the per-tenant
//! timeout and the deadline.
//!
//! Durations are written as humantime strings (`"10s"`, `"250ms"`).
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use carebridge_tenancy::config::{AggregatorConfig, ExecutionMode};
//!
//! let config: AggregatorConfig = serde_json::from_str(
//!     r#"{ "mode": "parallel", "max_concurrency": 4, "per_tenant_timeout": "2s" }"#,
//! )
//! .unwrap();
//!
//! assert_eq!(config.mode, ExecutionMode::Parallel);
//! assert_eq!(config.per_tenant_timeout, Some(Duration::from_secs(2)));
//! assert!(config.deadline.is_none());
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How tenants are visited during an aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One tenant at a time, in request order, on the caller's context stack.
    #[default]
    Sequential,

    /// Tenants run concurrently, each branch on its own context stack.
    /// Results are still returned in request order.
    Parallel,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Sequential => write!(f, "sequential"),
            ExecutionMode::Parallel => write!(f, "parallel"),
        }
    }
}

/// Aggregator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Default execution mode.
    #[serde(default)]
    pub mode: ExecutionMode,

    /// Maximum number of tenants in flight in parallel mode.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Time allowed for one tenant's operation. `None` waits indefinitely.
    #[serde(
        with = "humantime_serde",
        default = "default_per_tenant_timeout",
        skip_serializing_if = "Option::is_none"
    )]
    pub per_tenant_timeout: Option<Duration>,

    /// Time allowed for the whole aggregation. `None` has no deadline.
    #[serde(
        with = "humantime_serde",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub deadline: Option<Duration>,
}

fn default_max_concurrency() -> usize {
    8
}

fn default_per_tenant_timeout() -> Option<Duration> {
    Some(Duration::from_secs(10))
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::default(),
            max_concurrency: default_max_concurrency(),
            per_tenant_timeout: default_per_tenant_timeout(),
            deadline: None,
        }
    }
}

impl AggregatorConfig {
    /// Creates a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Switches to parallel mode with the given concurrency limit.
    pub fn parallel(mut self, max_concurrency: usize) -> Self {
        self.mode = ExecutionMode::Parallel;
        self.max_concurrency = max_concurrency;
        self
    }

    /// Sets the per-tenant timeout.
    pub fn with_per_tenant_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.per_tenant_timeout = timeout;
        self
    }

    /// Sets the overall deadline.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        // Sequential runs never consult the limit.
        if self.mode == ExecutionMode::Parallel && self.max_concurrency == 0 {
            errors.push("Max concurrency cannot be 0 in parallel mode".to_string());
        }

        if self.per_tenant_timeout == Some(Duration::ZERO) {
            errors.push("Per-tenant timeout cannot be 0".to_string());
        }

        if self.deadline == Some(Duration::ZERO) {
            errors.push("Deadline cannot be 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

// Serde helper for optional humantime durations.
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_str(&humantime::format_duration(*d).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(s) => humantime::parse_duration(&s)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}
