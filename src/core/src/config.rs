//! Environment-driven database configuration
//!
//! Environment variables:
//! - `DATABASE_URL` - PostgreSQL connection string (required)
//! - `CRM_TENANT_ID` - Tenant whose rows are visible (default: default)
//! - `DATABASE_MAX_CONNECTIONS` - Pool ceiling (default: 25)
//! - `DATABASE_MIN_CONNECTIONS` - Pool floor (default: 5)
//! - `DATABASE_ACQUIRE_TIMEOUT_SECS` - Connection acquire timeout (default: 3)

use crate::error::{CoreError, Result};
use crate::types::TenantId;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Connection settings for the relational store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string
    pub url: String,

    /// Tenant scoping every query
    pub tenant_id: TenantId,

    /// Maximum pooled connections
    pub max_connections: u32,

    /// Minimum idle connections
    pub min_connections: u32,

    /// Timeout when acquiring a pooled connection
    #[serde(with = "duration_secs")]
    pub acquire_timeout: Duration,
}

impl DatabaseConfig {
    /// Create a config with default pool settings
    pub fn new(url: impl Into<String>, tenant_id: impl Into<TenantId>) -> Self {
        Self {
            url: url.into(),
            tenant_id: tenant_id.into(),
            max_connections: 25,
            min_connections: 5,
            acquire_timeout: Duration::from_secs(3),
        }
    }

    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| CoreError::Configuration("DATABASE_URL is not set".to_string()))?;

        let tenant_id = lookup("CRM_TENANT_ID").unwrap_or_else(|| "default".to_string());

        let mut config = Self::new(url, tenant_id);

        if let Some(max) = parse_var::<u32>(&lookup, "DATABASE_MAX_CONNECTIONS")? {
            config.max_connections = max;
        }
        if let Some(min) = parse_var::<u32>(&lookup, "DATABASE_MIN_CONNECTIONS")? {
            config.min_connections = min;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "DATABASE_ACQUIRE_TIMEOUT_SECS")? {
            config.acquire_timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate pool bounds
    pub fn validate(&self) -> Result<()> {
        if self.tenant_id.is_empty() {
            return Err(CoreError::Configuration("tenant id cannot be empty".to_string()));
        }
        if self.max_connections == 0 {
            return Err(CoreError::Configuration(
                "DATABASE_MAX_CONNECTIONS must be greater than zero".to_string(),
            ));
        }
        if self.min_connections > self.max_connections {
            return Err(CoreError::Configuration(format!(
                "DATABASE_MIN_CONNECTIONS ({}) exceeds DATABASE_MAX_CONNECTIONS ({})",
                self.min_connections, self.max_connections
            )));
        }
        Ok(())
    }
}

/// Parse an optional variable, failing on malformed values
pub fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| CoreError::Configuration(format!("{} has invalid value '{}': {}", key, raw, e))),
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
