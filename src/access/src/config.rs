//! Resolver configuration
//!
//! Environment variables:
//! - `CRM_SCOPE_MAX_DEPTH` - Maximum hierarchy depth walked per closure (default: 64)
//! - `CRM_SCOPE_METRICS` - Enable metrics collection (default: true)

use crate::error::{AccessError, Result};
use crm_core::config::parse_var;
use serde::{Deserialize, Serialize};

/// Default bound on department and reporting-line walks
pub const DEFAULT_MAX_TRAVERSAL_DEPTH: usize = 64;

/// Scope resolver configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Maximum number of hierarchy levels expanded below a root
    pub max_traversal_depth: usize,

    /// Enable metrics collection
    pub enable_metrics: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_traversal_depth: DEFAULT_MAX_TRAVERSAL_DEPTH,
            enable_metrics: true,
        }
    }
}

impl ResolverConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(depth) = parse_var::<usize>(&lookup, "CRM_SCOPE_MAX_DEPTH")? {
            config.max_traversal_depth = depth;
        }
        if let Some(enabled) = parse_var::<bool>(&lookup, "CRM_SCOPE_METRICS")? {
            config.enable_metrics = enabled;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make every closure degenerate
    pub fn validate(&self) -> Result<()> {
        if self.max_traversal_depth == 0 {
            return Err(AccessError::Configuration(
                "max_traversal_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
