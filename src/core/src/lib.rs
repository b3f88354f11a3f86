//! # CRM Core
//!
//! Shared identifiers, configuration, and error handling for the CRM platform.
//! Service crates depend on this package instead of on each other.

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::DatabaseConfig;
pub use error::{CoreError, Result};
pub use types::{DepartmentId, RoleId, TeamId, TenantId, UserId};
