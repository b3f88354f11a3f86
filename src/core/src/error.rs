//! Unified error types for the CRM platform
//!
//! Subsystem crates wrap [`CoreError`] in their own error enums.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type for the CRM platform
#[derive(Debug, Error)]
pub enum CoreError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),
}
