//! Error types for the record-access scope resolver

use crm_core::{CoreError, RoleId, UserId};
use thiserror::Error;

/// Scope resolution errors
///
/// Every variant except [`AccessError::UnrecognizedLevel`] is a hard failure:
/// the calling operation must fail rather than run an unscoped query.
#[derive(Debug, Error)]
pub enum AccessError {
    /// Requesting user does not exist (or is soft-deleted)
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    /// Role referenced by a user does not exist
    #[error("Role not found: {0}")]
    RoleNotFound(RoleId),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Access level string outside the recognized set
    #[error("Unrecognized access level: '{0}'")]
    UnrecognizedLevel(String),

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Shared platform error
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for scope resolution operations
pub type Result<T> = std::result::Result<T, AccessError>;
