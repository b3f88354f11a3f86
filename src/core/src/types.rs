//! Identifier types shared across CRM services

use uuid::Uuid;

/// Multi-tenancy tenant identifier
pub type TenantId = String;

/// User identifier; also the owner identity stamped on every module record
pub type UserId = Uuid;

/// Team identifier
pub type TeamId = Uuid;

/// Department identifier
pub type DepartmentId = Uuid;

/// Role identifier
pub type RoleId = Uuid;
