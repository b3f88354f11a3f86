//! Core record-access types
//!
//! Org graph records are read-only from the resolver's point of view; they are
//! owned and mutated by the administrative CRUD services.

use crate::error::AccessError;
use chrono::{DateTime, Utc};
use crm_core::{DepartmentId, RoleId, TeamId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Granularity at which a user may view a module's records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// Only records the user owns
    Own,
    /// Records owned by anyone sharing a team with the user
    Team,
    /// Records owned by anyone in the user's department subtrees
    Department,
    /// Records owned by the user's transitive reports
    ReportingLine,
    /// Every record in the tenant
    All,
}

impl AccessLevel {
    /// Every recognized level, narrowest first
    pub const VARIANTS: [AccessLevel; 5] = [
        AccessLevel::Own,
        AccessLevel::Team,
        AccessLevel::Department,
        AccessLevel::ReportingLine,
        AccessLevel::All,
    ];

    /// Canonical configuration string
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Own => "own",
            AccessLevel::Team => "team",
            AccessLevel::Department => "department",
            AccessLevel::ReportingLine => "reporting_line",
            AccessLevel::All => "all",
        }
    }
}

impl FromStr for AccessLevel {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "own" => Ok(AccessLevel::Own),
            "team" => Ok(AccessLevel::Team),
            "department" => Ok(AccessLevel::Department),
            "reporting_line" => Ok(AccessLevel::ReportingLine),
            "all" => Ok(AccessLevel::All),
            _ => Err(AccessError::UnrecognizedLevel(s.to_string())),
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User as seen by the org graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgUser {
    /// User identifier
    pub id: UserId,

    /// Home department, if assigned
    #[serde(default)]
    pub department_id: Option<DepartmentId>,

    /// Direct manager, if any
    #[serde(default)]
    pub manager_id: Option<UserId>,

    /// Role carrying the record access configuration
    pub role_id: RoleId,

    /// Soft-delete marker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl OrgUser {
    /// Create an active user with no department or manager
    pub fn new(id: UserId, role_id: RoleId) -> Self {
        Self {
            id,
            department_id: None,
            manager_id: None,
            role_id,
            deleted_at: None,
        }
    }

    /// Assign the home department
    pub fn in_department(mut self, department_id: DepartmentId) -> Self {
        self.department_id = Some(department_id);
        self
    }

    /// Assign the direct manager
    pub fn reporting_to(mut self, manager_id: UserId) -> Self {
        self.manager_id = Some(manager_id);
        self
    }

    /// Mark the user soft-deleted
    pub fn deleted(mut self, at: DateTime<Utc>) -> Self {
        self.deleted_at = Some(at);
        self
    }

    /// Whether the user has not been soft-deleted
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Team, optionally attached to a department
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Team {
    /// Team identifier
    pub id: TeamId,

    /// Department the team belongs to, if any
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
}

impl Team {
    /// Create a team with no department
    pub fn new(id: TeamId) -> Self {
        Self { id, department_id: None }
    }

    /// Attach the team to a department
    pub fn in_department(mut self, department_id: DepartmentId) -> Self {
        self.department_id = Some(department_id);
        self
    }
}

/// Many-to-many join between users and teams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeamMembership {
    /// Member
    pub user_id: UserId,

    /// Team the member belongs to
    pub team_id: TeamId,
}

/// Department node; root departments have no parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Department {
    /// Department identifier
    pub id: DepartmentId,

    /// Parent department; `None` for a root
    #[serde(default)]
    pub parent_department_id: Option<DepartmentId>,
}

impl Department {
    /// Create a root department
    pub fn root(id: DepartmentId) -> Self {
        Self {
            id,
            parent_department_id: None,
        }
    }

    /// Create a department under `parent`
    pub fn child_of(id: DepartmentId, parent: DepartmentId) -> Self {
        Self {
            id,
            parent_department_id: Some(parent),
        }
    }
}

/// Role with per-module record access configuration
///
/// Levels are stored as raw strings because the configuration is edited by
/// administrators and may hold values outside the recognized set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Role identifier
    pub id: RoleId,

    /// Module name -> configured access level string
    #[serde(default)]
    pub record_access: HashMap<String, String>,

    /// All modules, all actions, all records
    #[serde(default)]
    pub wildcard_access: bool,
}

impl Role {
    /// Create a role with no module configuration
    pub fn new(id: RoleId) -> Self {
        Self {
            id,
            record_access: HashMap::new(),
            wildcard_access: false,
        }
    }

    /// Configure the access level for a module
    pub fn with_module_access(mut self, module: impl Into<String>, level: impl Into<String>) -> Self {
        self.record_access.insert(module.into(), level.into());
        self
    }

    /// Grant the universal wildcard
    pub fn with_wildcard(mut self) -> Self {
        self.wildcard_access = true;
        self
    }

    /// Raw configured level for a module
    pub fn configured_level(&self, module: &str) -> Option<&str> {
        self.record_access.get(module).map(String::as_str)
    }
}
