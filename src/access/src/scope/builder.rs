//! Scope set builder: team, department and reporting-line closures
//!
//! Each closure returns a deduplicated principal set that always contains the
//! requester. Store failures propagate; nothing here falls back to a wider set.

use super::types::PrincipalSet;
use crate::error::Result;
use crate::store::OrgGraphStore;
use crate::types::{AccessLevel, OrgUser};
use crm_core::{DepartmentId, UserId};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Computes principal sets by walking the org graph
///
/// Holds no state between calls; every closure is a fresh read of the store.
#[derive(Clone)]
pub struct ScopeSetBuilder {
    store: Arc<dyn OrgGraphStore>,
    max_depth: usize,
}

impl ScopeSetBuilder {
    /// Create a builder over a store, bounding hierarchy walks to `max_depth` levels
    pub fn new(store: Arc<dyn OrgGraphStore>, max_depth: usize) -> Self {
        Self { store, max_depth }
    }

    /// Principal set for `level`, or `None` when the level is unrestricted
    pub async fn build(&self, user: &OrgUser, level: AccessLevel) -> Result<Option<PrincipalSet>> {
        let set = match level {
            AccessLevel::All => return Ok(None),
            AccessLevel::Own => PrincipalSet::only(user.id),
            AccessLevel::Team => self.team_closure(user.id).await?,
            AccessLevel::Department => self.department_closure(user).await?,
            AccessLevel::ReportingLine => self.reporting_line_closure(user.id).await?,
        };

        debug!(
            "Resolved {} closure for user {}: {} principals",
            level,
            user.id,
            set.len()
        );
        Ok(Some(set))
    }

    /// Every user sharing at least one team with the requester
    pub async fn team_closure(&self, requester: UserId) -> Result<PrincipalSet> {
        let peers = self.store.team_peers_of(requester).await?;
        Ok(PrincipalSet::including(requester, peers))
    }

    /// Every user assigned to, or on a team attached to, the requester's
    /// home departments or any of their descendants
    pub async fn department_closure(&self, requester: &OrgUser) -> Result<PrincipalSet> {
        let home = self.home_departments(requester).await?;
        if home.is_empty() {
            warn!(
                "User {} has no department context; department scope degraded to own records",
                requester.id
            );
            return Ok(PrincipalSet::only(requester.id));
        }

        let subtree = self.store.department_subtree_of(&home, self.max_depth).await?;
        if subtree.is_empty() {
            warn!(
                "Departments {:?} of user {} no longer exist; department scope degraded to own records",
                home, requester.id
            );
            return Ok(PrincipalSet::only(requester.id));
        }

        let departments: Vec<DepartmentId> = subtree.into_iter().collect();
        let assigned = self.store.users_in_departments(&departments).await?;
        let team_members = self.store.team_members_in_departments(&departments).await?;

        Ok(PrincipalSet::including(
            requester.id,
            assigned.into_iter().chain(team_members),
        ))
    }

    /// The requester plus every transitive report
    pub async fn reporting_line_closure(&self, requester: UserId) -> Result<PrincipalSet> {
        let line = self.store.reporting_line_of(requester, self.max_depth).await?;
        Ok(PrincipalSet::including(requester, line))
    }

    /// Direct department assignment plus the departments of the requester's teams
    async fn home_departments(&self, requester: &OrgUser) -> Result<HashSet<DepartmentId>> {
        let mut home: HashSet<DepartmentId> = requester.department_id.into_iter().collect();

        for team in self.store.teams_of(requester.id).await? {
            if let Some(department) = team.department_id {
                home.insert(department);
            }
        }

        Ok(home)
    }
}
