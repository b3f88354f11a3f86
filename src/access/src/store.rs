//! Org graph store: the read-only source of users, teams, departments and roles

use crate::error::Result;
use crate::scope::walk::bounded_walk;
use crate::types::{Department, OrgUser, Role, Team, TeamMembership};
use async_trait::async_trait;
use crm_core::{DepartmentId, RoleId, TeamId, UserId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "postgres")]
pub use postgres::PostgresOrgStore;

/// Org graph store trait
///
/// Primitive reads return one hop of the graph. The two closure reads have
/// default implementations that walk those hops breadth-first with a visited
/// set; backends able to compute the closure natively may override them.
/// Soft-deleted users are never returned.
#[async_trait]
pub trait OrgGraphStore: Send + Sync {
    /// Get an active user by ID
    async fn user(&self, id: UserId) -> Result<Option<OrgUser>>;

    /// Get a role by ID
    async fn role(&self, id: RoleId) -> Result<Option<Role>>;

    /// Teams the user belongs to
    async fn teams_of(&self, user: UserId) -> Result<Vec<Team>>;

    /// Active members of any team the user belongs to
    async fn team_peers_of(&self, user: UserId) -> Result<HashSet<UserId>>;

    /// Subset of the given departments that exist
    async fn existing_departments(&self, ids: &[DepartmentId]) -> Result<HashSet<DepartmentId>>;

    /// Direct children of the given departments
    async fn child_departments_of(&self, ids: &[DepartmentId]) -> Result<Vec<DepartmentId>>;

    /// Active users directly assigned to any of the departments
    async fn users_in_departments(&self, ids: &[DepartmentId]) -> Result<HashSet<UserId>>;

    /// Active members of teams attached to any of the departments
    async fn team_members_in_departments(&self, ids: &[DepartmentId]) -> Result<HashSet<UserId>>;

    /// Active direct reports of the given managers
    async fn direct_reports_of(&self, managers: &[UserId]) -> Result<Vec<UserId>>;

    /// Existing roots plus every descendant department, at most `max_depth` levels down
    async fn department_subtree_of(
        &self,
        roots: &HashSet<DepartmentId>,
        max_depth: usize,
    ) -> Result<HashSet<DepartmentId>> {
        let roots: Vec<DepartmentId> = roots.iter().copied().collect();
        let existing = self.existing_departments(&roots).await?;

        bounded_walk(existing, max_depth, move |frontier| async move {
            self.child_departments_of(&frontier).await
        })
        .await
    }

    /// The manager plus every transitive report, at most `max_depth` levels down
    async fn reporting_line_of(&self, manager: UserId, max_depth: usize) -> Result<HashSet<UserId>> {
        let roots = HashSet::from([manager]);

        bounded_walk(roots, max_depth, move |frontier| async move {
            self.direct_reports_of(&frontier).await
        })
        .await
    }
}

/// Point-in-time contents of an in-memory org graph
#[derive(Debug, Clone, Default)]
pub struct OrgSnapshot {
    users: HashMap<UserId, OrgUser>,
    roles: HashMap<RoleId, Role>,
    teams: HashMap<TeamId, Team>,
    departments: HashMap<DepartmentId, Department>,
    memberships: HashSet<TeamMembership>,
}

impl OrgSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: OrgUser) -> Self {
        self.users.insert(user.id, user);
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.insert(role.id, role);
        self
    }

    pub fn with_team(mut self, team: Team) -> Self {
        self.teams.insert(team.id, team);
        self
    }

    pub fn with_department(mut self, department: Department) -> Self {
        self.departments.insert(department.id, department);
        self
    }

    pub fn with_membership(mut self, user_id: UserId, team_id: TeamId) -> Self {
        self.memberships.insert(TeamMembership { user_id, team_id });
        self
    }

    fn active_user(&self, id: &UserId) -> Option<&OrgUser> {
        self.users.get(id).filter(|user| user.is_active())
    }

    fn team_ids_of(&self, user: UserId) -> HashSet<TeamId> {
        self.memberships
            .iter()
            .filter(|m| m.user_id == user)
            .map(|m| m.team_id)
            .collect()
    }

    fn active_members_of(&self, teams: &HashSet<TeamId>) -> HashSet<UserId> {
        self.memberships
            .iter()
            .filter(|m| teams.contains(&m.team_id))
            .filter(|m| self.active_user(&m.user_id).is_some())
            .map(|m| m.user_id)
            .collect()
    }
}

/// In-memory org graph store
pub struct InMemoryOrgStore {
    snapshot: Arc<RwLock<OrgSnapshot>>,
}

impl InMemoryOrgStore {
    /// Create an empty in-memory store
    pub fn new() -> Self {
        Self::from_snapshot(OrgSnapshot::default())
    }

    /// Create a store serving the given snapshot
    pub fn from_snapshot(snapshot: OrgSnapshot) -> Self {
        Self {
            snapshot: Arc::new(RwLock::new(snapshot)),
        }
    }

    /// Insert or replace a user
    pub async fn put_user(&self, user: OrgUser) {
        self.snapshot.write().await.users.insert(user.id, user);
    }

    /// Insert or replace a role
    pub async fn put_role(&self, role: Role) {
        self.snapshot.write().await.roles.insert(role.id, role);
    }

    /// Insert or replace a team
    pub async fn put_team(&self, team: Team) {
        self.snapshot.write().await.teams.insert(team.id, team);
    }

    /// Insert or replace a department
    pub async fn put_department(&self, department: Department) {
        self.snapshot
            .write()
            .await
            .departments
            .insert(department.id, department);
    }

    /// Remove a department record, leaving references to it dangling
    pub async fn remove_department(&self, id: DepartmentId) {
        self.snapshot.write().await.departments.remove(&id);
    }

    /// Add a user to a team
    pub async fn add_membership(&self, user_id: UserId, team_id: TeamId) {
        self.snapshot
            .write()
            .await
            .memberships
            .insert(TeamMembership { user_id, team_id });
    }

    /// Remove a user from a team
    pub async fn remove_membership(&self, user_id: UserId, team_id: TeamId) {
        self.snapshot
            .write()
            .await
            .memberships
            .remove(&TeamMembership { user_id, team_id });
    }
}

impl Default for InMemoryOrgStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrgGraphStore for InMemoryOrgStore {
    async fn user(&self, id: UserId) -> Result<Option<OrgUser>> {
        let snapshot = self.snapshot.read().await;
        Ok(snapshot.active_user(&id).cloned())
    }

    async fn role(&self, id: RoleId) -> Result<Option<Role>> {
        let snapshot = self.snapshot.read().await;
        Ok(snapshot.roles.get(&id).cloned())
    }

    async fn teams_of(&self, user: UserId) -> Result<Vec<Team>> {
        let snapshot = self.snapshot.read().await;
        Ok(snapshot
            .team_ids_of(user)
            .iter()
            .filter_map(|id| snapshot.teams.get(id).copied())
            .collect())
    }

    async fn team_peers_of(&self, user: UserId) -> Result<HashSet<UserId>> {
        let snapshot = self.snapshot.read().await;
        let teams = snapshot.team_ids_of(user);
        Ok(snapshot.active_members_of(&teams))
    }

    async fn existing_departments(&self, ids: &[DepartmentId]) -> Result<HashSet<DepartmentId>> {
        let snapshot = self.snapshot.read().await;
        Ok(ids
            .iter()
            .filter(|id| snapshot.departments.contains_key(id))
            .copied()
            .collect())
    }

    async fn child_departments_of(&self, ids: &[DepartmentId]) -> Result<Vec<DepartmentId>> {
        let snapshot = self.snapshot.read().await;
        let parents: HashSet<&DepartmentId> = ids.iter().collect();
        Ok(snapshot
            .departments
            .values()
            .filter(|d| d.parent_department_id.as_ref().is_some_and(|p| parents.contains(p)))
            .map(|d| d.id)
            .collect())
    }

    async fn users_in_departments(&self, ids: &[DepartmentId]) -> Result<HashSet<UserId>> {
        let snapshot = self.snapshot.read().await;
        let departments: HashSet<&DepartmentId> = ids.iter().collect();
        Ok(snapshot
            .users
            .values()
            .filter(|u| u.is_active())
            .filter(|u| u.department_id.as_ref().is_some_and(|d| departments.contains(d)))
            .map(|u| u.id)
            .collect())
    }

    async fn team_members_in_departments(&self, ids: &[DepartmentId]) -> Result<HashSet<UserId>> {
        let snapshot = self.snapshot.read().await;
        let departments: HashSet<&DepartmentId> = ids.iter().collect();
        let teams: HashSet<TeamId> = snapshot
            .teams
            .values()
            .filter(|t| t.department_id.as_ref().is_some_and(|d| departments.contains(d)))
            .map(|t| t.id)
            .collect();
        Ok(snapshot.active_members_of(&teams))
    }

    async fn direct_reports_of(&self, managers: &[UserId]) -> Result<Vec<UserId>> {
        let snapshot = self.snapshot.read().await;
        let managers: HashSet<&UserId> = managers.iter().collect();
        Ok(snapshot
            .users
            .values()
            .filter(|u| u.is_active())
            .filter(|u| u.manager_id.as_ref().is_some_and(|m| managers.contains(m)))
            .map(|u| u.id)
            .collect())
    }
}
