//! Shared fixtures for record access integration tests

#![allow(dead_code)]

use crm_access::store::{InMemoryOrgStore, OrgSnapshot};
use crm_access::types::{Department, OrgUser, Role, Team};
use crm_access::RecordAccessService;
use std::collections::HashMap;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Install a test-writer subscriber once per test binary
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Org chart built by name, for readable scenarios
#[derive(Default)]
pub struct OrgChart {
    snapshot: OrgSnapshot,
    pub users: HashMap<&'static str, Uuid>,
    pub roles: HashMap<&'static str, Uuid>,
    pub teams: HashMap<&'static str, Uuid>,
    pub departments: HashMap<&'static str, Uuid>,
}

impl OrgChart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn role(mut self, name: &'static str, modules: &[(&str, &str)]) -> Self {
        let mut role = Role::new(Uuid::new_v4());
        for (module, level) in modules {
            role = role.with_module_access(*module, *level);
        }
        self.roles.insert(name, role.id);
        self.snapshot = self.snapshot.with_role(role);
        self
    }

    pub fn wildcard_role(mut self, name: &'static str, modules: &[(&str, &str)]) -> Self {
        let mut role = Role::new(Uuid::new_v4()).with_wildcard();
        for (module, level) in modules {
            role = role.with_module_access(*module, *level);
        }
        self.roles.insert(name, role.id);
        self.snapshot = self.snapshot.with_role(role);
        self
    }

    pub fn department(mut self, name: &'static str, parent: Option<&'static str>) -> Self {
        let id = Uuid::new_v4();
        let department = match parent {
            Some(parent) => Department::child_of(id, self.departments[parent]),
            None => Department::root(id),
        };
        self.departments.insert(name, id);
        self.snapshot = self.snapshot.with_department(department);
        self
    }

    pub fn team(mut self, name: &'static str, department: Option<&'static str>) -> Self {
        let mut team = Team::new(Uuid::new_v4());
        if let Some(department) = department {
            team = team.in_department(self.departments[department]);
        }
        self.teams.insert(name, team.id);
        self.snapshot = self.snapshot.with_team(team);
        self
    }

    /// Add a user; `department` and `manager` refer to names added earlier
    pub fn user(
        mut self,
        name: &'static str,
        role: &'static str,
        department: Option<&'static str>,
        manager: Option<&'static str>,
    ) -> Self {
        let mut user = OrgUser::new(Uuid::new_v4(), self.roles[role]);
        if let Some(department) = department {
            user = user.in_department(self.departments[department]);
        }
        if let Some(manager) = manager {
            user = user.reporting_to(self.users[manager]);
        }
        self.users.insert(name, user.id);
        self.snapshot = self.snapshot.with_user(user);
        self
    }

    pub fn member(mut self, user: &'static str, team: &'static str) -> Self {
        self.snapshot = self
            .snapshot
            .with_membership(self.users[user], self.teams[team]);
        self
    }

    pub fn id(&self, user: &str) -> Uuid {
        self.users[user]
    }

    pub fn store(&self) -> Arc<InMemoryOrgStore> {
        Arc::new(InMemoryOrgStore::from_snapshot(self.snapshot.clone()))
    }

    pub fn service(&self) -> (RecordAccessService, Arc<InMemoryOrgStore>) {
        let store = self.store();
        let service = RecordAccessService::new(store.clone()).unwrap();
        (service, store)
    }
}
