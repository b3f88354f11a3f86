//! Access level resolver
//!
//! Looks up the effective access level for a (user, module) pair from the
//! user's role. Missing or unrecognized configuration resolves to
//! [`AccessLevel::Own`], never to anything wider.

use crate::error::{AccessError, Result};
use crate::store::OrgGraphStore;
use crate::types::{AccessLevel, OrgUser, Role};
use crm_core::UserId;
use std::sync::Arc;
use tracing::warn;

/// Access level together with how it was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveLevel {
    /// Level to enforce
    pub level: AccessLevel,

    /// True when the configuration was missing or unrecognized and the
    /// narrowest level was substituted
    pub defaulted: bool,
}

impl EffectiveLevel {
    /// Resolve the level a role grants on a module
    pub fn for_role(role: &Role, module: &str) -> Self {
        match role.configured_level(module) {
            None => {
                warn!(
                    "Role {} has no record access configured for module '{}'; defaulting to own",
                    role.id, module
                );
                Self::fallback()
            }
            Some(raw) => match raw.parse::<AccessLevel>() {
                Ok(level) => Self {
                    level,
                    defaulted: false,
                },
                Err(e) => {
                    warn!(
                        "Role {} module '{}': {}; defaulting to own",
                        role.id, module, e
                    );
                    Self::fallback()
                }
            },
        }
    }

    fn fallback() -> Self {
        Self {
            level: AccessLevel::Own,
            defaulted: true,
        }
    }
}

/// Whether a role sees every record of a module
///
/// True for the universal wildcard regardless of the module's own
/// configuration, or when the module is configured at `all`.
pub fn role_has_full_access(role: &Role, module: &str) -> bool {
    role.wildcard_access
        || role
            .configured_level(module)
            .and_then(|raw| raw.parse::<AccessLevel>().ok())
            == Some(AccessLevel::All)
}

/// Resolves requesters and their role configuration from the org graph store
#[derive(Clone)]
pub struct AccessLevelResolver {
    store: Arc<dyn OrgGraphStore>,
}

impl AccessLevelResolver {
    pub fn new(store: Arc<dyn OrgGraphStore>) -> Self {
        Self { store }
    }

    /// Load an active user and their role
    ///
    /// # Errors
    ///
    /// Missing users and dangling role references are hard failures.
    pub async fn load_requester(&self, user_id: UserId) -> Result<(OrgUser, Role)> {
        let user = self
            .store
            .user(user_id)
            .await?
            .ok_or(AccessError::UserNotFound(user_id))?;

        let role = self
            .store
            .role(user.role_id)
            .await?
            .ok_or(AccessError::RoleNotFound(user.role_id))?;

        Ok((user, role))
    }

    /// Effective access level for a user on a module
    pub async fn access_level(&self, user_id: UserId, module: &str) -> Result<AccessLevel> {
        let (_, role) = self.load_requester(user_id).await?;
        Ok(EffectiveLevel::for_role(&role, module).level)
    }

    /// Whether a user sees every record of a module
    pub async fn has_full_access(&self, user_id: UserId, module: &str) -> Result<bool> {
        let (_, role) = self.load_requester(user_id).await?;
        Ok(role_has_full_access(&role, module))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryOrgStore, OrgSnapshot};
    use uuid::Uuid;

    #[test]
    fn test_configured_levels() {
        let role = Role::new(Uuid::new_v4())
            .with_module_access("contacts", "team")
            .with_module_access("leads", "reporting_line");

        assert_eq!(
            EffectiveLevel::for_role(&role, "contacts"),
            EffectiveLevel { level: AccessLevel::Team, defaulted: false }
        );
        assert_eq!(EffectiveLevel::for_role(&role, "leads").level, AccessLevel::ReportingLine);
    }

    #[test]
    fn test_missing_and_unrecognized_default_to_own() {
        let role = Role::new(Uuid::new_v4())
            .with_module_access("contacts", "everything")
            .with_module_access("accounts", "ALL ");

        let missing = EffectiveLevel::for_role(&role, "products");
        assert_eq!(missing.level, AccessLevel::Own);
        assert!(missing.defaulted);

        let unrecognized = EffectiveLevel::for_role(&role, "contacts");
        assert_eq!(unrecognized.level, AccessLevel::Own);
        assert!(unrecognized.defaulted);

        // Case and whitespace are normalized
        assert_eq!(EffectiveLevel::for_role(&role, "accounts").level, AccessLevel::All);
    }

    #[test]
    fn test_full_access() {
        let wildcard = Role::new(Uuid::new_v4())
            .with_module_access("contacts", "own")
            .with_wildcard();
        assert!(role_has_full_access(&wildcard, "contacts"));
        assert!(role_has_full_access(&wildcard, "unconfigured"));

        let scoped = Role::new(Uuid::new_v4())
            .with_module_access("contacts", "all")
            .with_module_access("leads", "team")
            .with_module_access("accounts", "al");
        assert!(role_has_full_access(&scoped, "contacts"));
        assert!(!role_has_full_access(&scoped, "leads"));
        assert!(!role_has_full_access(&scoped, "accounts"));
        assert!(!role_has_full_access(&scoped, "products"));
    }

    #[tokio::test]
    async fn test_resolver_lookups() {
        let role = Role::new(Uuid::new_v4()).with_module_access("contacts", "department");
        let user = OrgUser::new(Uuid::new_v4(), role.id);
        let orphan = OrgUser::new(Uuid::new_v4(), Uuid::new_v4());

        let store = InMemoryOrgStore::from_snapshot(
            OrgSnapshot::new()
                .with_role(role.clone())
                .with_user(user.clone())
                .with_user(orphan.clone()),
        );
        let resolver = AccessLevelResolver::new(Arc::new(store));

        assert_eq!(
            resolver.access_level(user.id, "contacts").await.unwrap(),
            AccessLevel::Department
        );
        assert!(!resolver.has_full_access(user.id, "contacts").await.unwrap());

        assert!(matches!(
            resolver.access_level(Uuid::new_v4(), "contacts").await,
            Err(AccessError::UserNotFound(_))
        ));
        assert!(matches!(
            resolver.access_level(orphan.id, "contacts").await,
            Err(AccessError::RoleNotFound(_))
        ));
    }
}
