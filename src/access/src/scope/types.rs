//! Principal sets and resolved scopes

use crate::types::AccessLevel;
use crm_core::UserId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Deduplicated set of owner identities a requester may see
///
/// Ordered so that compiled filters and their parameter lists are stable
/// across calls against the same org snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalSet {
    members: BTreeSet<UserId>,
}

impl PrincipalSet {
    /// Set containing only the requester
    pub fn only(requester: UserId) -> Self {
        Self {
            members: BTreeSet::from([requester]),
        }
    }

    /// Requester plus every reachable principal
    pub fn including(requester: UserId, reachable: impl IntoIterator<Item = UserId>) -> Self {
        let mut members: BTreeSet<UserId> = reachable.into_iter().collect();
        members.insert(requester);
        Self { members }
    }

    pub fn contains(&self, user: &UserId) -> bool {
        self.members.contains(user)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members in ascending order
    pub fn iter(&self) -> impl Iterator<Item = &UserId> {
        self.members.iter()
    }

    /// The sole member, if the set has exactly one
    pub fn single(&self) -> Option<UserId> {
        if self.members.len() == 1 {
            self.members.iter().next().copied()
        } else {
            None
        }
    }
}

impl FromIterator<UserId> for PrincipalSet {
    fn from_iter<I: IntoIterator<Item = UserId>>(iter: I) -> Self {
        Self {
            members: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a PrincipalSet {
    type Item = &'a UserId;
    type IntoIter = std::collections::btree_set::Iter<'a, UserId>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.iter()
    }
}

/// Rows a requester may touch in one module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolvedScope {
    /// No row restriction
    All,
    /// Rows owned by one of the principals
    Restricted {
        level: AccessLevel,
        principals: PrincipalSet,
    },
}

impl ResolvedScope {
    /// Access level this scope was resolved at
    pub fn level(&self) -> AccessLevel {
        match self {
            ResolvedScope::All => AccessLevel::All,
            ResolvedScope::Restricted { level, .. } => *level,
        }
    }

    /// Principal set, absent for unrestricted scopes
    pub fn principals(&self) -> Option<&PrincipalSet> {
        match self {
            ResolvedScope::All => None,
            ResolvedScope::Restricted { principals, .. } => Some(principals),
        }
    }

    /// Whether a record owned by `owner` is visible
    pub fn permits(&self, owner: &UserId) -> bool {
        match self {
            ResolvedScope::All => true,
            ResolvedScope::Restricted { principals, .. } => principals.contains(owner),
        }
    }
}
