//! Filter compiler
//!
//! Turns a resolved scope into a SQL predicate fragment plus the parameters
//! it binds, numbered to follow the caller's own positional parameters.

use crate::error::{AccessError, Result};
use crate::scope::{PrincipalSet, ResolvedScope};
use crate::types::AccessLevel;
use crm_core::UserId;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::warn;

#[cfg(feature = "postgres")]
use sqlx::{postgres::PgArguments, query::Query, Postgres};

/// Predicate used when no row restriction applies
pub const MATCH_ALL: &str = "TRUE";

/// Predicate used when the scope cannot be trusted
pub const MATCH_NOTHING: &str = "FALSE";

/// Value bound to one placeholder of a compiled predicate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FilterParam {
    /// A single owner id (`uuid`)
    Owner(UserId),

    /// Every owner id of a set (`uuid[]`), in ascending order
    Owners(Vec<UserId>),
}

/// Compiled scope predicate
///
/// `predicate` references placeholders `$(offset + 1)` through
/// `$(offset + cursor_delta)`; `parameters` holds their values in order.
/// Set membership binds one array, so the placeholder count never depends
/// on the size of the principal set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeFilter {
    /// SQL boolean expression
    pub predicate: String,

    /// Values to bind, in placeholder order
    pub parameters: Vec<FilterParam>,

    /// How far the caller's parameter cursor advances
    pub cursor_delta: usize,
}

impl ScopeFilter {
    fn literal(predicate: &str) -> Self {
        Self {
            predicate: predicate.to_string(),
            parameters: Vec::new(),
            cursor_delta: 0,
        }
    }

    /// Whether the predicate is the tautology
    pub fn is_unrestricted(&self) -> bool {
        self.predicate == MATCH_ALL
    }

    /// Whether the predicate is the fail-closed contradiction
    pub fn matches_nothing(&self) -> bool {
        self.predicate == MATCH_NOTHING
    }

    /// Every owner id the predicate admits, flattened across parameters
    pub fn owner_ids(&self) -> Vec<UserId> {
        self.parameters
            .iter()
            .flat_map(|param| match param {
                FilterParam::Owner(owner) => std::slice::from_ref(owner),
                FilterParam::Owners(owners) => owners.as_slice(),
            })
            .copied()
            .collect()
    }

    /// Bind the parameters onto a query whose earlier placeholders are already bound
    #[cfg(feature = "postgres")]
    pub fn bind_to<'q>(
        &self,
        mut query: Query<'q, Postgres, PgArguments>,
    ) -> Query<'q, Postgres, PgArguments> {
        for param in &self.parameters {
            query = match param {
                FilterParam::Owner(owner) => query.bind(*owner),
                FilterParam::Owners(owners) => query.bind(owners.clone()),
            };
        }
        query
    }
}

fn owner_column_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
            .expect("owner column pattern is valid")
    })
}

/// Reject anything but a plain or table-qualified identifier
pub fn validate_owner_column(column: &str) -> Result<()> {
    if owner_column_pattern().is_match(column) {
        Ok(())
    } else {
        Err(AccessError::InvalidInput(format!(
            "owner column '{}' is not a plain identifier",
            column
        )))
    }
}

/// Compile a predicate restricting `owner_column` to the principals of `level`
///
/// `param_offset` is the number of positional parameters the caller has
/// already bound. `principals` is ignored for [`AccessLevel::All`]; for every
/// other level a missing or empty set compiles to [`MATCH_NOTHING`].
pub fn compile_filter(
    level: AccessLevel,
    principals: Option<&PrincipalSet>,
    owner_column: &str,
    param_offset: usize,
) -> Result<ScopeFilter> {
    validate_owner_column(owner_column)?;

    if level == AccessLevel::All {
        return Ok(ScopeFilter::literal(MATCH_ALL));
    }

    let principals = match principals {
        Some(set) if !set.is_empty() => set,
        _ => {
            warn!(
                "Empty principal set for {} scope on '{}'; filter fails closed",
                level, owner_column
            );
            return Ok(ScopeFilter::literal(MATCH_NOTHING));
        }
    };

    if let Some(owner) = principals.single() {
        return Ok(ScopeFilter {
            predicate: format!("{} = ${}", owner_column, param_offset + 1),
            parameters: vec![FilterParam::Owner(owner)],
            cursor_delta: 1,
        });
    }

    Ok(ScopeFilter {
        predicate: format!("{} = ANY(${})", owner_column, param_offset + 1),
        parameters: vec![FilterParam::Owners(principals.iter().copied().collect())],
        cursor_delta: 1,
    })
}

/// Compile a resolved scope
pub fn compile_scope(
    scope: &ResolvedScope,
    owner_column: &str,
    param_offset: usize,
) -> Result<ScopeFilter> {
    compile_filter(scope.level(), scope.principals(), owner_column, param_offset)
}
