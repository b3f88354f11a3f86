//! PostgreSQL org graph store implementation

use crate::error::{AccessError, Result};
use crate::store::OrgGraphStore;
use crate::types::{OrgUser, Role, Team};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crm_core::{DatabaseConfig, DepartmentId, RoleId, TenantId, UserId};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

/// PostgreSQL org graph store with connection pooling
///
/// Every query is scoped to one tenant. Department and reporting-line
/// closures run as recursive queries that carry the visited path of each
/// row, so cyclic parent or manager pointers end the branch instead of
/// recursing until the depth bound.
#[derive(Clone)]
pub struct PostgresOrgStore {
    pool: PgPool,
    tenant_id: TenantId,
}

impl PostgresOrgStore {
    /// Connect using a database configuration
    ///
    /// # Example
    /// ```no_run
    /// use crm_access::store::PostgresOrgStore;
    /// use crm_core::DatabaseConfig;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = DatabaseConfig::from_env()?;
    /// let store = PostgresOrgStore::new(&config).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        config.validate()?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .connect(&config.url)
            .await
            .map_err(|e| AccessError::DatabaseError(format!("Failed to connect to database: {}", e)))?;

        info!("Connected org graph store for tenant '{}'", config.tenant_id);

        Ok(Self::from_pool(pool, config.tenant_id.clone()))
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool, tenant_id: impl Into<TenantId>) -> Self {
        Self {
            pool,
            tenant_id: tenant_id.into(),
        }
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AccessError::DatabaseError(format!("Migration failed: {}", e)))?;
        Ok(())
    }

    /// Get database pool for advanced queries
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Tenant this store is scoped to
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    async fn fetch_ids(&self, what: &str, sql: &str, ids: &[Uuid]) -> Result<Vec<Uuid>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(sql)
            .bind(ids)
            .bind(&self.tenant_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AccessError::DatabaseError(format!("Failed to load {}: {}", what, e)))?;

        decode_ids(what, rows)
    }
}

fn decode_ids(what: &str, rows: Vec<PgRow>) -> Result<Vec<Uuid>> {
    rows.iter()
        .map(|row| {
            row.try_get::<Uuid, _>("id")
                .map_err(|e| AccessError::DatabaseError(format!("Failed to parse {}: {}", what, e)))
        })
        .collect()
}

fn depth_bound(max_depth: usize) -> i32 {
    i32::try_from(max_depth).unwrap_or(i32::MAX)
}

/// Level strings from a JSONB object; non-string values keep their JSON text
/// so they fail level parsing instead of being dropped
fn record_access_from_json(value: serde_json::Value) -> Result<HashMap<String, String>> {
    match value {
        serde_json::Value::Object(map) => Ok(map
            .into_iter()
            .map(|(module, level)| match level {
                serde_json::Value::String(s) => (module, s),
                other => (module, other.to_string()),
            })
            .collect()),
        serde_json::Value::Null => Ok(HashMap::new()),
        other => Err(AccessError::DatabaseError(format!(
            "record_access must be a JSON object, found {}",
            other
        ))),
    }
}

#[async_trait]
impl OrgGraphStore for PostgresOrgStore {
    async fn user(&self, id: UserId) -> Result<Option<OrgUser>> {
        let result = sqlx::query(
            "SELECT id, department_id, manager_id, role_id, deleted_at FROM users \
             WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(&self.tenant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AccessError::DatabaseError(format!("Failed to get user: {}", e)))?;

        let Some(row) = result else {
            return Ok(None);
        };

        let parse = |e: sqlx::Error| AccessError::DatabaseError(format!("Failed to parse user: {}", e));
        Ok(Some(OrgUser {
            id: row.try_get("id").map_err(parse)?,
            department_id: row.try_get("department_id").map_err(parse)?,
            manager_id: row.try_get("manager_id").map_err(parse)?,
            role_id: row.try_get("role_id").map_err(parse)?,
            deleted_at: row.try_get::<Option<DateTime<Utc>>, _>("deleted_at").map_err(parse)?,
        }))
    }

    async fn role(&self, id: RoleId) -> Result<Option<Role>> {
        let result = sqlx::query(
            "SELECT id, record_access, wildcard_access FROM roles WHERE id = $1 AND tenant_id = $2",
        )
        .bind(id)
        .bind(&self.tenant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AccessError::DatabaseError(format!("Failed to get role: {}", e)))?;

        let Some(row) = result else {
            return Ok(None);
        };

        let parse = |e: sqlx::Error| AccessError::DatabaseError(format!("Failed to parse role: {}", e));
        let record_access: serde_json::Value = row.try_get("record_access").map_err(parse)?;

        Ok(Some(Role {
            id: row.try_get("id").map_err(parse)?,
            record_access: record_access_from_json(record_access)?,
            wildcard_access: row.try_get("wildcard_access").map_err(parse)?,
        }))
    }

    async fn teams_of(&self, user: UserId) -> Result<Vec<Team>> {
        let rows = sqlx::query(
            "SELECT t.id, t.department_id FROM teams t \
             JOIN team_memberships m ON m.team_id = t.id \
             WHERE m.user_id = $1 AND t.tenant_id = $2",
        )
        .bind(user)
        .bind(&self.tenant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AccessError::DatabaseError(format!("Failed to list teams: {}", e)))?;

        rows.iter()
            .map(|row| {
                let parse = |e: sqlx::Error| AccessError::DatabaseError(format!("Failed to parse team: {}", e));
                Ok(Team {
                    id: row.try_get("id").map_err(parse)?,
                    department_id: row.try_get("department_id").map_err(parse)?,
                })
            })
            .collect()
    }

    async fn team_peers_of(&self, user: UserId) -> Result<HashSet<UserId>> {
        let rows = sqlx::query(
            "SELECT DISTINCT peer.user_id AS id FROM team_memberships mine \
             JOIN team_memberships peer ON peer.team_id = mine.team_id \
             JOIN users u ON u.id = peer.user_id \
             WHERE mine.user_id = $1 AND u.tenant_id = $2 AND u.deleted_at IS NULL",
        )
        .bind(user)
        .bind(&self.tenant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AccessError::DatabaseError(format!("Failed to load team peers: {}", e)))?;

        Ok(decode_ids("team peers", rows)?.into_iter().collect())
    }

    async fn existing_departments(&self, ids: &[DepartmentId]) -> Result<HashSet<DepartmentId>> {
        let found = self
            .fetch_ids(
                "departments",
                "SELECT id FROM departments WHERE id = ANY($1) AND tenant_id = $2",
                ids,
            )
            .await?;
        Ok(found.into_iter().collect())
    }

    async fn child_departments_of(&self, ids: &[DepartmentId]) -> Result<Vec<DepartmentId>> {
        self.fetch_ids(
            "child departments",
            "SELECT id FROM departments WHERE parent_department_id = ANY($1) AND tenant_id = $2",
            ids,
        )
        .await
    }

    async fn users_in_departments(&self, ids: &[DepartmentId]) -> Result<HashSet<UserId>> {
        let found = self
            .fetch_ids(
                "department users",
                "SELECT id FROM users \
                 WHERE department_id = ANY($1) AND tenant_id = $2 AND deleted_at IS NULL",
                ids,
            )
            .await?;
        Ok(found.into_iter().collect())
    }

    async fn team_members_in_departments(&self, ids: &[DepartmentId]) -> Result<HashSet<UserId>> {
        let found = self
            .fetch_ids(
                "department team members",
                "SELECT DISTINCT m.user_id AS id FROM team_memberships m \
                 JOIN teams t ON t.id = m.team_id \
                 JOIN users u ON u.id = m.user_id \
                 WHERE t.department_id = ANY($1) AND t.tenant_id = $2 AND u.deleted_at IS NULL",
                ids,
            )
            .await?;
        Ok(found.into_iter().collect())
    }

    async fn direct_reports_of(&self, managers: &[UserId]) -> Result<Vec<UserId>> {
        self.fetch_ids(
            "direct reports",
            "SELECT id FROM users \
             WHERE manager_id = ANY($1) AND tenant_id = $2 AND deleted_at IS NULL",
            managers,
        )
        .await
    }

    async fn department_subtree_of(
        &self,
        roots: &HashSet<DepartmentId>,
        max_depth: usize,
    ) -> Result<HashSet<DepartmentId>> {
        if roots.is_empty() {
            return Ok(HashSet::new());
        }
        let roots: Vec<DepartmentId> = roots.iter().copied().collect();

        // Each row carries its ancestor path; a department already on the path is not revisited
        let rows = sqlx::query(
            r#"
            WITH RECURSIVE subtree(id, depth, path) AS (
                SELECT id, 0, ARRAY[id] FROM departments WHERE id = ANY($1) AND tenant_id = $2
                UNION ALL
                SELECT d.id, s.depth + 1, s.path || d.id
                FROM departments d
                JOIN subtree s ON d.parent_department_id = s.id
                WHERE d.tenant_id = $2 AND s.depth < $3 AND NOT d.id = ANY(s.path)
            )
            SELECT DISTINCT id FROM subtree
            "#,
        )
        .bind(&roots)
        .bind(&self.tenant_id)
        .bind(depth_bound(max_depth))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AccessError::DatabaseError(format!("Failed to expand departments: {}", e)))?;

        Ok(decode_ids("department subtree", rows)?.into_iter().collect())
    }

    async fn reporting_line_of(&self, manager: UserId, max_depth: usize) -> Result<HashSet<UserId>> {
        let rows = sqlx::query(
            r#"
            WITH RECURSIVE line(id, depth, path) AS (
                SELECT $1::uuid, 0, ARRAY[$1::uuid]
                UNION ALL
                SELECT u.id, l.depth + 1, l.path || u.id
                FROM users u
                JOIN line l ON u.manager_id = l.id
                WHERE u.tenant_id = $2 AND u.deleted_at IS NULL AND l.depth < $3
                  AND NOT u.id = ANY(l.path)
            )
            SELECT DISTINCT id FROM line
            "#,
        )
        .bind(manager)
        .bind(&self.tenant_id)
        .bind(depth_bound(max_depth))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AccessError::DatabaseError(format!("Failed to expand reporting line: {}", e)))?;

        Ok(decode_ids("reporting line", rows)?.into_iter().collect())
    }
}
