//! Record access service
//!
//! The single contract exposed to every module's listing and detail services.
//!
//! # Architecture
//!
//! ```text
//! (user, module) → AccessLevelResolver → ScopeSetBuilder → compile_filter → ScopeFilter
//!                        ↓                     ↓
//!                  [OrgGraphStore] ←───────────┘
//!                                                              ↓
//!                                                         [Metrics]
//! ```
//!
//! Nothing is cached: every call reads the org graph afresh so scope changes
//! take effect on the next request.

use crate::config::ResolverConfig;
use crate::error::Result;
use crate::filter::{compile_scope, validate_owner_column, ScopeFilter};
use crate::level::{role_has_full_access, AccessLevelResolver, EffectiveLevel};
use crate::metrics::{MetricsCollector, ScopeMetrics};
use crate::scope::{ResolvedScope, ScopeSetBuilder};
use crate::store::OrgGraphStore;
use crate::types::AccessLevel;
use crm_core::UserId;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Resolves record-level access scopes for module queries
#[derive(Clone)]
pub struct RecordAccessService {
    levels: AccessLevelResolver,
    scopes: ScopeSetBuilder,
    metrics: Option<Arc<MetricsCollector>>,
    config: ResolverConfig,
}

impl RecordAccessService {
    /// Create a service with the default configuration
    pub fn new(store: Arc<dyn OrgGraphStore>) -> Result<Self> {
        Self::with_config(store, ResolverConfig::default())
    }

    /// Create a service with a custom configuration
    pub fn with_config(store: Arc<dyn OrgGraphStore>, config: ResolverConfig) -> Result<Self> {
        config.validate()?;

        let metrics = config
            .enable_metrics
            .then(|| Arc::new(MetricsCollector::new()));

        info!(
            "RecordAccessService initialized with max_traversal_depth={}, metrics={}",
            config.max_traversal_depth, config.enable_metrics
        );

        Ok(Self {
            levels: AccessLevelResolver::new(Arc::clone(&store)),
            scopes: ScopeSetBuilder::new(store, config.max_traversal_depth),
            metrics,
            config,
        })
    }

    /// Effective access level of a user on a module
    pub async fn resolve_access_level(&self, user: UserId, module: &str) -> Result<AccessLevel> {
        self.levels.access_level(user, module).await
    }

    /// Whether a user sees every record of a module
    pub async fn has_full_access(&self, user: UserId, module: &str) -> Result<bool> {
        self.levels.has_full_access(user, module).await
    }

    /// Resolve which owners' records a user may see in a module
    pub async fn resolve_scope(&self, user: UserId, module: &str) -> Result<ResolvedScope> {
        let start = Instant::now();
        let result = self.resolve_scope_inner(user, module).await;

        if let Some(metrics) = &self.metrics {
            if result.is_err() {
                metrics.record_error().await;
            }
            metrics.record_latency(start.elapsed()).await;
        }

        result
    }

    async fn resolve_scope_inner(&self, user: UserId, module: &str) -> Result<ResolvedScope> {
        let (requester, role) = self.levels.load_requester(user).await?;

        if role_has_full_access(&role, module) {
            debug!("User {} has full access to module '{}'", user, module);
            self.record_resolution(AccessLevel::All, true, false).await;
            return Ok(ResolvedScope::All);
        }

        let effective = EffectiveLevel::for_role(&role, module);
        let scope = match self.scopes.build(&requester, effective.level).await? {
            None => ResolvedScope::All,
            Some(principals) => ResolvedScope::Restricted {
                level: effective.level,
                principals,
            },
        };

        debug!(
            "Resolved scope for user {} on module '{}': level={}, principals={}",
            user,
            module,
            effective.level,
            scope.principals().map_or(0, |p| p.len())
        );

        self.record_resolution(effective.level, false, effective.defaulted)
            .await;
        Ok(scope)
    }

    /// Compile a predicate restricting `owner_column` for a user's module query
    ///
    /// `param_offset` is the number of positional parameters the caller has
    /// already bound; the fragment's placeholders start right after them.
    pub async fn build_scope_filter(
        &self,
        user: UserId,
        module: &str,
        owner_column: &str,
        param_offset: usize,
    ) -> Result<ScopeFilter> {
        validate_owner_column(owner_column)?;

        let scope = self.resolve_scope(user, module).await?;
        let filter = compile_scope(&scope, owner_column, param_offset)?;

        if filter.matches_nothing() {
            if let Some(metrics) = &self.metrics {
                metrics.record_fail_closed().await;
            }
        }

        Ok(filter)
    }

    /// Whether a user may see a single record owned by `owner`
    pub async fn can_access_owner(&self, user: UserId, module: &str, owner: UserId) -> Result<bool> {
        let scope = self.resolve_scope(user, module).await?;
        Ok(scope.permits(&owner))
    }

    /// Current metrics, if collection is enabled
    pub async fn metrics(&self) -> Option<ScopeMetrics> {
        match &self.metrics {
            Some(metrics) => Some(metrics.snapshot().await),
            None => None,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    async fn record_resolution(&self, level: AccessLevel, full_access: bool, defaulted: bool) {
        if let Some(metrics) = &self.metrics {
            metrics.record_resolution(level, full_access, defaulted).await;
        }
    }
}
