//! # CRM Record Access
//!
//! Record-level access scope resolver for the multi-tenant CRM.
//!
//! ## Features
//!
//! - **Access levels** per module: own, team, department, reporting line, all
//! - **Graph closures** over team memberships, the department tree, and manager chains
//! - **Cycle-safe walks** with explicit visited sets and a depth bound
//! - **Fail-closed filters** that never widen on bad data
//! - **Embeddable predicates** numbered after the caller's own parameters
//! - **PostgreSQL store** with tenant scoping and recursive queries
//!
//! ## Example
//!
//! ```rust
//! use crm_access::{RecordAccessService, Role, OrgUser};
//! use crm_access::store::{InMemoryOrgStore, OrgSnapshot};
//! use std::sync::Arc;
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let role = Role::new(Uuid::new_v4()).with_module_access("contacts", "own");
//!     let alice = OrgUser::new(Uuid::new_v4(), role.id);
//!
//!     let store = InMemoryOrgStore::from_snapshot(
//!         OrgSnapshot::new().with_role(role).with_user(alice.clone()),
//!     );
//!     let service = RecordAccessService::new(Arc::new(store))?;
//!
//!     let filter = service.build_scope_filter(alice.id, "contacts", "owner_id", 0).await?;
//!     assert_eq!(filter.predicate, "owner_id = $1");
//!     assert_eq!(filter.owner_ids(), vec![alice.id]);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod filter;
pub mod level;
pub mod metrics;
pub mod scope;
pub mod service;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use config::ResolverConfig;
pub use error::{AccessError, Result};
pub use filter::{compile_filter, FilterParam, ScopeFilter};
pub use level::{AccessLevelResolver, EffectiveLevel};
pub use scope::{PrincipalSet, ResolvedScope, ScopeSetBuilder};
pub use service::RecordAccessService;
pub use store::{InMemoryOrgStore, OrgGraphStore};
pub use types::{AccessLevel, Department, OrgUser, Role, Team};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
