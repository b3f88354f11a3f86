/// Scope set building module
///
/// Computes which owners' records a requester may see by walking team
/// memberships, the department tree, and manager chains.
///
/// # Examples
///
/// ```no_run
/// use crm_access::scope::ScopeSetBuilder;
/// use crm_access::store::InMemoryOrgStore;
/// use std::sync::Arc;
///
/// # async fn example(user: uuid::Uuid) -> crm_access::Result<()> {
/// let builder = ScopeSetBuilder::new(Arc::new(InMemoryOrgStore::new()), 64);
/// let peers = builder.team_closure(user).await?;
/// assert!(peers.contains(&user));
/// # Ok(())
/// # }
/// ```

mod builder;
mod types;
pub(crate) mod walk;


pub use builder::ScopeSetBuilder;
pub use types::{PrincipalSet, ResolvedScope};
