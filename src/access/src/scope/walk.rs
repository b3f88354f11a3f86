//! Bounded breadth-first hierarchy walk

use crate::error::Result;
use std::collections::HashSet;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use tracing::warn;

/// Expand `roots` level by level through `expand` until no new nodes appear
/// or `max_depth` levels have been expanded.
///
/// Every node is expanded at most once, so cyclic parent or manager pointers
/// cannot keep the walk alive. The result always contains the roots.
pub(crate) async fn bounded_walk<T, F, Fut>(
    roots: HashSet<T>,
    max_depth: usize,
    mut expand: F,
) -> Result<HashSet<T>>
where
    T: Copy + Eq + Hash + Debug,
    F: FnMut(Vec<T>) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    let mut visited = roots.clone();
    let mut frontier: Vec<T> = roots.into_iter().collect();
    let mut depth = 0;

    while !frontier.is_empty() {
        if depth >= max_depth {
            warn!(
                "Hierarchy walk truncated at depth {} with {} unexpanded nodes",
                depth,
                frontier.len()
            );
            break;
        }

        let next = expand(frontier).await?;
        frontier = next.into_iter().filter(|node| visited.insert(*node)).collect();
        depth += 1;
    }

    Ok(visited)
}
