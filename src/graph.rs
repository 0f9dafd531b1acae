//! Dependency discovery across owners.
//!
//! Owners name the owners they read from through
//! [`Optimizable::depends_on`](crate::owner::Optimizable::depends_on). The
//! functions here walk that relation depth-first and reject cycles.

use crate::error::{DofError, Result};
use crate::owner::{OwnerId, Owners};
use std::collections::HashSet;

/// List `root` followed by everything it transitively depends on.
///
/// The walk is a pre-order depth-first traversal in the order each owner lists
/// its dependencies. An owner reachable along several acyclic paths appears
/// once per path; deduplication is left to the caller (see
/// [`collect_owners`]).
///
/// # Errors
///
/// - [`DofError::CyclicDependency`] if a dependency leads back to an owner on
///   the current path, for cycles of any length including self-loops
/// - [`DofError::UnknownOwner`] if a handle does not refer to a live owner
///
/// # Examples
///
/// ```
/// use dofopt_rs::graph::resolve_dependencies;
/// use dofopt_rs::models::Identity;
/// use dofopt_rs::owner::Owners;
///
/// let mut owners = Owners::new();
/// let leaf = owners.insert_with(|id| Identity::new(id, 1.0));
/// let root = owners.insert_with(|id| Identity::new(id, 2.0).depending_on(vec![leaf]));
///
/// assert_eq!(resolve_dependencies(&owners, root).unwrap(), vec![root, leaf]);
/// ```
pub fn resolve_dependencies(owners: &Owners, root: OwnerId) -> Result<Vec<OwnerId>> {
    let mut result = Vec::new();
    walk(owners, root, None, &mut result)?;
    Ok(result)
}

/// Resolve several roots and merge the results, keeping the first occurrence
/// of every owner.
///
/// An owner's dependencies are expanded only the first time it is reached,
/// so shared sub-graphs cost one visit each.
pub fn collect_owners<I>(owners: &Owners, roots: I) -> Result<Vec<OwnerId>>
where
    I: IntoIterator<Item = OwnerId>,
{
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    for root in roots {
        walk(owners, root, Some(&mut seen), &mut merged)?;
    }

    Ok(merged)
}

/// Pre-order walk from `root` on an explicit stack, appending to `result`.
///
/// With `seen`, owners already in the set are neither listed nor expanded
/// again. Without it, every path is walked, which is exponential in the depth
/// of stacked diamonds.
fn walk(
    owners: &Owners,
    root: OwnerId,
    mut seen: Option<&mut HashSet<OwnerId>>,
    result: &mut Vec<OwnerId>,
) -> Result<()> {
    // Owners being expanded, each with its remaining dependencies
    let mut path: Vec<(OwnerId, std::vec::IntoIter<OwnerId>)> = Vec::new();
    let mut on_path = HashSet::new();
    let mut next = Some(root);

    loop {
        if let Some(id) = next.take() {
            // Reaching an owner that is still being expanded closes a cycle
            if on_path.contains(&id) {
                return Err(DofError::CyclicDependency {
                    owner: owners.label(id),
                });
            }

            let expanded = seen.as_deref_mut().map_or(false, |seen| !seen.insert(id));
            if !expanded {
                let owner = owners.get(id)?;
                result.push(id);
                on_path.insert(id);
                path.push((id, owner.depends_on().into_iter()));
            }
        }

        let Some((id, dependencies)) = path.last_mut() else {
            return Ok(());
        };
        match dependencies.next() {
            Some(dependency) => next = Some(dependency),
            None => {
                let id = *id;
                on_path.remove(&id);
                path.pop();
            }
        }
    }
}
