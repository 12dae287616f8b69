use std::collections::{HashMap, HashSet};

use log::debug;
use serde::{Deserialize, Serialize};

use super::error::{FamilyError, Result};
use super::{Person, Relationship};

/// How far the validator looks for cycles before accepting a new edge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CyclePolicy {
    /// Reject only the reversed edge (A -> B when B -> A exists).
    #[default]
    Immediate,
    /// Also reject an edge when the parent is already a descendant of the child.
    Reachability,
}

/// Decide whether `parent_id -> child_id` may be added to the given snapshot.
///
/// Checks run in a fixed order and the first failure wins, so callers always
/// see the same error for the same input.
pub fn validate_relationship(
    parent_id: i32,
    child_id: i32,
    people: &[Person],
    relationships: &[Relationship],
    policy: CyclePolicy,
) -> Result<()> {
    if parent_id == child_id {
        return Err(FamilyError::SelfRelationship(parent_id));
    }
    if !people.iter().any(|p| p.id == parent_id) {
        return Err(FamilyError::ParentNotFound(parent_id));
    }
    if !people.iter().any(|p| p.id == child_id) {
        return Err(FamilyError::ChildNotFound(child_id));
    }
    if relationships
        .iter()
        .any(|r| r.parent_id == parent_id && r.child_id == child_id)
    {
        return Err(FamilyError::DuplicateRelationship {
            parent_id,
            child_id,
        });
    }
    if relationships
        .iter()
        .any(|r| r.parent_id == child_id && r.child_id == parent_id)
    {
        return Err(FamilyError::CircularRelationship {
            parent_id,
            child_id,
        });
    }
    if policy == CyclePolicy::Reachability && is_descendant(parent_id, child_id, relationships) {
        debug!("{parent_id} is already a descendant of {child_id}");
        return Err(FamilyError::CircularRelationship {
            parent_id,
            child_id,
        });
    }
    Ok(())
}

/// Depth-first walk over parent -> child edges starting at `ancestor`.
fn is_descendant(target: i32, ancestor: i32, relationships: &[Relationship]) -> bool {
    let mut children: HashMap<i32, Vec<i32>> = HashMap::new();
    for r in relationships {
        children.entry(r.parent_id).or_default().push(r.child_id);
    }

    let mut seen = HashSet::new();
    let mut stack = vec![ancestor];
    while let Some(id) = stack.pop() {
        if id == target {
            return true;
        }
        if !seen.insert(id) {
            continue;
        }
        if let Some(next) = children.get(&id) {
            stack.extend(next.iter().copied().filter(|c| !seen.contains(c)));
        }
    }
    false
}
