//! Turns the flat people/relationship tables into a forest for display.
//!
//! A person with several parents is mirrored under each of them, so the same
//! person can show up more than once. Every [`TreeNode`] owns its subtree.
//!
//! Cycles can still reach this code (the default validator only rejects
//! 2-cycles), so recursion carries the current root-to-node path and drops any
//! child that is already on it.

use std::collections::{HashMap, HashSet};

use log::{debug, warn};
use serde::Serialize;

use super::{Person, PersonWithRelationships, Relationship};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    pub person: PersonWithRelationships,
    pub level: usize,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Number of nodes in this subtree, including this one.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(TreeNode::size).sum::<usize>()
    }
}

/// Resolve parents and children for every person.
///
/// People come back in ascending id order; parent and child lists follow edge
/// creation order. Edges pointing at unknown people are ignored.
pub fn annotate(people: &[Person], relationships: &[Relationship]) -> Vec<PersonWithRelationships> {
    let by_id: HashMap<i32, &Person> = people.iter().map(|p| (p.id, p)).collect();

    let mut edges: Vec<&Relationship> = relationships.iter().collect();
    edges.sort_by_key(|r| r.id);

    let mut parents: HashMap<i32, Vec<Person>> = HashMap::new();
    let mut children: HashMap<i32, Vec<Person>> = HashMap::new();
    for r in edges {
        let (Some(parent), Some(child)) = (by_id.get(&r.parent_id), by_id.get(&r.child_id)) else {
            debug!("skipping dangling relationship {}", r.id);
            continue;
        };
        parents.entry(child.id).or_default().push((*parent).clone());
        children.entry(parent.id).or_default().push((*child).clone());
    }

    let mut annotated: Vec<PersonWithRelationships> = people
        .iter()
        .map(|p| PersonWithRelationships {
            person: p.clone(),
            parents: parents.remove(&p.id).unwrap_or_default(),
            children: children.remove(&p.id).unwrap_or_default(),
        })
        .collect();
    annotated.sort_by_key(|p| p.person.id);
    annotated
}

/// Build one tree per parentless person, roots in ascending id order.
pub fn build_forest(annotated: &[PersonWithRelationships]) -> Vec<TreeNode> {
    let index: HashMap<i32, &PersonWithRelationships> =
        annotated.iter().map(|p| (p.person.id, p)).collect();

    let mut roots: Vec<&PersonWithRelationships> =
        annotated.iter().filter(|p| p.is_root()).collect();
    roots.sort_by_key(|p| p.person.id);

    let mut path = Vec::new();
    let mut reached = HashSet::new();
    let forest: Vec<TreeNode> = roots
        .into_iter()
        .map(|root| build_node(root, 0, &index, &mut path, &mut reached))
        .collect();

    let unreached = index.len().saturating_sub(reached.len());
    if unreached > 0 {
        warn!("{unreached} people are not reachable from any root and were left out of the tree");
    }
    forest
}

/// [`annotate`] followed by [`build_forest`].
pub fn assemble(people: &[Person], relationships: &[Relationship]) -> Vec<TreeNode> {
    build_forest(&annotate(people, relationships))
}

fn build_node(
    entry: &PersonWithRelationships,
    level: usize,
    index: &HashMap<i32, &PersonWithRelationships>,
    path: &mut Vec<i32>,
    reached: &mut HashSet<i32>,
) -> TreeNode {
    let id = entry.person.id;
    path.push(id);
    reached.insert(id);

    let mut children = Vec::with_capacity(entry.children.len());
    for child in &entry.children {
        if path.contains(&child.id) {
            debug!("cycle: {} is an ancestor of {id}, truncating branch", child.id);
            continue;
        }
        if let Some(next) = index.get(&child.id) {
            children.push(build_node(next, level + 1, index, path, reached));
        }
    }

    path.pop();
    TreeNode {
        person: entry.clone(),
        level,
        children,
    }
}
