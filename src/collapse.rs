//! Subtree collapsing over the filtered graph.
//!
//! Collapsing is a pure derivation like filtering: the engine records which roots are collapsed
//! and at what depth, [compute_collapse_ids] turns each root into an ordered hidden-id list, and
//! [collapse] removes the union of those lists to produce the display graph.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::{properties::ConceptId, store::ViewGraph};

/// Roots the user has collapsed, each with the ordered list of ids hidden beneath it.
pub type CollapseGroups = BTreeMap<ConceptId, Vec<ConceptId>>;

/// Breadth-first discovery of the ids hidden when `root` collapses at `depth` hops.
///
/// Adjacency is undirected and follows the order links appear in the graph, so discovery order
/// is deterministic for identical input. The root itself is never part of the result, and a
/// depth of zero hides nothing.
pub fn compute_collapse_ids(root: &ConceptId, depth: usize, graph: &ViewGraph) -> Vec<ConceptId> {
    if depth == 0 || !graph.contains(root) {
        return Vec::new();
    }
    let mut adjacency: BTreeMap<&ConceptId, Vec<&ConceptId>> = BTreeMap::new();
    for link in graph.links() {
        adjacency.entry(&link.source).or_default().push(&link.target);
        adjacency.entry(&link.target).or_default().push(&link.source);
    }

    let mut visited = BTreeSet::from([root]);
    let mut order = Vec::new();
    let mut queue = VecDeque::from([(root, 0usize)]);
    while let Some((id, hops)) = queue.pop_front() {
        if hops == depth {
            continue;
        }
        let Some(neighbors) = adjacency.get(id) else {
            continue;
        };
        for &neighbor in neighbors {
            if visited.insert(neighbor) {
                order.push(neighbor.clone());
                queue.push_back((neighbor, hops + 1));
            }
        }
    }
    order
}

/// Derive the display graph by removing every hidden id and every link touching one. Identity
/// fast path: when no group hides anything the filtered graph passes through unchanged.
pub fn collapse(filtered: &ViewGraph, groups: &CollapseGroups) -> ViewGraph {
    let hidden = groups
        .values()
        .flatten()
        .cloned()
        .collect::<BTreeSet<ConceptId>>();
    if hidden.is_empty() {
        return filtered.clone();
    }
    filtered.without_nodes(&hidden)
}
