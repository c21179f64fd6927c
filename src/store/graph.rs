//! Graph data structures for the materialized view.
//!
//! - [`LinkGraph`]: owned petgraph structure with [Relationship] edges, unique per [LinkKey]
//! - [`ViewGraph`]: concepts plus links, the shape every derivation stage consumes and produces

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use crate::properties::{Concept, ConceptId, LinkKey, Relationship};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkGraph(pub petgraph::Graph<ConceptId, Relationship>);

impl Default for LinkGraph {
    fn default() -> Self {
        LinkGraph(petgraph::Graph::new())
    }
}

impl LinkGraph {
    pub fn as_graph(&self) -> &petgraph::Graph<ConceptId, Relationship> {
        &self.0
    }

    /// Build from an iterator of relationships. Later arrivals for an occupied [LinkKey] are
    /// dropped; link order otherwise follows the input, which downstream breadth-first walks rely
    /// on for deterministic discovery order.
    pub fn from_links<I>(iterable: I) -> Self
    where
        I: IntoIterator<Item = Relationship>,
    {
        let mut links = LinkGraph::default();
        let mut id_to_index = BTreeMap::new();
        for link in iterable {
            links.insert_indexed(link, &mut id_to_index);
        }
        links
    }

    /// Insert one link, maintaining the caller's id→index map across calls. Returns false when
    /// the key is already occupied.
    pub(crate) fn insert_indexed(
        &mut self,
        link: Relationship,
        id_to_index: &mut BTreeMap<ConceptId, NodeIndex>,
    ) -> bool {
        let source_idx = *id_to_index
            .entry(link.source.clone())
            .or_insert_with(|| self.0.add_node(link.source.clone()));
        let target_idx = *id_to_index
            .entry(link.target.clone())
            .or_insert_with(|| self.0.add_node(link.target.clone()));
        let occupied = self
            .0
            .edges_connecting(source_idx, target_idx)
            .any(|edge| edge.weight().predicate == link.predicate);
        if occupied {
            return false;
        }
        self.0.add_edge(source_idx, target_idx, link);
        true
    }

    /// Rebuild the id→index map from the graph's current node set.
    pub(crate) fn index(&self) -> BTreeMap<ConceptId, NodeIndex> {
        self.0
            .node_indices()
            .map(|idx| (self.0[idx].clone(), idx))
            .collect()
    }

    pub fn contains_key(&self, key: &LinkKey) -> bool {
        self.links().any(|link| &link.key() == key)
    }

    /// Links in insertion order.
    pub fn links(&self) -> impl Iterator<Item = &Relationship> + '_ {
        self.0.raw_edges().iter().map(|edge| &edge.weight)
    }

    pub fn link_count(&self) -> usize {
        self.0.edge_count()
    }

    pub fn keys(&self) -> BTreeSet<LinkKey> {
        self.links().map(Relationship::key).collect()
    }
}

/// One consistent slice of the graph: a concept map plus the links among those concepts. Derived
/// stages consume and produce this shape; it also serializes directly for hand-off to the
/// rendering surface.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ViewGraph {
    pub concepts: BTreeMap<ConceptId, Concept>,
    pub relations: LinkGraph,
}

impl ViewGraph {
    /// Assemble a view from parts, enforcing the membership invariant: links whose endpoints are
    /// not both present in `concepts` are dropped, duplicate keys keep the first arrival.
    pub fn from_parts<I>(concepts: BTreeMap<ConceptId, Concept>, links: I) -> Self
    where
        I: IntoIterator<Item = Relationship>,
    {
        let relations = LinkGraph::from_links(links.into_iter().filter(|link| {
            concepts.contains_key(&link.source) && concepts.contains_key(&link.target)
        }));
        ViewGraph {
            concepts,
            relations,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty() && self.relations.as_graph().node_count() == 0
    }

    pub fn node_count(&self) -> usize {
        self.concepts.len()
    }

    pub fn link_count(&self) -> usize {
        self.relations.link_count()
    }

    pub fn contains(&self, id: &ConceptId) -> bool {
        self.concepts.contains_key(id)
    }

    pub fn get(&self, id: &ConceptId) -> Option<&Concept> {
        self.concepts.get(id)
    }

    /// Links in insertion order.
    pub fn links(&self) -> impl Iterator<Item = &Relationship> + '_ {
        self.relations.links()
    }

    pub fn link_keys(&self) -> BTreeSet<LinkKey> {
        self.relations.keys()
    }

    /// Link degree per concept. Concepts touching no link are absent; callers treat them as
    /// degree zero.
    pub fn degrees(&self) -> BTreeMap<ConceptId, usize> {
        let mut degrees = BTreeMap::new();
        for link in self.links() {
            *degrees.entry(link.source.clone()).or_insert(0) += 1;
            *degrees.entry(link.target.clone()).or_insert(0) += 1;
        }
        degrees
    }

    /// Copy of this view with `hidden` concepts and every link touching them removed.
    pub fn without_nodes(&self, hidden: &BTreeSet<ConceptId>) -> ViewGraph {
        let concepts: BTreeMap<ConceptId, Concept> = self
            .concepts
            .iter()
            .filter(|(id, _)| !hidden.contains(*id))
            .map(|(id, concept)| (id.clone(), concept.clone()))
            .collect();
        ViewGraph::from_parts(
            concepts,
            self.links()
                .filter(|link| !hidden.contains(&link.source) && !hidden.contains(&link.target))
                .cloned(),
        )
    }

    /// Find ids referenced by links but missing from the concept map. Returns a sorted,
    /// deduplicated list; always empty when the merge discipline held.
    pub fn find_orphaned_links(&self) -> Vec<ConceptId> {
        let mut missing = Vec::new();
        for link in self.links() {
            if !self.concepts.contains_key(&link.source) {
                missing.push(link.source.clone());
            }
            if !self.concepts.contains_key(&link.target) {
                missing.push(link.target.clone());
            }
        }
        missing.sort();
        missing.dedup();
        missing
    }

    pub fn display_contents(&self) -> String {
        format!(
            "concepts:\n- {}\nrelations:\n- {}",
            self.concepts
                .values()
                .map(|concept| format!("{concept} [{}]", concept.domain))
                .collect::<Vec<String>>()
                .join(",\n- "),
            self.links()
                .map(|link| format!("{link}"))
                .collect::<Vec<String>>()
                .join(",\n- "),
        )
    }
}

/// Equality is membership equality: same concept ids and same link keys. Payload differences and
/// insertion order are not part of a view's identity.
impl PartialEq for ViewGraph {
    fn eq(&self, other: &Self) -> bool {
        self.concepts.keys().eq(other.concepts.keys()) && self.link_keys() == other.link_keys()
    }
}

impl fmt::Display for ViewGraph {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.display_contents())
    }
}
