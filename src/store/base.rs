use petgraph::graph::NodeIndex;
use std::collections::BTreeMap;

use crate::{
    error::SynopticError,
    properties::{Concept, ConceptId, Relationship},
    store::{LinkGraph, ViewGraph},
};

/// What one merge changed. [MergeDelta::changed] false tells consumers the store is exactly what
/// it was, so derived views can be reused without recomputation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeDelta {
    pub nodes_added: usize,
    pub links_added: usize,
    /// Links rejected because an endpoint was not materialized. Dropped links are not stored and
    /// not retried; callers wanting them must expand the missing endpoint first.
    pub links_dropped: usize,
}

impl MergeDelta {
    pub fn changed(&self) -> bool {
        self.nodes_added > 0 || self.links_added > 0
    }
}

/// The single source of truth for one engine instance: every concept and link materialized so
/// far, plus the client-only virtual concepts awaiting backend persistence.
///
/// All mutation goes through [GraphStore::replace_all], [GraphStore::merge] and the virtual-node
/// operations, which together maintain one invariant: no stored link has an endpoint outside
/// `concepts ∪ virtuals`. Everything downstream (filtering, collapsing, highlighting,
/// clustering) reads immutable [ViewGraph] snapshots.
#[derive(Debug, Default)]
pub struct GraphStore {
    concepts: BTreeMap<ConceptId, Concept>,
    links: LinkGraph,
    id_to_index: BTreeMap<ConceptId, NodeIndex>,
    virtuals: BTreeMap<ConceptId, Concept>,
}

impl GraphStore {
    pub fn new() -> Self {
        GraphStore::default()
    }

    pub fn node_count(&self) -> usize {
        self.concepts.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.link_count()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty() && self.virtuals.is_empty()
    }

    /// Membership across materialized and virtual concepts.
    pub fn contains(&self, id: &ConceptId) -> bool {
        self.concepts.contains_key(id) || self.virtuals.contains_key(id)
    }

    pub fn get(&self, id: &ConceptId) -> Option<&Concept> {
        self.concepts.get(id).or_else(|| self.virtuals.get(id))
    }

    pub fn is_virtual(&self, id: &ConceptId) -> bool {
        self.virtuals.contains_key(id)
    }

    /// Materialized and virtual concepts, virtuals last.
    pub fn all_concepts(&self) -> impl Iterator<Item = &Concept> + '_ {
        self.concepts.values().chain(self.virtuals.values())
    }

    pub fn links(&self) -> impl Iterator<Item = &Relationship> + '_ {
        self.links.links()
    }

    /// Reset to exactly this node and link set. Used on initial load and graph switch, so the
    /// virtual set (which belonged to the outgoing graph) resets too.
    pub fn replace_all(&mut self, nodes: Vec<Concept>, links: Vec<Relationship>) {
        self.concepts = BTreeMap::new();
        self.links = LinkGraph::default();
        self.id_to_index = BTreeMap::new();
        self.virtuals = BTreeMap::new();
        let delta = self.merge(nodes, links);
        if delta.links_dropped > 0 {
            tracing::debug!(
                "Dropped {} dangling links while replacing the store",
                delta.links_dropped
            );
        }
    }

    /// Set-union by identity key. Existing concepts keep their payload (and their settled
    /// positions); existing link keys keep their first arrival. Links with an unmaterialized
    /// endpoint are dropped, never stored.
    pub fn merge(&mut self, nodes: Vec<Concept>, links: Vec<Relationship>) -> MergeDelta {
        let mut delta = MergeDelta::default();
        for node in nodes {
            if let std::collections::btree_map::Entry::Vacant(entry) =
                self.concepts.entry(node.id.clone())
            {
                entry.insert(node);
                delta.nodes_added += 1;
            }
        }
        for link in links {
            if !self.contains(&link.source) || !self.contains(&link.target) {
                tracing::debug!("Dropping dangling link {}", link.key());
                delta.links_dropped += 1;
                continue;
            }
            if self.links.insert_indexed(link, &mut self.id_to_index) {
                delta.links_added += 1;
            }
        }
        delta
    }

    /// Register a client-only concept. The temporary marker is enforced here so a mislabeled
    /// input cannot smuggle a virtual into the materialized set.
    pub fn add_virtual(&mut self, mut concept: Concept) -> ConceptId {
        concept.temporary = true;
        let id = concept.id.clone();
        self.virtuals.insert(id.clone(), concept);
        id
    }

    /// Swap a virtual for the persisted concept the backend confirmed, remapping any link
    /// endpoint from the temporary id to the persisted one.
    pub fn promote_virtual(
        &mut self,
        temp_id: &ConceptId,
        mut persisted: Concept,
    ) -> Result<ConceptId, SynopticError> {
        let virtual_concept = self.virtuals.remove(temp_id).ok_or_else(|| {
            SynopticError::NotFound(format!("No virtual concept with id {temp_id}"))
        })?;
        persisted.temporary = false;
        // A settled position on the virtual survives promotion unless the backend sent one.
        if persisted.position.is_none() {
            persisted.position = virtual_concept.position;
        }
        let persisted_id = persisted.id.clone();
        self.concepts.insert(persisted_id.clone(), persisted);

        if persisted_id != *temp_id {
            let remapped = self
                .links
                .links()
                .map(|link| {
                    let mut link = link.clone();
                    if link.source == *temp_id {
                        link.source = persisted_id.clone();
                    }
                    if link.target == *temp_id {
                        link.target = persisted_id.clone();
                    }
                    link
                })
                .collect::<Vec<Relationship>>();
            self.links = LinkGraph::from_links(remapped);
            self.id_to_index = self.links.index();
        }
        Ok(persisted_id)
    }

    /// Update the settled position of a concept. Returns false for unknown ids.
    pub fn set_position(&mut self, id: &ConceptId, x: f32, y: f32) -> bool {
        if let Some(concept) = self
            .concepts
            .get_mut(id)
            .or_else(|| self.virtuals.get_mut(id))
        {
            concept.position = Some(crate::properties::Position::new(x, y));
            true
        } else {
            false
        }
    }

    /// One consistent slice of everything materialized, virtuals included, for the pure
    /// derivation stages.
    pub fn snapshot(&self) -> ViewGraph {
        let mut concepts = self.concepts.clone();
        for (id, concept) in &self.virtuals {
            concepts.insert(id.clone(), concept.clone());
        }
        ViewGraph {
            concepts,
            relations: self.links.clone(),
        }
    }

    /// Ids referenced by stored links but missing from `concepts ∪ virtuals`. Always empty while
    /// the merge discipline holds; exercised by tests and debug assertions.
    pub fn find_orphaned_links(&self) -> Vec<ConceptId> {
        let mut missing = Vec::new();
        for link in self.links.links() {
            if !self.contains(&link.source) {
                missing.push(link.source.clone());
            }
            if !self.contains(&link.target) {
                missing.push(link.target.clone());
            }
        }
        missing.sort();
        missing.dedup();
        missing
    }
}
