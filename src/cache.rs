//! Memoization of neighbor expansions.
//!
//! The cache stores the raw [NeighborPayload] exactly as fetched, keyed by graph id, concept id
//! and requested depth. Replays re-run normalization and merge, so a hit is indistinguishable
//! from the original fetch apart from skipping the network. Entries are written once; the whole
//! cache resets on graph switch, so entries never mix data from different active graphs.

use std::collections::BTreeMap;

use crate::{
    properties::{ConceptId, GraphId},
    source::NeighborPayload,
};

#[derive(Debug, Default)]
pub struct NeighborCache {
    entries: BTreeMap<(GraphId, ConceptId, u8), NeighborPayload>,
}

impl NeighborCache {
    pub fn new() -> Self {
        NeighborCache::default()
    }

    pub fn get(&self, graph: &GraphId, id: &ConceptId, depth: u8) -> Option<NeighborPayload> {
        self.entries
            .get(&(graph.clone(), id.clone(), depth))
            .cloned()
    }

    pub fn contains(&self, graph: &GraphId, id: &ConceptId, depth: u8) -> bool {
        self.entries
            .contains_key(&(graph.clone(), id.clone(), depth))
    }

    /// First write wins. A concurrent fetch that lost the race does not clobber the entry its
    /// peer already recorded.
    pub fn insert(&mut self, graph: GraphId, id: ConceptId, depth: u8, payload: NeighborPayload) {
        self.entries.entry((graph, id, depth)).or_insert(payload);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
