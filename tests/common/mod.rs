//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use synoptic_core::{
    error::SynopticError,
    properties::{ConceptId, GraphId},
    source::{EvidencePayload, GraphSource, NeighborPayload, OverviewPayload, RawConcept, RawEdge},
};

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times - subsequent calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

#[derive(Default)]
struct Script {
    overviews: Mutex<BTreeMap<GraphId, OverviewPayload>>,
    neighbors: Mutex<BTreeMap<(GraphId, ConceptId), NeighborPayload>>,
    evidence: Mutex<Option<EvidencePayload>>,
    concepts: Mutex<BTreeMap<ConceptId, RawConcept>>,
    fail_evidence: AtomicBool,
    /// When set, every neighbor fetch sleeps this long before replying. Combined with a paused
    /// tokio clock this makes fetch/switch interleavings deterministic.
    neighbor_delay: Mutex<Option<Duration>>,
    overview_calls: AtomicUsize,
    neighbor_calls: AtomicUsize,
    evidence_calls: AtomicUsize,
    concept_calls: AtomicUsize,
}

/// A scripted [GraphSource]. Fetches answer from the script; anything not scripted fails the
/// way a real backend would. Clones share state, so tests keep a handle to the script after
/// the engine takes ownership of its clone.
#[derive(Clone, Default)]
pub struct ScriptedSource {
    inner: Arc<Script>,
}

#[allow(dead_code)]
impl ScriptedSource {
    pub fn new() -> Self {
        init_logging();
        ScriptedSource::default()
    }

    pub fn with_overview(self, graph: &str, payload: OverviewPayload) -> Self {
        self.inner
            .overviews
            .lock()
            .insert(GraphId::from(graph), payload);
        self
    }

    pub fn with_neighbors(self, graph: &str, concept: &str, payload: NeighborPayload) -> Self {
        self.inner
            .neighbors
            .lock()
            .insert((GraphId::from(graph), ConceptId::from(concept)), payload);
        self
    }

    pub fn with_evidence(self, payload: EvidencePayload) -> Self {
        *self.inner.evidence.lock() = Some(payload);
        self
    }

    pub fn with_concept(self, raw: RawConcept) -> Self {
        self.inner
            .concepts
            .lock()
            .insert(ConceptId::from(raw.id.clone()), raw);
        self
    }

    pub fn with_neighbor_delay(self, delay: Duration) -> Self {
        *self.inner.neighbor_delay.lock() = Some(delay);
        self
    }

    pub fn failing_evidence(self) -> Self {
        self.inner.fail_evidence.store(true, Ordering::SeqCst);
        self
    }

    pub fn overview_calls(&self) -> usize {
        self.inner.overview_calls.load(Ordering::SeqCst)
    }

    pub fn neighbor_calls(&self) -> usize {
        self.inner.neighbor_calls.load(Ordering::SeqCst)
    }

    pub fn evidence_calls(&self) -> usize {
        self.inner.evidence_calls.load(Ordering::SeqCst)
    }

    pub fn concept_calls(&self) -> usize {
        self.inner.concept_calls.load(Ordering::SeqCst)
    }
}

impl GraphSource for ScriptedSource {
    async fn fetch_overview(
        &self,
        graph: &GraphId,
        _node_limit: usize,
        _link_limit: usize,
    ) -> Result<OverviewPayload, SynopticError> {
        self.inner.overview_calls.fetch_add(1, Ordering::SeqCst);
        self.inner
            .overviews
            .lock()
            .get(graph)
            .cloned()
            .ok_or_else(|| SynopticError::Fetch(format!("No scripted overview for {graph}")))
    }

    async fn fetch_neighbors(
        &self,
        graph: &GraphId,
        concept: &ConceptId,
        _depth: u8,
        _limit: usize,
    ) -> Result<NeighborPayload, SynopticError> {
        self.inner.neighbor_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.inner.neighbor_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.inner
            .neighbors
            .lock()
            .get(&(graph.clone(), concept.clone()))
            .cloned()
            .ok_or_else(|| SynopticError::Fetch(format!("No scripted neighbors for {concept}")))
    }

    async fn fetch_evidence_subgraph(
        &self,
        _graph: &GraphId,
        _claim_ids: &[String],
        _node_limit: usize,
        _edge_limit: usize,
    ) -> Result<EvidencePayload, SynopticError> {
        self.inner.evidence_calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.fail_evidence.load(Ordering::SeqCst) {
            return Err(SynopticError::Fetch(
                "Scripted evidence failure".to_string(),
            ));
        }
        Ok(self.inner.evidence.lock().clone().unwrap_or_default())
    }

    async fn fetch_concept(&self, concept: &ConceptId) -> Result<RawConcept, SynopticError> {
        self.inner.concept_calls.fetch_add(1, Ordering::SeqCst);
        self.inner
            .concepts
            .lock()
            .get(concept)
            .cloned()
            .ok_or_else(|| SynopticError::NotFound(format!("No scripted concept {concept}")))
    }
}

/// Build an overview payload from (id, domain) pairs and (source, target, predicate) triples.
#[allow(dead_code)]
pub fn overview(nodes: &[(&str, &str)], links: &[(&str, &str, &str)]) -> OverviewPayload {
    OverviewPayload {
        nodes: raw_concepts(nodes),
        links: raw_edges(links),
        meta: Default::default(),
    }
}

/// Build a neighbor payload from (id, domain) pairs and (source, target, predicate) triples.
#[allow(dead_code)]
pub fn neighborhood(nodes: &[(&str, &str)], edges: &[(&str, &str, &str)]) -> NeighborPayload {
    NeighborPayload {
        nodes: raw_concepts(nodes),
        edges: raw_edges(edges),
    }
}

/// Build an evidence payload from (id, domain) pairs and (source, target, predicate) triples.
#[allow(dead_code)]
pub fn evidence(concepts: &[(&str, &str)], edges: &[(&str, &str, &str)]) -> EvidencePayload {
    EvidencePayload {
        concepts: raw_concepts(concepts),
        edges: raw_edges(edges),
    }
}

fn raw_concepts(nodes: &[(&str, &str)]) -> Vec<RawConcept> {
    nodes
        .iter()
        .map(|(id, domain)| RawConcept::new(*id).with_name(*id).with_domain(*domain))
        .collect()
}

fn raw_edges(edges: &[(&str, &str, &str)]) -> Vec<RawEdge> {
    edges
        .iter()
        .map(|(source, target, predicate)| RawEdge::new(*source, *target, *predicate))
        .collect()
}
