//! The collaborator boundary: the [GraphSource] trait the embedding application implements over
//! its transport of choice, the loosely-typed payloads those fetches return, and the
//! normalization that turns them into the strict records of [crate::properties]. All
//! shape-sniffing lives here; the rest of the engine only ever sees normalized data.

use serde::{Deserialize, Serialize};

use crate::{
    error::SynopticError,
    properties::{Concept, ConceptId, GraphId, RelationStatus, Relationship, SourceType},
};

pub(crate) mod lenient {
    //! Backends disagree on casing for enum-ish fields. Unknown values decay to None instead of
    //! failing the whole payload; the caller's defaults then apply.

    use super::{RelationStatus, SourceType};
    use serde::{Deserialize, Deserializer};

    pub(crate) fn status<'de, D: Deserializer<'de>>(
        de: D,
    ) -> Result<Option<RelationStatus>, D::Error> {
        let raw = Option::<String>::deserialize(de)?;
        Ok(raw.and_then(|s| match s.to_uppercase().as_str() {
            "ACCEPTED" => Some(RelationStatus::Accepted),
            "PROPOSED" => Some(RelationStatus::Proposed),
            "REJECTED" => Some(RelationStatus::Rejected),
            _ => None,
        }))
    }

    pub(crate) fn source_type<'de, D: Deserializer<'de>>(
        de: D,
    ) -> Result<Option<SourceType>, D::Error> {
        let raw = Option::<String>::deserialize(de)?;
        Ok(raw.and_then(|s| match s.to_uppercase().as_str() {
            "SEC" => Some(SourceType::Sec),
            "IR" => Some(SourceType::Ir),
            "NEWS" => Some(SourceType::News),
            _ => None,
        }))
    }
}

/// A concept as backends send it. Everything past the id is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawConcept {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "category")]
    pub domain: Option<String>,
    #[serde(default, rename = "type", alias = "concept_type", alias = "kind")]
    pub kind: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl RawConcept {
    pub fn new<I: Into<String>>(id: I) -> Self {
        RawConcept {
            id: id.into(),
            name: None,
            domain: None,
            kind: None,
            tags: None,
        }
    }

    pub fn with_name<N: Into<String>>(mut self, name: N) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_domain<D: Into<String>>(mut self, domain: D) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Produce the strict record. A blank or missing name falls back to the id text; a blank or
    /// missing domain falls back to [crate::properties::DEFAULT_DOMAIN].
    pub fn normalize(&self) -> Concept {
        let mut concept = Concept::new(self.id.as_str(), self.id.as_str());
        if let Some(name) = self.name.as_ref().filter(|n| !n.is_empty()) {
            concept.name = name.clone();
        }
        if let Some(domain) = self.domain.as_ref().filter(|d| !d.is_empty()) {
            concept.domain = domain.clone();
        }
        if let Some(kind) = self.kind.as_ref() {
            concept.kind = kind.clone();
        }
        if let Some(tags) = self.tags.as_ref() {
            concept.tags = tags.clone();
        }
        concept
    }
}

impl From<&Concept> for RawConcept {
    fn from(concept: &Concept) -> Self {
        RawConcept {
            id: concept.id.to_string(),
            name: Some(concept.name.clone()),
            domain: Some(concept.domain.clone()),
            kind: Some(concept.kind.clone()),
            tags: Some(concept.tags.clone()),
        }
    }
}

/// An edge as backends send it: endpoint ids under several historical key names, status and
/// source type as free-case strings, confidence possibly nested under `properties`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEdge {
    #[serde(alias = "source", alias = "from")]
    pub source_id: String,
    #[serde(alias = "target", alias = "to")]
    pub target_id: String,
    #[serde(default, alias = "relation", alias = "label")]
    pub predicate: Option<String>,
    #[serde(default, deserialize_with = "lenient::status")]
    pub status: Option<RelationStatus>,
    #[serde(default, alias = "score")]
    pub confidence: Option<f32>,
    #[serde(default, deserialize_with = "lenient::source_type")]
    pub source_type: Option<SourceType>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub rationale: Option<String>,
    #[serde(default)]
    pub provenance_id: Option<String>,
    /// Grab-bag object some backends attach. Only probed for a nested `confidence`.
    #[serde(default)]
    pub properties: Option<serde_json::Value>,
}

impl RawEdge {
    pub fn new<S: Into<String>, T: Into<String>, P: Into<String>>(
        source_id: S,
        target_id: T,
        predicate: P,
    ) -> Self {
        RawEdge {
            source_id: source_id.into(),
            target_id: target_id.into(),
            predicate: Some(predicate.into()),
            status: None,
            confidence: None,
            source_type: None,
            method: None,
            rationale: None,
            provenance_id: None,
            properties: None,
        }
    }

    pub fn with_status(mut self, status: RelationStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_provenance<P: Into<String>>(mut self, provenance_id: P) -> Self {
        self.provenance_id = Some(provenance_id.into());
        self
    }

    fn nested_confidence(&self) -> Option<f32> {
        self.properties
            .as_ref()
            .and_then(|props| props.get("confidence"))
            .and_then(serde_json::Value::as_f64)
            .map(|value| value as f32)
    }

    /// Produce the strict record. Missing status means Accepted, missing confidence means 1.0
    /// (after probing `properties.confidence`), out-of-range confidence clamps, and a missing
    /// source type is inferred from the provenance id.
    pub fn normalize(&self) -> Relationship {
        let confidence = self
            .confidence
            .or_else(|| self.nested_confidence())
            .unwrap_or(1.0)
            .clamp(0.0, 1.0);
        let source_type = self.source_type.or_else(|| {
            self.provenance_id
                .as_deref()
                .and_then(SourceType::from_provenance)
        });
        Relationship {
            source: ConceptId::from(self.source_id.as_str()),
            target: ConceptId::from(self.target_id.as_str()),
            predicate: self.predicate.clone().unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            confidence,
            source_type,
            method: self.method.clone(),
            rationale: self.rationale.clone(),
        }
    }
}

/// Totals the overview fetch reports alongside its (possibly clipped) node and link lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverviewMeta {
    #[serde(default)]
    pub total_nodes: Option<usize>,
    #[serde(default)]
    pub total_links: Option<usize>,
    #[serde(default)]
    pub truncated: bool,
}

impl OverviewMeta {
    /// Whether the backend clipped the overview to the requested limits.
    pub fn clipped(&self, returned_nodes: usize, returned_links: usize) -> bool {
        self.truncated
            || self.total_nodes.is_some_and(|total| total > returned_nodes)
            || self.total_links.is_some_and(|total| total > returned_links)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverviewPayload {
    #[serde(default)]
    pub nodes: Vec<RawConcept>,
    #[serde(default, alias = "edges")]
    pub links: Vec<RawEdge>,
    #[serde(default)]
    pub meta: OverviewMeta,
}

/// The raw result of one neighbor expansion. This exact shape is what
/// [crate::cache::NeighborCache] memoizes; normalization re-runs on every merge so a cached
/// replay is indistinguishable from the original fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NeighborPayload {
    #[serde(default)]
    pub nodes: Vec<RawConcept>,
    #[serde(default, alias = "links")]
    pub edges: Vec<RawEdge>,
}

impl NeighborPayload {
    pub fn normalize(&self) -> (Vec<Concept>, Vec<Relationship>) {
        (
            self.nodes.iter().map(RawConcept::normalize).collect(),
            self.edges.iter().map(RawEdge::normalize).collect(),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidencePayload {
    #[serde(default, alias = "nodes")]
    pub concepts: Vec<RawConcept>,
    #[serde(default, alias = "links")]
    pub edges: Vec<RawEdge>,
}

impl EvidencePayload {
    pub fn normalize(&self) -> (Vec<Concept>, Vec<Relationship>) {
        (
            self.concepts.iter().map(RawConcept::normalize).collect(),
            self.edges.iter().map(RawEdge::normalize).collect(),
        )
    }
}

/// The four fetches the engine consumes, implemented by the embedding application over any
/// transport. Implementations return plain `async` blocks; the engine never boxes them and every
/// future must be `Send` so engine entry points stay `Send` themselves.
pub trait GraphSource: Sync {
    /// Fetch the initial overview slice of a graph, clipped to the given limits.
    fn fetch_overview(
        &self,
        graph: &GraphId,
        node_limit: usize,
        link_limit: usize,
    ) -> impl std::future::Future<Output = Result<OverviewPayload, SynopticError>> + Send;

    /// Fetch the bounded neighborhood of one concept.
    fn fetch_neighbors(
        &self,
        graph: &GraphId,
        concept: &ConceptId,
        depth: u8,
        limit: usize,
    ) -> impl std::future::Future<Output = Result<NeighborPayload, SynopticError>> + Send;

    /// Fetch the subgraph of concepts and edges supporting a set of claims.
    fn fetch_evidence_subgraph(
        &self,
        graph: &GraphId,
        claim_ids: &[String],
        node_limit: usize,
        edge_limit: usize,
    ) -> impl std::future::Future<Output = Result<EvidencePayload, SynopticError>> + Send;

    /// Fetch a single concept by id.
    fn fetch_concept(
        &self,
        concept: &ConceptId,
    ) -> impl std::future::Future<Output = Result<RawConcept, SynopticError>> + Send;
}
