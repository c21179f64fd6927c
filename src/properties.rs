pub use enumset::EnumSet;
/// [crate::properties] contains the basic building blocks for assembling and manipulating
/// [crate::store::ViewGraph]s and the derived structures layered on top of them.
use enumset::*;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use url::Url;
pub use uuid::Uuid;

/// Domain assigned to concepts whose payload carried none.
pub const DEFAULT_DOMAIN: &str = "general";

/// Prefix for client-generated ids of not-yet-persisted concepts.
pub const VIRTUAL_ID_PREFIX: &str = "virtual-";

fn default_domain() -> String {
    DEFAULT_DOMAIN.to_string()
}

fn default_confidence() -> f32 {
    1.0
}

/// Concept ID
///
/// An opaque identifier issued by the backend, globally unique within a graph. The engine never
/// parses or interprets these beyond equality and ordering, with one exception: ids minted by
/// [ConceptId::temporary] carry [VIRTUAL_ID_PREFIX] so a not-yet-persisted concept remains
/// recognizable in logs even after its `temporary` marker is consumed by promotion.
#[derive(Clone, Debug, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(transparent)]
pub struct ConceptId(String);

impl ConceptId {
    /// Mint an id for a client-only concept that has no backend identity yet. Use
    /// [crate::store::GraphStore::promote_virtual] to swap it for the persisted id once the
    /// backend confirms creation.
    pub fn temporary() -> Self {
        ConceptId(format!("{VIRTUAL_ID_PREFIX}{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ConceptId {
    fn from(id: String) -> Self {
        ConceptId(id)
    }
}

impl From<&str> for ConceptId {
    fn from(id: &str) -> Self {
        ConceptId(id.to_string())
    }
}

impl AsRef<str> for ConceptId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for ConceptId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&ConceptId> for String {
    fn from(val: &ConceptId) -> Self {
        val.0.clone()
    }
}

impl From<ConceptId> for String {
    fn from(val: ConceptId) -> Self {
        val.0
    }
}

/// Graph ID
///
/// Identifies one backend graph (a branch of the knowledge base). The active graph id is part of
/// every [crate::cache::NeighborCache] key so cached neighborhoods can never leak across graphs.
#[derive(Clone, Debug, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(transparent)]
pub struct GraphId(String);

impl From<String> for GraphId {
    fn from(id: String) -> Self {
        GraphId(id)
    }
}

impl From<&str> for GraphId {
    fn from(id: &str) -> Self {
        GraphId(id.to_string())
    }
}

impl AsRef<str> for GraphId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for GraphId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A settled 2D position reported back by the rendering surface. The engine treats positions as
/// opaque layout state: it stores them, feeds them to [crate::cluster::recompute], and averages
/// them for focus hints, but never computes layout itself.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Position { x, y }
    }
}

/// Review status of a [Relationship]. Backends send these as upper-case strings; absent status
/// means the relationship was accepted at ingest.
#[derive(Debug, Default, Serialize, Deserialize, PartialOrd, Ord, Hash, EnumSetType)]
#[enumset(repr = "u32", serialize_repr = "list")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationStatus {
    #[default]
    Accepted,
    Proposed,
    Rejected,
}

impl Display for RelationStatus {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Provenance class of the material backing a relationship. Unknown provenance is modeled as
/// `Option::<SourceType>::None` so the source-type filter can skip links it cannot classify.
#[derive(Debug, Serialize, Deserialize, PartialOrd, Ord, Hash, EnumSetType)]
#[enumset(repr = "u32", serialize_repr = "list")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceType {
    /// Regulatory filings (EDGAR and friends).
    Sec,
    /// Investor-relations material.
    Ir,
    /// News coverage.
    News,
}

impl SourceType {
    /// Classify a provenance identifier. Identifiers that parse as URLs are classified by host
    /// and path first, everything else by substring: "SEC"/"edgar" is a filing, "IR"/"investor"
    /// is investor-relations material, "NEWS"/"news" is coverage. Returns None when no class
    /// matches; such links are exempt from source-type filtering.
    pub fn from_provenance(provenance: &str) -> Option<SourceType> {
        if let Ok(url) = Url::parse(provenance) {
            let host = url.host_str().unwrap_or_default();
            let path = url.path().to_lowercase();
            if host == "sec.gov"
                || host.ends_with(".sec.gov")
                || host.contains("edgar")
                || path.contains("edgar")
            {
                return Some(SourceType::Sec);
            }
            if host.starts_with("ir.") || path.contains("investor") {
                return Some(SourceType::Ir);
            }
            if host.contains("news") || path.contains("news") {
                return Some(SourceType::News);
            }
        }
        let lowered = provenance.to_lowercase();
        if provenance.contains("SEC") || lowered.contains("edgar") {
            Some(SourceType::Sec)
        } else if provenance.contains("IR") || lowered.contains("investor") {
            Some(SourceType::Ir)
        } else if lowered.contains("news") {
            Some(SourceType::News)
        } else {
            None
        }
    }
}

impl Display for SourceType {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A graph node representing a unit of knowledge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    pub id: ConceptId,
    pub name: String,
    /// Free-text category used for clustering and domain filtering.
    #[serde(default = "default_domain")]
    pub domain: String,
    /// The concept's type label ("company", "metric", ...). Opaque to the engine.
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Set once the rendering surface settles layout, absent before that.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// Marks a client-only concept awaiting backend persistence. Temporary concepts are held in
    /// the store's virtual set and never expanded or cache-keyed.
    #[serde(default)]
    pub temporary: bool,
}

impl Concept {
    pub fn new<I: Into<ConceptId>, N: Into<String>>(id: I, name: N) -> Self {
        Concept {
            id: id.into(),
            name: name.into(),
            domain: default_domain(),
            kind: String::default(),
            tags: Vec::default(),
            position: None,
            temporary: false,
        }
    }

    /// Build a virtual concept with a [ConceptId::temporary] id.
    pub fn temporary<N: Into<String>, D: Into<String>, K: Into<String>>(
        name: N,
        domain: D,
        kind: K,
    ) -> Self {
        Concept {
            id: ConceptId::temporary(),
            name: name.into(),
            domain: domain.into(),
            kind: kind.into(),
            tags: Vec::default(),
            position: None,
            temporary: true,
        }
    }

    pub fn with_domain<D: Into<String>>(mut self, domain: D) -> Self {
        self.domain = domain.into();
        self
    }

    pub fn with_kind<K: Into<String>>(mut self, kind: K) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = Some(Position::new(x, y));
        self
    }
}

impl Display for Concept {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Identity triple of a [Relationship]. Two links are the same link exactly when their keys are
/// equal; merge drops later arrivals for an occupied key.
#[derive(Clone, Debug, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct LinkKey {
    pub source: ConceptId,
    pub target: ConceptId,
    pub predicate: String,
}

impl LinkKey {
    pub fn new(source: ConceptId, target: ConceptId, predicate: String) -> Self {
        LinkKey {
            source,
            target,
            predicate,
        }
    }
}

impl Display for LinkKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}-{}", self.source, self.target, self.predicate)
    }
}

/// A directed, typed edge between two concepts.
///
/// Both endpoints must resolve to materialized concepts of the graph the relationship lives in.
/// [crate::store::GraphStore] drops dangling links at merge time, so a Relationship observable
/// through any derived view has satisfied that check.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(rename = "source_id")]
    pub source: ConceptId,
    #[serde(rename = "target_id")]
    pub target: ConceptId,
    pub predicate: String,
    #[serde(default)]
    pub status: RelationStatus,
    #[serde(default = "default_confidence")]
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<SourceType>,
    /// Extraction method reported by the backend ("llm", "curated", ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl Relationship {
    pub fn new<S: Into<ConceptId>, T: Into<ConceptId>, P: Into<String>>(
        source: S,
        target: T,
        predicate: P,
    ) -> Self {
        Relationship {
            source: source.into(),
            target: target.into(),
            predicate: predicate.into(),
            status: RelationStatus::default(),
            confidence: default_confidence(),
            source_type: None,
            method: None,
            rationale: None,
        }
    }

    pub fn with_status(mut self, status: RelationStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_source_type(mut self, source_type: SourceType) -> Self {
        self.source_type = Some(source_type);
        self
    }

    pub fn key(&self) -> LinkKey {
        LinkKey::new(
            self.source.clone(),
            self.target.clone(),
            self.predicate.clone(),
        )
    }
}

impl Display for Relationship {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} -[{} {} {:.2}]-> {}",
            self.source, self.predicate, self.status, self.confidence, self.target
        )
    }
}
