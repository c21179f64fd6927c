//! The pure filtering stage.
//!
//! [filter] composes the domain scope, relationship-status, confidence-threshold and source-type
//! predicates over one store snapshot. It is a deterministic function of its two arguments and
//! holds no state of its own; [FilterState] lives on the engine and changes only through
//! [FilterUpdate] or domain reveals from evidence highlighting.

use enumset::EnumSet;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::{
    properties::{ConceptId, RelationStatus, Relationship, SourceType},
    store::ViewGraph,
};

/// Active filter parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterState {
    /// Statuses whose links are visible.
    pub status: EnumSet<RelationStatus>,
    /// Links below this confidence are hidden.
    pub min_confidence: f32,
    /// Source types whose links are visible. Links with no classifiable source type are exempt.
    pub sources: EnumSet<SourceType>,
    /// Domains currently visible. Empty means no domain restriction at all.
    pub revealed_domains: BTreeSet<String>,
}

impl Default for FilterState {
    fn default() -> Self {
        FilterState {
            status: RelationStatus::Accepted | RelationStatus::Proposed,
            min_confidence: 0.0,
            sources: EnumSet::all(),
            revealed_domains: BTreeSet::new(),
        }
    }
}

impl FilterState {
    /// Whether one relationship passes the link-level predicates (status, confidence, source).
    pub fn admits(&self, link: &Relationship) -> bool {
        if !self.status.contains(link.status) {
            return false;
        }
        if link.confidence < self.min_confidence {
            return false;
        }
        match link.source_type {
            Some(source_type) => self.sources.contains(source_type),
            None => true,
        }
    }

    /// Record a domain as visible. With no domain restriction active every domain is already
    /// visible, so there is nothing to record and the scope stays unrestricted.
    pub fn reveal_domain<D: Into<String>>(&mut self, domain: D) -> bool {
        if self.revealed_domains.is_empty() {
            return false;
        }
        self.revealed_domains.insert(domain.into())
    }
}

/// A partial change to [FilterState]. Absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<EnumSet<RelationStatus>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<EnumSet<SourceType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revealed_domains: Option<BTreeSet<String>>,
}

impl FilterUpdate {
    pub fn with_status(mut self, status: EnumSet<RelationStatus>) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = Some(min_confidence);
        self
    }

    pub fn with_sources(mut self, sources: EnumSet<SourceType>) -> Self {
        self.sources = Some(sources);
        self
    }

    pub fn with_revealed_domains<I, D>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<String>,
    {
        self.revealed_domains = Some(domains.into_iter().map(Into::into).collect());
        self
    }

    /// Fold the update into `state`. Returns whether anything actually changed, so callers can
    /// skip re-derivation when the update was a no-op.
    pub fn apply(self, state: &mut FilterState) -> bool {
        let mut changed = false;
        if let Some(status) = self.status {
            changed |= state.status != status;
            state.status = status;
        }
        if let Some(min_confidence) = self.min_confidence {
            changed |= state.min_confidence != min_confidence;
            state.min_confidence = min_confidence;
        }
        if let Some(sources) = self.sources {
            changed |= state.sources != sources;
            state.sources = sources;
        }
        if let Some(revealed_domains) = self.revealed_domains {
            changed |= state.revealed_domains != revealed_domains;
            state.revealed_domains = revealed_domains;
        }
        changed
    }
}

/// Derive the filtered graph from one snapshot.
///
/// Three steps, in order. First the domain scope: a non-empty revealed set restricts nodes to
/// those domains, dropping every link that loses an endpoint. Second the link predicates from
/// [FilterState::admits]. Third node retention: a node survives if it is an endpoint of a
/// surviving link, or if it had no links at all in the domain-scoped graph. Link filtering never
/// hides a node that was isolated to begin with; only the domain scope can do that.
pub fn filter(snapshot: &ViewGraph, state: &FilterState) -> ViewGraph {
    let scoped = if state.revealed_domains.is_empty() {
        snapshot.clone()
    } else {
        let hidden = snapshot
            .concepts
            .values()
            .filter(|concept| !state.revealed_domains.contains(&concept.domain))
            .map(|concept| concept.id.clone())
            .collect::<BTreeSet<ConceptId>>();
        snapshot.without_nodes(&hidden)
    };

    let degrees = scoped.degrees();
    let surviving = scoped
        .links()
        .filter(|link| state.admits(link))
        .cloned()
        .collect::<Vec<Relationship>>();
    let mut linked = BTreeSet::new();
    for link in &surviving {
        linked.insert(link.source.clone());
        linked.insert(link.target.clone());
    }
    let concepts = scoped
        .concepts
        .iter()
        .filter(|(id, _)| linked.contains(*id) || degrees.get(*id).copied().unwrap_or(0) == 0)
        .map(|(id, concept)| (id.clone(), concept.clone()))
        .collect::<BTreeMap<ConceptId, _>>();
    ViewGraph::from_parts(concepts, surviving)
}
