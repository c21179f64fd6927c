//! Evidence highlighting: projecting a generated answer's supporting facts onto the display
//! graph.
//!
//! This is the one derivation stage that is a state machine rather than a pure function. It may
//! fetch an evidence subgraph, trigger neighbor expansions for absent concepts, and mutate the
//! filter's revealed-domain set so the domain scope cannot hide what it just highlighted. Every
//! failure inside it degrades to a smaller highlight; nothing propagates to callers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::atomic::Ordering;

use crate::{
    engine::ViewEngine,
    error::SynopticError,
    event::{FocusHint, ViewEvent},
    properties::{ConceptId, LinkKey, Position, Relationship},
    source::GraphSource,
};

/// Below this zoom a section highlight widens to fit everything instead of recentering.
pub const RECENTER_ZOOM: f32 = 1.5;

/// One supporting fact attached to a generated answer. Backends and chat layers disagree on
/// field casing, so the aliases absorb both conventions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, alias = "conceptId", alias = "concept")]
    pub concept_id: Option<String>,
    #[serde(default, alias = "resourceId")]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
}

impl EvidenceItem {
    pub fn for_concept<C: Into<String>>(concept_id: C) -> Self {
        EvidenceItem {
            concept_id: Some(concept_id.into()),
            ..EvidenceItem::default()
        }
    }

    fn concept_id(&self) -> Option<&str> {
        self.concept_id.as_deref().filter(|id| !id.is_empty())
    }

    /// Whether this item belongs to a section keyed by any of `wanted`. Sections reference items
    /// by the item's own id, its resource id, or the id under an `ev-` prefix.
    fn matches_section(&self, wanted: &[String]) -> bool {
        let matches = |candidate: &str| wanted.iter().any(|w| w == candidate);
        if let Some(id) = self.id.as_deref() {
            if matches(id) || matches(&format!("ev-{id}")) {
                return true;
            }
        }
        self.resource_id.as_deref().is_some_and(matches)
    }
}

/// Retrieval context a chat answer may carry alongside its evidence items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalMeta {
    #[serde(default, alias = "claimIds", alias = "claims")]
    pub claim_ids: Vec<String>,
}

/// The highlighted node ids and edge keys, plus the answer section they are scoped to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HighlightSet {
    pub nodes: BTreeSet<ConceptId>,
    pub edges: BTreeSet<LinkKey>,
    pub section: Option<String>,
}

impl HighlightSet {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.section = None;
    }
}

/// Which resolution path produced a highlight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HighlightPath {
    /// Nothing to highlight (empty evidence).
    #[default]
    Empty,
    /// The server-side evidence subgraph keyed by claim ids.
    Subgraph,
    /// The local heuristic over evidence concept ids.
    Heuristic,
}

/// Outcome of one highlight application.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HighlightReport {
    pub highlighted_nodes: usize,
    pub highlighted_edges: usize,
    pub via: HighlightPath,
    /// Concept ids referenced by evidence that never materialized, even after expansion.
    pub unresolved: Vec<String>,
    /// Set when the retry loop exhausted its attempts before the store had any nodes.
    pub gave_up_waiting: bool,
}

impl<S: GraphSource> ViewEngine<S> {
    /// The current highlight, pruned to the display graph. Filter or collapse changes after an
    /// application narrow the highlight rather than leaving phantom members.
    pub fn highlight(&self) -> HighlightSet {
        self.view_sync();
        let display = self.display.read();
        let display_keys = display.link_keys();
        let stored = self.highlight.read();
        HighlightSet {
            nodes: stored
                .nodes
                .iter()
                .filter(|id| display.contains(id))
                .cloned()
                .collect(),
            edges: stored
                .edges
                .iter()
                .filter(|key| display_keys.contains(*key))
                .cloned()
                .collect(),
            section: stored.section.clone(),
        }
    }

    /// Reset the highlight. Idempotent; emits only when something was actually cleared.
    pub fn clear_highlight(&self) {
        let mut highlight = self.highlight.write();
        if highlight.is_empty() && highlight.section.is_none() {
            return;
        }
        highlight.clear();
        drop(highlight);
        self.emit(ViewEvent::HighlightCleared);
    }

    /// Project evidence onto the display graph. Empty evidence is a no-op; the claim-id path is
    /// tried first when retrieval metadata carries claim ids, the local heuristic otherwise.
    pub async fn highlight_evidence(
        &self,
        items: &[EvidenceItem],
        meta: Option<&RetrievalMeta>,
    ) -> HighlightReport {
        self.apply_evidence(items, meta, None).await
    }

    /// [ViewEngine::highlight_evidence] for the race where an answer arrives before the first
    /// graph load completes: waits for the store to have nodes, sleeping a fixed delay up to the
    /// configured attempt ceiling, then applies regardless.
    pub async fn highlight_with_retry(
        &self,
        items: &[EvidenceItem],
        meta: Option<&RetrievalMeta>,
    ) -> HighlightReport {
        let mut gave_up_waiting = false;
        let mut attempt = 0;
        while self.store.read().is_empty() {
            if attempt >= self.config().highlight_retry_attempts {
                tracing::warn!(
                    "Graph still empty after {attempt} waits, applying highlight anyway"
                );
                gave_up_waiting = true;
                break;
            }
            attempt += 1;
            tokio::time::sleep(self.config().highlight_retry_delay()).await;
        }
        let mut report = self.apply_evidence(items, meta, None).await;
        report.gave_up_waiting = gave_up_waiting;
        report
    }

    /// Highlight only the evidence belonging to one section of a longer answer, then emit a
    /// focus hint: recenter on the highlight centroid when zoomed in past [RECENTER_ZOOM],
    /// zoom-to-fit otherwise.
    pub async fn highlight_for_section(
        &self,
        section_id: &str,
        section_evidence_ids: &[String],
        all_evidence: &[EvidenceItem],
        meta: Option<&RetrievalMeta>,
    ) -> HighlightReport {
        let scoped = all_evidence
            .iter()
            .filter(|item| item.matches_section(section_evidence_ids))
            .cloned()
            .collect::<Vec<EvidenceItem>>();
        tracing::debug!(
            "Section {section_id}: {} of {} evidence items in scope",
            scoped.len(),
            all_evidence.len()
        );
        self.highlight.write().section = Some(section_id.to_string());
        let report = self
            .apply_evidence(&scoped, meta, Some(section_id.to_string()))
            .await;
        self.emit(ViewEvent::Focus(self.section_focus()));
        report
    }

    async fn apply_evidence(
        &self,
        items: &[EvidenceItem],
        meta: Option<&RetrievalMeta>,
        section: Option<String>,
    ) -> HighlightReport {
        if items.is_empty() {
            return HighlightReport::default();
        }
        if let Some(meta) = meta.filter(|meta| !meta.claim_ids.is_empty()) {
            match self.highlight_from_subgraph(meta, section.clone()).await {
                Ok(Some(report)) => return report,
                Ok(None) => {
                    tracing::debug!("Evidence subgraph was empty, falling back to the heuristic");
                }
                Err(err) => {
                    tracing::warn!(
                        "Evidence subgraph fetch failed, falling back to the heuristic: {err}"
                    );
                }
            }
        }
        self.highlight_heuristic(items, section).await
    }

    /// The server-side path: one evidence-subgraph fetch keyed by claim ids. `Ok(None)` means
    /// the fetch succeeded but resolved no concepts, which callers treat as a miss.
    async fn highlight_from_subgraph(
        &self,
        meta: &RetrievalMeta,
        section: Option<String>,
    ) -> Result<Option<HighlightReport>, SynopticError> {
        let Some(graph) = self.active_graph.read().clone() else {
            return Err(SynopticError::NotFound(
                "No active graph to highlight against".to_string(),
            ));
        };
        let payload = self
            .source()
            .fetch_evidence_subgraph(
                &graph,
                &meta.claim_ids,
                self.config().evidence_node_limit,
                self.config().evidence_edge_limit,
            )
            .await?;
        let (concepts, links) = payload.normalize();
        if concepts.is_empty() {
            return Ok(None);
        }

        let delta = self.store.write().merge(concepts.clone(), links.clone());
        if delta.changed() {
            self.view_dirty.store(true, Ordering::SeqCst);
        }
        // Reveal the domains of returned nodes so an active domain scope cannot hide them. This
        // is the one place highlighting writes filter state.
        {
            let mut filter = self.filter.write();
            let mut revealed = false;
            for concept in &concepts {
                revealed |= filter.reveal_domain(concept.domain.clone());
            }
            drop(filter);
            if revealed {
                self.view_dirty.store(true, Ordering::SeqCst);
                self.emit(ViewEvent::FilterChanged);
            }
        }

        self.view_sync();
        let (nodes, edges) = {
            let display = self.display.read();
            let display_keys = display.link_keys();
            let nodes = concepts
                .iter()
                .map(|concept| concept.id.clone())
                .filter(|id| display.contains(id))
                .collect::<BTreeSet<ConceptId>>();
            let edges = links
                .iter()
                .map(Relationship::key)
                .filter(|key| display_keys.contains(key))
                .collect::<BTreeSet<LinkKey>>();
            (nodes, edges)
        };
        let report = HighlightReport {
            highlighted_nodes: nodes.len(),
            highlighted_edges: edges.len(),
            via: HighlightPath::Subgraph,
            unresolved: Vec::new(),
            gave_up_waiting: false,
        };
        let mut highlight = self.highlight.write();
        highlight.nodes = nodes;
        highlight.edges = edges;
        highlight.section = section;
        drop(highlight);
        self.emit(ViewEvent::HighlightChanged(
            report.highlighted_nodes,
            report.highlighted_edges,
        ));
        Ok(Some(report))
    }

    /// The local path: resolve evidence concept ids against the store, expanding absent ones
    /// one at a time to bound request fan-out, then highlight every resolved node and every
    /// display link touching one.
    async fn highlight_heuristic(
        &self,
        items: &[EvidenceItem],
        section: Option<String>,
    ) -> HighlightReport {
        let mut wanted = Vec::new();
        let mut seen = BTreeSet::new();
        for item in items {
            if let Some(concept_id) = item.concept_id() {
                if seen.insert(concept_id) {
                    wanted.push(ConceptId::from(concept_id));
                }
            }
        }

        let mut resolved = Vec::new();
        let mut unresolved = Vec::new();
        for id in wanted {
            if !self.store.read().contains(&id) {
                self.expand(&id).await;
            }
            if self.store.read().contains(&id) {
                resolved.push(id);
            } else {
                tracing::debug!("Evidence concept {id} never materialized, dropping it");
                unresolved.push(id.to_string());
            }
        }

        self.view_sync();
        let (nodes, edges) = {
            let display = self.display.read();
            let nodes = resolved
                .into_iter()
                .filter(|id| display.contains(id))
                .collect::<BTreeSet<ConceptId>>();
            let edges = display
                .links()
                .filter(|link| nodes.contains(&link.source) || nodes.contains(&link.target))
                .map(Relationship::key)
                .collect::<BTreeSet<LinkKey>>();
            (nodes, edges)
        };
        let report = HighlightReport {
            highlighted_nodes: nodes.len(),
            highlighted_edges: edges.len(),
            via: HighlightPath::Heuristic,
            unresolved,
            gave_up_waiting: false,
        };
        let mut highlight = self.highlight.write();
        highlight.nodes = nodes;
        highlight.edges = edges;
        highlight.section = section;
        drop(highlight);
        self.emit(ViewEvent::HighlightChanged(
            report.highlighted_nodes,
            report.highlighted_edges,
        ));
        report
    }

    /// Where a section highlight should steer the viewport. Recentering needs a zoomed-in view
    /// and at least one positioned highlighted node; everything else fits-all.
    fn section_focus(&self) -> FocusHint {
        if self.zoom() < RECENTER_ZOOM {
            return FocusHint::FitAll;
        }
        let display = self.display.read();
        let highlight = self.highlight.read();
        let mut x_sum = 0.0;
        let mut y_sum = 0.0;
        let mut count = 0usize;
        for id in &highlight.nodes {
            if let Some(position) = display.get(id).and_then(|concept| concept.position) {
                x_sum += position.x;
                y_sum += position.y;
                count += 1;
            }
        }
        if count == 0 {
            return FocusHint::FitAll;
        }
        FocusHint::Recenter(Position::new(
            x_sum / count as f32,
            y_sum / count as f32,
        ))
    }
}
