//! The view engine: one instance per active session, owning the store and every derived view.
//!
//! All entry points take `&self`; interior state is guarded by [parking_lot] locks that are
//! never held across an await point. Derived views (filtered graph, display graph) recompute
//! lazily: mutations set `view_dirty` and the next read runs [ViewEngine::view_sync]. The
//! store is the only shared mutable resource; filtering, collapsing and clustering are pure
//! re-derivations over its snapshot.

use parking_lot::{ArcRwLockReadGuard, Mutex, RawRwLock, RwLock};
use regex::RegexBuilder;
use std::collections::BTreeSet;
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};
use tokio::sync::mpsc::UnboundedSender;

use crate::{
    cache::NeighborCache,
    cluster::{self, DomainBubble},
    collapse::{self, CollapseGroups},
    config::EngineConfig,
    error::SynopticError,
    event::ViewEvent,
    filter::{self, FilterState, FilterUpdate},
    highlight::HighlightSet,
    properties::{Concept, ConceptId, GraphId},
    source::{GraphSource, NeighborPayload, RawConcept, RawEdge},
    store::{GraphStore, MergeDelta, ViewGraph},
};

type SharedLock<T> = Arc<RwLock<T>>;

/// Expansions always fetch one hop; deeper neighborhoods come from expanding the frontier.
const EXPAND_DEPTH: u8 = 1;

/// What one [ViewEngine::expand] call did. Expansion failures are part of this outcome, not an
/// error type: they are non-fatal and the engine has already logged them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandOutcome {
    /// Served from the cache without touching the network.
    CacheHit { changed: bool },
    Fetched { changed: bool },
    /// An earlier expansion for the same concept still holds the in-flight slot.
    InFlight,
    /// The active graph changed while the fetch was out; the result was discarded.
    Stale,
    /// Fetch failure or timeout. The store is unchanged and the loading marker cleared.
    Failed,
    /// Nothing to do: virtual concept or no active graph.
    Skipped,
}

impl ExpandOutcome {
    /// Whether the call changed the store.
    pub fn changed(&self) -> bool {
        matches!(
            self,
            ExpandOutcome::CacheHit { changed: true } | ExpandOutcome::Fetched { changed: true }
        )
    }
}

pub struct ViewEngine<S: GraphSource> {
    source: S,
    config: EngineConfig,
    pub(crate) store: RwLock<GraphStore>,
    cache: Mutex<NeighborCache>,
    /// In-flight expansion markers, keyed by the generation that issued them. A fetch removes
    /// exactly the pair it inserted, so one resolving stale after a graph switch cannot clear
    /// the marker of a replacement expansion for the same concept.
    expanding: Mutex<BTreeSet<(u64, ConceptId)>>,
    pub(crate) active_graph: RwLock<Option<GraphId>>,
    /// Bumped on every successful graph switch. Expansions capture it before fetching and
    /// discard their result on mismatch, so a payload can never cross into another graph's
    /// store or cache.
    generation: AtomicU64,
    pub(crate) filter: RwLock<FilterState>,
    groups: RwLock<CollapseGroups>,
    pub(crate) highlight: RwLock<HighlightSet>,
    filtered: SharedLock<ViewGraph>,
    pub(crate) display: SharedLock<ViewGraph>,
    pub(crate) view_dirty: AtomicBool,
    zoom: RwLock<f32>,
    tx: Option<UnboundedSender<ViewEvent>>,
}

impl<S: GraphSource> ViewEngine<S> {
    pub fn new(source: S, config: EngineConfig, tx: Option<UnboundedSender<ViewEvent>>) -> Self {
        if tx.is_none() {
            tracing::debug!("Engine initialized without an event channel, events will be dropped");
        }
        ViewEngine {
            source,
            config,
            store: RwLock::new(GraphStore::new()),
            cache: Mutex::new(NeighborCache::new()),
            expanding: Mutex::new(BTreeSet::new()),
            active_graph: RwLock::new(None),
            generation: AtomicU64::new(0),
            filter: RwLock::new(FilterState::default()),
            groups: RwLock::new(CollapseGroups::new()),
            highlight: RwLock::new(HighlightSet::default()),
            filtered: Arc::new(RwLock::new(ViewGraph::default())),
            display: Arc::new(RwLock::new(ViewGraph::default())),
            view_dirty: AtomicBool::new(false),
            zoom: RwLock::new(1.0),
            tx,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn source(&self) -> &S {
        &self.source
    }

    pub fn active_graph(&self) -> Option<GraphId> {
        self.active_graph.read().clone()
    }

    pub fn filter_state(&self) -> FilterState {
        self.filter.read().clone()
    }

    pub fn contains_concept(&self, id: &ConceptId) -> bool {
        self.store.read().contains(id)
    }

    pub fn is_expanding(&self, id: &ConceptId) -> bool {
        let generation = self.generation.load(Ordering::SeqCst);
        self.expanding.lock().contains(&(generation, id.clone()))
    }

    /// Concepts with an expansion currently in flight, for loading indicators.
    pub fn expanding(&self) -> BTreeSet<ConceptId> {
        let generation = self.generation.load(Ordering::SeqCst);
        self.expanding
            .lock()
            .iter()
            .filter(|(issued, _)| *issued == generation)
            .map(|(_, id)| id.clone())
            .collect()
    }

    pub(crate) fn emit(&self, event: ViewEvent) {
        if let Some(tx) = &self.tx {
            if let Err(err) = tx.send(event) {
                tracing::debug!("Dropping view event, receiver is gone: {err}");
            }
        }
    }

    /// Recompute the filtered and display graphs if anything upstream changed since the last
    /// read. Locks are taken one at a time and never across an await.
    pub(crate) fn view_sync(&self) {
        if !self.view_dirty.load(Ordering::SeqCst) {
            return;
        }
        let snapshot = self.store.read().snapshot();
        let state = self.filter.read().clone();
        let filtered = filter::filter(&snapshot, &state);
        let display = collapse::collapse(&filtered, &self.groups.read());
        *self.filtered.write() = filtered;
        *self.display.write() = display;
        self.view_dirty.store(false, Ordering::SeqCst);
    }

    /// The node and link set the rendering surface should draw.
    pub fn display_graph(&self) -> ArcRwLockReadGuard<RawRwLock, ViewGraph> {
        self.view_sync();
        self.display.read_arc()
    }

    /// The filtered graph before collapsing, which collapse-id computation runs against.
    pub fn filtered_graph(&self) -> ArcRwLockReadGuard<RawRwLock, ViewGraph> {
        self.view_sync();
        self.filtered.read_arc()
    }

    /// Switch to a graph, replacing all materialized state on success.
    ///
    /// The overview is fetched before anything is touched, so a failed switch leaves the prior
    /// graph fully intact and returns the one error value this engine surfaces to users.
    #[tracing::instrument(skip(self))]
    pub async fn load_graph(&self, graph: &GraphId) -> Result<(), SynopticError> {
        let overview = self
            .source
            .fetch_overview(
                graph,
                self.config.overview_node_limit,
                self.config.overview_link_limit,
            )
            .await
            .map_err(|err| err.into_graph_switch(graph))?;

        if overview.meta.clipped(overview.nodes.len(), overview.links.len()) {
            tracing::info!(
                "Overview for {graph} clipped to {} nodes / {} links (of {:?}/{:?})",
                overview.nodes.len(),
                overview.links.len(),
                overview.meta.total_nodes,
                overview.meta.total_links,
            );
        }
        let nodes: Vec<Concept> = overview.nodes.iter().map(RawConcept::normalize).collect();
        let links = overview.links.iter().map(RawEdge::normalize).collect();

        // Ordering matters for in-flight expansions racing this switch: the active graph id is
        // published before the generation bump, so an expansion reading the new generation also
        // reads the new graph id, and one reading the old generation discards its result.
        *self.active_graph.write() = Some(graph.clone());
        self.generation.fetch_add(1, Ordering::SeqCst);
        let node_count = nodes.len();
        let link_count;
        {
            let mut store = self.store.write();
            store.replace_all(nodes, links);
            link_count = store.link_count();
        }
        self.cache.lock().clear();
        self.expanding.lock().clear();
        self.groups.write().clear();
        self.highlight.write().clear();
        // Status, confidence and source filters persist across graphs; the domain scope is
        // meaningless outside the graph it was revealed for.
        self.filter.write().revealed_domains.clear();
        self.view_dirty.store(true, Ordering::SeqCst);
        self.emit(ViewEvent::OverviewLoaded(
            graph.clone(),
            node_count,
            link_count,
        ));
        tracing::info!("Loaded graph {graph}: {node_count} nodes, {link_count} links");
        Ok(())
    }

    /// Fetch and merge the one-hop neighborhood of a concept.
    ///
    /// Never returns an error: failures and timeouts are logged, the loading marker is cleared,
    /// and the store stays as it was. A second call for the same concept while the first is in
    /// flight does not issue a duplicate fetch.
    #[tracing::instrument(skip(self))]
    pub async fn expand(&self, id: &ConceptId) -> ExpandOutcome {
        let generation = self.generation.load(Ordering::SeqCst);
        let Some(graph) = self.active_graph.read().clone() else {
            tracing::debug!("Ignoring expand for {id}: no active graph");
            return ExpandOutcome::Skipped;
        };
        if self.store.read().is_virtual(id) {
            tracing::debug!("Ignoring expand for virtual concept {id}");
            return ExpandOutcome::Skipped;
        }

        if let Some(payload) = self.cache.lock().get(&graph, id, EXPAND_DEPTH) {
            tracing::debug!("Expansion cache hit for {id}");
            let delta = self.merge_payload(id, &payload);
            return ExpandOutcome::CacheHit {
                changed: delta.changed(),
            };
        }

        if !self.expanding.lock().insert((generation, id.clone())) {
            tracing::debug!("Expansion already in flight for {id}");
            return ExpandOutcome::InFlight;
        }
        let fetched = tokio::time::timeout(
            self.config.expand_timeout(),
            self.source
                .fetch_neighbors(&graph, id, EXPAND_DEPTH, self.config.neighbor_limit),
        )
        .await;
        self.expanding.lock().remove(&(generation, id.clone()));

        let payload = match fetched {
            Ok(Ok(payload)) => payload,
            Ok(Err(err)) => {
                tracing::warn!("Neighbor expansion for {id} failed: {err}");
                self.emit(ViewEvent::ExpansionFailed(id.clone()));
                return ExpandOutcome::Failed;
            }
            Err(_) => {
                tracing::warn!(
                    "Neighbor expansion for {id} timed out after {:?}",
                    self.config.expand_timeout()
                );
                self.emit(ViewEvent::ExpansionFailed(id.clone()));
                return ExpandOutcome::Failed;
            }
        };
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!("Discarding stale expansion for {id}, the active graph changed");
            return ExpandOutcome::Stale;
        }
        self.cache
            .lock()
            .insert(graph, id.clone(), EXPAND_DEPTH, payload.clone());
        let delta = self.merge_payload(id, &payload);
        ExpandOutcome::Fetched {
            changed: delta.changed(),
        }
    }

    fn merge_payload(&self, origin: &ConceptId, payload: &NeighborPayload) -> MergeDelta {
        let (nodes, links) = payload.normalize();
        let delta = self.store.write().merge(nodes, links);
        if delta.changed() {
            self.view_dirty.store(true, Ordering::SeqCst);
            self.emit(ViewEvent::NeighborsMerged(
                origin.clone(),
                delta.nodes_added,
                delta.links_added,
            ));
        }
        delta
    }

    /// Fold a partial update into the filter state. Returns whether anything changed.
    pub fn set_filter(&self, update: FilterUpdate) -> bool {
        let changed = update.apply(&mut self.filter.write());
        if changed {
            self.view_dirty.store(true, Ordering::SeqCst);
            self.emit(ViewEvent::FilterChanged);
        }
        changed
    }

    /// Collapse the subtree under `root`, hiding everything within `depth` hops of it in the
    /// filtered graph. Returns how many ids are now hidden beneath this root.
    pub fn collapse(&self, root: &ConceptId, depth: usize) -> usize {
        self.view_sync();
        let hidden = collapse::compute_collapse_ids(root, depth, &self.filtered.read());
        let count = hidden.len();
        let mut groups = self.groups.write();
        if groups.get(root) == Some(&hidden) {
            return count;
        }
        groups.insert(root.clone(), hidden);
        drop(groups);
        self.view_dirty.store(true, Ordering::SeqCst);
        self.emit(ViewEvent::CollapseChanged(root.clone(), count));
        count
    }

    /// Release a collapsed root. Returns false if the root had no collapse group.
    pub fn expand_collapsed(&self, root: &ConceptId) -> bool {
        if self.groups.write().remove(root).is_none() {
            return false;
        }
        self.view_dirty.store(true, Ordering::SeqCst);
        self.emit(ViewEvent::CollapseCleared(root.clone()));
        true
    }

    /// Case-insensitive search over materialized concepts by name, id and tags. A query that is
    /// not a valid pattern is searched literally.
    pub fn find_concepts(&self, query: &str) -> Vec<Concept> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }
        let pattern = RegexBuilder::new(query)
            .case_insensitive(true)
            .build()
            .or_else(|_| {
                RegexBuilder::new(&regex::escape(query))
                    .case_insensitive(true)
                    .build()
            });
        let Ok(pattern) = pattern else {
            return Vec::new();
        };
        let store = self.store.read();
        let mut matches = store
            .all_concepts()
            .filter(|concept| {
                pattern.is_match(&concept.name)
                    || pattern.is_match(concept.id.as_str())
                    || concept.tags.iter().any(|tag| pattern.is_match(tag))
            })
            .cloned()
            .collect::<Vec<Concept>>();
        matches.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        matches
    }

    /// Look up a concept, fetching and merging it if the store does not hold it yet.
    pub async fn ensure_concept(&self, id: &ConceptId) -> Result<Concept, SynopticError> {
        if let Some(existing) = self.store.read().get(id).cloned() {
            return Ok(existing);
        }
        let concept = self.source.fetch_concept(id).await?.normalize();
        let delta = self.store.write().merge(vec![concept.clone()], vec![]);
        if delta.changed() {
            self.view_dirty.store(true, Ordering::SeqCst);
        }
        Ok(concept)
    }

    /// Register a client-only concept ahead of backend persistence. Returns its temporary id.
    pub fn add_virtual(&self, concept: Concept) -> ConceptId {
        let id = self.store.write().add_virtual(concept);
        self.view_dirty.store(true, Ordering::SeqCst);
        self.emit(ViewEvent::VirtualAdded(id.clone()));
        id
    }

    /// Swap a virtual concept for the persisted one the backend confirmed.
    pub fn promote_virtual(
        &self,
        temp_id: &ConceptId,
        persisted: Concept,
    ) -> Result<ConceptId, SynopticError> {
        let promoted = self.store.write().promote_virtual(temp_id, persisted)?;
        self.view_dirty.store(true, Ordering::SeqCst);
        self.emit(ViewEvent::VirtualPromoted(temp_id.clone(), promoted.clone()));
        Ok(promoted)
    }

    /// Record a settled layout position reported by the rendering surface.
    pub fn set_position(&self, id: &ConceptId, x: f32, y: f32) -> bool {
        let updated = self.store.write().set_position(id, x, y);
        if updated {
            self.view_dirty.store(true, Ordering::SeqCst);
        }
        updated
    }

    /// Batch form of [ViewEngine::set_position]. Returns how many ids were known.
    pub fn set_positions<I>(&self, positions: I) -> usize
    where
        I: IntoIterator<Item = (ConceptId, f32, f32)>,
    {
        let mut store = self.store.write();
        let mut updated = 0;
        for (id, x, y) in positions {
            if store.set_position(&id, x, y) {
                updated += 1;
            }
        }
        drop(store);
        if updated > 0 {
            self.view_dirty.store(true, Ordering::SeqCst);
        }
        updated
    }

    pub fn set_zoom(&self, zoom: f32) {
        *self.zoom.write() = zoom.max(0.0);
    }

    pub fn zoom(&self) -> f32 {
        *self.zoom.read()
    }

    /// Per-domain centroid and radius summaries over the current display graph.
    pub fn domain_bubbles(&self) -> Vec<DomainBubble> {
        self.view_sync();
        cluster::recompute(&self.display.read())
    }
}
