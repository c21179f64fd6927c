//! # synoptic-core
//!
//! A Rust library that derives interactive knowledge-graph views from backend graph data.
//!
//! The name "synoptic" comes from "synopsis" - seeing the whole together.
//!
//! ## Overview
//!
//! synoptic-core sits between a graph backend and a rendering surface. It materializes graph
//! slices fetched through a [`source::GraphSource`], accumulates them in a client-side store,
//! and derives what the surface should draw: a filtered, collapsed, highlighted **view graph**.
//! The surface stays dumb (draw nodes, draw links, report positions); every decision about
//! *which* nodes and links appear lives here.
//!
//! ### Key Features
//!
//! - **Incremental materialization**: Overview first, one-hop neighbor expansions on demand
//! - **Expansion memoization**: Fetched neighborhoods replay from cache, keyed per graph
//! - **Pure view derivation**: Filtering and collapsing re-derive from the store, never mutate it
//! - **Evidence highlighting**: Claim-backed subgraph fetch with a heuristic local fallback
//! - **Graph-switch safety**: Generation guards discard in-flight results that cross a switch
//! - **Virtual concepts**: Client-only nodes that later swap for their persisted counterparts
//! - **Event streaming**: View changes announce themselves over an optional channel
//!
//! ## Architecture
//!
//! The library is organized around several key components:
//!
//! - **[`engine`]**: The per-session [`engine::ViewEngine`] owning all state and entry points
//! - **[`store`]**: Accumulated concepts and links ([`store::GraphStore`], [`store::ViewGraph`])
//! - **[`source`]**: The [`source::GraphSource`] trait and raw payload normalization
//! - **[`filter`]**: Status, confidence, source and domain predicates over the store
//! - **[`collapse`]**: Subtree hiding via breadth-first membership computation
//! - **[`highlight`]**: Evidence-driven node and edge emphasis
//! - **[`cluster`]**: Domain bubble summaries for the zoomed-out view
//! - **[`properties`]**: Concept and relationship records, identifiers, enums
//!
//! ## Quick Start
//!
//! Implement [`source::GraphSource`] over your transport, then drive the engine:
//!
//! ```rust,no_run
//! use synoptic_core::{
//!     config::EngineConfig,
//!     engine::ViewEngine,
//!     error::SynopticError,
//!     properties::{ConceptId, GraphId},
//!     source::{EvidencePayload, GraphSource, NeighborPayload, OverviewPayload, RawConcept},
//! };
//!
//! struct Backend;
//!
//! impl GraphSource for Backend {
//!     async fn fetch_overview(
//!         &self,
//!         _graph: &GraphId,
//!         _node_limit: usize,
//!         _link_limit: usize,
//!     ) -> Result<OverviewPayload, SynopticError> {
//!         // Issue the real overview request here.
//!         Ok(OverviewPayload::default())
//!     }
//!
//!     async fn fetch_neighbors(
//!         &self,
//!         _graph: &GraphId,
//!         _concept: &ConceptId,
//!         _depth: u8,
//!         _limit: usize,
//!     ) -> Result<NeighborPayload, SynopticError> {
//!         Ok(NeighborPayload::default())
//!     }
//!
//!     async fn fetch_evidence_subgraph(
//!         &self,
//!         _graph: &GraphId,
//!         _claim_ids: &[String],
//!         _node_limit: usize,
//!         _edge_limit: usize,
//!     ) -> Result<EvidencePayload, SynopticError> {
//!         Ok(EvidencePayload::default())
//!     }
//!
//!     async fn fetch_concept(&self, concept: &ConceptId) -> Result<RawConcept, SynopticError> {
//!         Ok(RawConcept::new(concept.as_str()))
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), SynopticError> {
//!     let engine = ViewEngine::new(Backend, EngineConfig::default(), None);
//!
//!     // Load a graph's overview slice
//!     engine.load_graph(&GraphId::from("demo")).await?;
//!
//!     // Expand one concept's neighborhood (memoized after the first fetch)
//!     engine.expand(&ConceptId::from("acme_corp")).await;
//!
//!     // Read the derived view
//!     let view = engine.display_graph();
//!     for (id, concept) in view.concepts.iter() {
//!         println!("{}: {}", id, concept.name);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Derivation Pipeline
//!
//! Every view the engine hands out is derived from the store through a fixed pipeline:
//!
//! 1. **Snapshot**: One consistent copy of the accumulated concepts and links
//! 2. **Filter**: Domain scope, then link predicates, then node retention
//! 3. **Collapse**: Subtract the members of every collapsed subtree
//! 4. **Highlight / Cluster**: Emphasis sets and domain bubbles computed over the result
//!
//! Mutations only mark the derived views dirty; the next read recomputes them. Two reads with
//! no mutation in between see identical views.
//!
//! ### Staleness and the Neighbor Cache
//!
//! Expansion responses are memoized per `(graph, concept, depth)` so revisiting a concept never
//! refetches. Responses that arrive after the active graph changed are discarded wholesale: the
//! engine captures a generation counter before fetching and checks it after, and a graph switch
//! clears the cache along with everything else materialized.
//!
//! ### Evidence Highlighting
//!
//! Retrieval results carry evidence items and optionally the claim ids behind them. With claim
//! ids the engine asks the backend for the exact supporting subgraph and merges it; without
//! them (or when that fetch fails) it falls back to expanding the mentioned concepts locally.
//! Either way the highlighted sets are intersected with the display graph, so highlights never
//! reference nodes the surface is not drawing.
//!
//! ## Module Guide
//!
//! Start with [`engine::ViewEngine`] for the session lifecycle, then [`source::GraphSource`]
//! for wiring up a backend. See [`properties`] for understanding concept and relationship
//! records.

pub mod cache;
pub mod cluster;
pub mod collapse;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod filter;
pub mod highlight;
pub mod properties;
pub mod source;
pub mod store;
#[cfg(test)]
mod tests;

pub use error::*;
