//! GraphStore module: the materialized slice of the backend graph.
//!
//! # Module Organization
//!
//! - [`graph`]: Graph data structures (LinkGraph, ViewGraph)
//! - [`base`]: Main GraphStore implementation with merge discipline and virtual concepts
//!
//! # Public API
//!
//! The module re-exports all public types:
//!
//! ```rust
//! use synoptic_core::store::{GraphStore, LinkGraph, MergeDelta, ViewGraph};
//! ```

mod base;
mod graph;


pub use base::{GraphStore, MergeDelta};
pub use graph::{LinkGraph, ViewGraph};
