//! Shared test utilities for derivation testing

use crate::{
    properties::{Concept, RelationStatus, Relationship, SourceType},
    store::GraphStore,
};

/// Initialize logging for tests
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// Helper function to create a concept in a given domain
pub fn create_concept(id: &str, domain: &str) -> Concept {
    Concept::new(id, id).with_domain(domain)
}

/// Helper function to create a fully specified link for testing
pub fn create_link(
    source: &str,
    target: &str,
    predicate: &str,
    status: RelationStatus,
    confidence: f32,
    source_type: SourceType,
) -> Relationship {
    Relationship::new(source, target, predicate)
        .with_status(status)
        .with_confidence(confidence)
        .with_source_type(source_type)
}

/// Create a test store spanning two domains:
///
/// - technology: apex -> bolt (accepted, 0.9, Sec), apex -> core (proposed, 0.6, News)
/// - energy: grid -> apex (accepted, 0.4, Ir)
/// - technology: drift, isolated
///
/// `apex` bridges the domains; `drift` touches no link at all.
pub fn create_test_store() -> GraphStore {
    init_logging();

    let mut store = GraphStore::new();
    store.replace_all(
        vec![
            create_concept("apex", "technology"),
            create_concept("bolt", "technology"),
            create_concept("core", "technology"),
            create_concept("grid", "energy"),
            create_concept("drift", "technology"),
        ],
        vec![
            create_link(
                "apex",
                "bolt",
                "supplies",
                RelationStatus::Accepted,
                0.9,
                SourceType::Sec,
            ),
            create_link(
                "apex",
                "core",
                "competes_with",
                RelationStatus::Proposed,
                0.6,
                SourceType::News,
            ),
            create_link(
                "grid",
                "apex",
                "powers",
                RelationStatus::Accepted,
                0.4,
                SourceType::Ir,
            ),
        ],
    );
    store
}
