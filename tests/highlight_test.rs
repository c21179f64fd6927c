//! Evidence highlighting integration tests
//!
//! These cover both resolution paths (the claim-id evidence subgraph and the local heuristic),
//! the fallbacks between them, domain reveals, section scoping with focus hints, and the
//! retry loop for answers that arrive before the first graph load.

mod common;

use common::{evidence, neighborhood, overview, ScriptedSource};
use enumset::EnumSet;
use std::sync::Arc;
use std::time::Duration;
use test_log::test;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

use synoptic_core::{
    config::EngineConfig,
    engine::ViewEngine,
    event::{FocusHint, ViewEvent},
    filter::FilterUpdate,
    highlight::{EvidenceItem, HighlightPath, RetrievalMeta},
    properties::{ConceptId, GraphId, LinkKey, Position, RelationStatus},
};

fn drain(rx: &mut UnboundedReceiver<ViewEvent>) -> Vec<ViewEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn claims(ids: &[&str]) -> RetrievalMeta {
    RetrievalMeta {
        claim_ids: ids.iter().map(|id| id.to_string()).collect(),
    }
}

#[test(tokio::test)]
async fn test_subgraph_path_merges_and_highlights() -> Result<(), Box<dyn std::error::Error>> {
    let source = ScriptedSource::new()
        .with_overview(
            "alpha",
            overview(
                &[("a1", "technology"), ("a2", "technology")],
                &[("a1", "a2", "supplies")],
            ),
        )
        .with_evidence(evidence(&[("e1", "energy")], &[("a1", "e1", "cites")]));
    let (tx, mut rx) = unbounded_channel();
    let engine = ViewEngine::new(source.clone(), EngineConfig::default(), Some(tx));
    engine.load_graph(&GraphId::from("alpha")).await?;
    drain(&mut rx);

    let report = engine
        .highlight_evidence(&[EvidenceItem::for_concept("e1")], Some(&claims(&["c-1"])))
        .await;

    assert_eq!(report.via, HighlightPath::Subgraph);
    assert_eq!(report.highlighted_nodes, 1);
    assert_eq!(report.highlighted_edges, 1);
    assert_eq!(source.evidence_calls(), 1);

    // The subgraph was merged into the store, not just highlighted
    let view = engine.display_graph();
    assert!(view.contains(&ConceptId::from("e1")));
    drop(view);
    let highlight = engine.highlight();
    assert!(highlight.nodes.contains(&ConceptId::from("e1")));
    assert!(highlight.edges.contains(&LinkKey::new(
        ConceptId::from("a1"),
        ConceptId::from("e1"),
        "cites".to_string(),
    )));
    // An unrestricted domain scope has nothing to reveal, so no FilterChanged fires
    assert!(matches!(
        drain(&mut rx).as_slice(),
        [ViewEvent::HighlightChanged(1, 1)]
    ));
    Ok(())
}

#[test(tokio::test)]
async fn test_subgraph_reveals_domains_hidden_by_scope() -> Result<(), Box<dyn std::error::Error>>
{
    let source = ScriptedSource::new()
        .with_overview(
            "alpha",
            overview(
                &[("a1", "technology"), ("a2", "technology")],
                &[("a1", "a2", "supplies")],
            ),
        )
        .with_evidence(evidence(&[("e1", "energy")], &[("a1", "e1", "cites")]));
    let engine = ViewEngine::new(source, EngineConfig::default(), None);
    engine.load_graph(&GraphId::from("alpha")).await?;
    engine.set_filter(FilterUpdate::default().with_revealed_domains(["technology"]));

    let report = engine
        .highlight_evidence(&[EvidenceItem::for_concept("e1")], Some(&claims(&["c-1"])))
        .await;

    assert_eq!(report.via, HighlightPath::Subgraph);
    assert_eq!(report.highlighted_nodes, 1);
    let state = engine.filter_state();
    assert!(
        state.revealed_domains.contains("energy"),
        "the scope must widen so it cannot hide what was just highlighted"
    );
    assert!(state.revealed_domains.contains("technology"));
    assert!(engine.display_graph().contains(&ConceptId::from("e1")));
    Ok(())
}

#[test(tokio::test)]
async fn test_empty_subgraph_falls_back_to_heuristic() -> Result<(), Box<dyn std::error::Error>> {
    // No scripted evidence: the fetch succeeds but resolves nothing
    let source = ScriptedSource::new().with_overview(
        "alpha",
        overview(
            &[("a1", "technology"), ("a2", "technology")],
            &[("a1", "a2", "supplies")],
        ),
    );
    let engine = ViewEngine::new(source.clone(), EngineConfig::default(), None);
    engine.load_graph(&GraphId::from("alpha")).await?;

    let report = engine
        .highlight_evidence(&[EvidenceItem::for_concept("a1")], Some(&claims(&["c-1"])))
        .await;

    assert_eq!(source.evidence_calls(), 1);
    assert_eq!(report.via, HighlightPath::Heuristic);
    assert_eq!(report.highlighted_nodes, 1);
    assert_eq!(report.highlighted_edges, 1, "display links touching a1");
    assert_eq!(source.neighbor_calls(), 0, "a1 was already materialized");
    Ok(())
}

#[test(tokio::test)]
async fn test_failed_subgraph_falls_back_to_heuristic() -> Result<(), Box<dyn std::error::Error>> {
    let source = ScriptedSource::new()
        .with_overview("alpha", overview(&[("a1", "technology")], &[]))
        .failing_evidence();
    let engine = ViewEngine::new(source.clone(), EngineConfig::default(), None);
    engine.load_graph(&GraphId::from("alpha")).await?;

    let report = engine
        .highlight_evidence(&[EvidenceItem::for_concept("a1")], Some(&claims(&["c-1"])))
        .await;

    assert_eq!(source.evidence_calls(), 1);
    assert_eq!(report.via, HighlightPath::Heuristic);
    assert_eq!(report.highlighted_nodes, 1);
    assert!(report.unresolved.is_empty());
    Ok(())
}

#[test(tokio::test)]
async fn test_heuristic_expands_absent_concepts() -> Result<(), Box<dyn std::error::Error>> {
    let source = ScriptedSource::new()
        .with_overview("alpha", overview(&[("a1", "technology")], &[]))
        .with_neighbors("alpha", "a9", neighborhood(&[("a9", "technology")], &[]));
    let engine = ViewEngine::new(source.clone(), EngineConfig::default(), None);
    engine.load_graph(&GraphId::from("alpha")).await?;

    let items = [
        EvidenceItem::for_concept("a9"),
        EvidenceItem::for_concept("ghost"),
    ];
    let report = engine.highlight_evidence(&items, None).await;

    assert_eq!(report.via, HighlightPath::Heuristic);
    assert_eq!(report.highlighted_nodes, 1);
    assert_eq!(report.unresolved, vec!["ghost".to_string()]);
    assert_eq!(
        source.neighbor_calls(),
        2,
        "one expansion per absent concept, ghost's failing"
    );
    assert!(engine.display_graph().contains(&ConceptId::from("a9")));

    // a9 is materialized now, so highlighting it again stays local
    let again = engine
        .highlight_evidence(&[EvidenceItem::for_concept("a9")], None)
        .await;
    assert_eq!(again.highlighted_nodes, 1);
    assert_eq!(source.neighbor_calls(), 2);
    Ok(())
}

#[test(tokio::test)]
async fn test_highlight_narrows_with_the_display_graph() -> Result<(), Box<dyn std::error::Error>>
{
    let source = ScriptedSource::new().with_overview(
        "alpha",
        overview(
            &[("a1", "technology"), ("a2", "technology")],
            &[("a1", "a2", "supplies")],
        ),
    );
    let engine = ViewEngine::new(source, EngineConfig::default(), None);
    engine.load_graph(&GraphId::from("alpha")).await?;
    let report = engine
        .highlight_evidence(&[EvidenceItem::for_concept("a1")], None)
        .await;
    assert_eq!(report.highlighted_nodes, 1);
    assert_eq!(report.highlighted_edges, 1);

    // Hiding every link empties the display of both endpoints; the read-side prune follows
    engine.set_filter(
        FilterUpdate::default().with_status(EnumSet::only(RelationStatus::Rejected)),
    );
    assert!(engine.highlight().is_empty());

    // Restoring the filter restores the highlight, nothing was forgotten
    engine.set_filter(FilterUpdate::default().with_status(
        RelationStatus::Accepted | RelationStatus::Proposed,
    ));
    let restored = engine.highlight();
    assert!(restored.nodes.contains(&ConceptId::from("a1")));
    assert_eq!(restored.edges.len(), 1);
    Ok(())
}

#[test(tokio::test)]
async fn test_section_highlight_scopes_items_and_emits_focus(
) -> Result<(), Box<dyn std::error::Error>> {
    let source = ScriptedSource::new().with_overview(
        "alpha",
        overview(
            &[("a1", "technology"), ("a2", "technology"), ("a3", "technology")],
            &[("a1", "a2", "supplies")],
        ),
    );
    let (tx, mut rx) = unbounded_channel();
    let engine = ViewEngine::new(source, EngineConfig::default(), Some(tx));
    engine.load_graph(&GraphId::from("alpha")).await?;
    drain(&mut rx);

    let all_evidence = [
        EvidenceItem {
            id: Some("7".to_string()),
            concept_id: Some("a1".to_string()),
            ..EvidenceItem::default()
        },
        EvidenceItem {
            id: Some("8".to_string()),
            concept_id: Some("a2".to_string()),
            ..EvidenceItem::default()
        },
        EvidenceItem {
            resource_id: Some("res-9".to_string()),
            concept_id: Some("a3".to_string()),
            ..EvidenceItem::default()
        },
    ];

    // Section wants item 7 (by ev- prefix) and the res-9 resource; a2 stays unlit
    let report = engine
        .highlight_for_section(
            "sec-1",
            &["ev-7".to_string(), "res-9".to_string()],
            &all_evidence,
            None,
        )
        .await;
    assert_eq!(report.highlighted_nodes, 2);
    let highlight = engine.highlight();
    assert_eq!(highlight.section.as_deref(), Some("sec-1"));
    assert!(highlight.nodes.contains(&ConceptId::from("a1")));
    assert!(highlight.nodes.contains(&ConceptId::from("a3")));
    assert!(!highlight.nodes.contains(&ConceptId::from("a2")));

    // At default zoom the focus hint widens to fit
    let events = drain(&mut rx);
    assert!(matches!(
        events.last(),
        Some(ViewEvent::Focus(FocusHint::FitAll))
    ));

    // Zoomed in past the recenter threshold with settled positions, it recenters instead
    engine.set_zoom(2.0);
    engine.set_position(&ConceptId::from("a1"), 100.0, 50.0);
    engine.set_position(&ConceptId::from("a3"), 300.0, 150.0);
    engine
        .highlight_for_section(
            "sec-1",
            &["ev-7".to_string(), "res-9".to_string()],
            &all_evidence,
            None,
        )
        .await;
    let events = drain(&mut rx);
    assert!(matches!(
        events.last(),
        Some(ViewEvent::Focus(FocusHint::Recenter(Position { x, y }))) if *x == 200.0 && *y == 100.0
    ));
    Ok(())
}

#[test(tokio::test)]
async fn test_section_marker_set_even_when_nothing_matches(
) -> Result<(), Box<dyn std::error::Error>> {
    let source = ScriptedSource::new().with_overview("alpha", overview(&[("a1", "technology")], &[]));
    let engine = ViewEngine::new(source, EngineConfig::default(), None);
    engine.load_graph(&GraphId::from("alpha")).await?;

    let report = engine
        .highlight_for_section(
            "empty-sec",
            &["ev-404".to_string()],
            &[EvidenceItem::for_concept("a1")],
            None,
        )
        .await;
    assert_eq!(report.via, HighlightPath::Empty);
    assert_eq!(report.highlighted_nodes, 0);
    assert_eq!(
        engine.highlight().section.as_deref(),
        Some("empty-sec"),
        "the section marker is recorded before evidence is applied"
    );
    Ok(())
}

#[test(tokio::test)]
async fn test_highlight_with_retry_applies_immediately_when_loaded(
) -> Result<(), Box<dyn std::error::Error>> {
    let source = ScriptedSource::new().with_overview("alpha", overview(&[("a1", "technology")], &[]));
    let engine = ViewEngine::new(source, EngineConfig::default(), None);
    engine.load_graph(&GraphId::from("alpha")).await?;

    let report = engine
        .highlight_with_retry(&[EvidenceItem::for_concept("a1")], None)
        .await;
    assert!(!report.gave_up_waiting);
    assert_eq!(report.highlighted_nodes, 1);
    Ok(())
}

#[test(tokio::test(start_paused = true))]
async fn test_highlight_with_retry_waits_for_first_load() -> Result<(), Box<dyn std::error::Error>>
{
    let source = ScriptedSource::new().with_overview("alpha", overview(&[("a1", "technology")], &[]));
    let engine = Arc::new(ViewEngine::new(source, EngineConfig::default(), None));

    // The answer arrives first; the graph follows 250ms later
    let loader = tokio::spawn({
        let engine = engine.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            engine.load_graph(&GraphId::from("alpha")).await
        }
    });
    let report = engine
        .highlight_with_retry(&[EvidenceItem::for_concept("a1")], None)
        .await;
    loader.await??;

    assert!(!report.gave_up_waiting);
    assert_eq!(report.via, HighlightPath::Heuristic);
    assert_eq!(report.highlighted_nodes, 1);
    Ok(())
}

#[test(tokio::test(start_paused = true))]
async fn test_highlight_with_retry_gives_up_without_a_graph(
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = Arc::new(ViewEngine::new(
        ScriptedSource::new(),
        EngineConfig::default(),
        None,
    ));

    let report = engine
        .highlight_with_retry(&[EvidenceItem::for_concept("x")], None)
        .await;

    assert!(report.gave_up_waiting);
    assert_eq!(report.highlighted_nodes, 0);
    assert_eq!(report.unresolved, vec!["x".to_string()]);
    assert_eq!(report.via, HighlightPath::Heuristic);
    Ok(())
}

#[test(tokio::test)]
async fn test_clear_highlight_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
    let source = ScriptedSource::new().with_overview("alpha", overview(&[("a1", "technology")], &[]));
    let (tx, mut rx) = unbounded_channel();
    let engine = ViewEngine::new(source, EngineConfig::default(), Some(tx));
    engine.load_graph(&GraphId::from("alpha")).await?;
    engine
        .highlight_evidence(&[EvidenceItem::for_concept("a1")], None)
        .await;
    drain(&mut rx);

    engine.clear_highlight();
    assert!(engine.highlight().is_empty());
    assert!(matches!(
        drain(&mut rx).as_slice(),
        [ViewEvent::HighlightCleared]
    ));

    engine.clear_highlight();
    assert!(
        drain(&mut rx).is_empty(),
        "clearing an empty highlight emits nothing"
    );
    Ok(())
}
