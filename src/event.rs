use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::properties::{ConceptId, GraphId, Position};

/// Rendering hint emitted after a section highlight settles. Advisory only: headless embeddings
/// can drop these without affecting any derived view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FocusHint {
    /// Keep the current zoom, recenter on this point.
    Recenter(Position),
    /// Widen out until the whole display graph fits.
    FitAll,
}

impl Display for FocusHint {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            FocusHint::Recenter(_) => write!(f, "Recenter"),
            FocusHint::FitAll => write!(f, "FitAll"),
        }
    }
}

/// Notifications the engine pushes to its (optional) event channel so the rendering surface can
/// re-derive reactively instead of polling [crate::engine::ViewEngine::display_graph].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ViewEvent {
    /// Graph id, node count and link count of the freshly loaded overview
    OverviewLoaded(GraphId, usize, usize),
    /// Expanded concept, nodes added, links added by the merge
    NeighborsMerged(ConceptId, usize, usize),
    /// Concept whose neighbor expansion failed or timed out
    ExpansionFailed(ConceptId),
    /// Filter parameters changed, derived views recomputed on next read
    FilterChanged,
    /// Collapse root, count of ids hidden beneath it
    CollapseChanged(ConceptId, usize),
    /// Collapse root whose hidden group was released
    CollapseCleared(ConceptId),
    /// Highlighted node count, highlighted link count
    HighlightChanged(usize, usize),
    HighlightCleared,
    /// A virtual concept was registered
    VirtualAdded(ConceptId),
    /// Temporary id, persisted id
    VirtualPromoted(ConceptId, ConceptId),
    Focus(FocusHint),
}

impl Display for ViewEvent {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            ViewEvent::OverviewLoaded(_, _, _) => write!(f, "OverviewLoaded"),
            ViewEvent::NeighborsMerged(_, _, _) => write!(f, "NeighborsMerged"),
            ViewEvent::ExpansionFailed(_) => write!(f, "ExpansionFailed"),
            ViewEvent::FilterChanged => write!(f, "FilterChanged"),
            ViewEvent::CollapseChanged(_, _) => write!(f, "CollapseChanged"),
            ViewEvent::CollapseCleared(_) => write!(f, "CollapseCleared"),
            ViewEvent::HighlightChanged(_, _) => write!(f, "HighlightChanged"),
            ViewEvent::HighlightCleared => write!(f, "HighlightCleared"),
            ViewEvent::VirtualAdded(_) => write!(f, "VirtualAdded"),
            ViewEvent::VirtualPromoted(_, _) => write!(f, "VirtualPromoted"),
            ViewEvent::Focus(hint) => write!(f, "Focus({hint})"),
        }
    }
}
