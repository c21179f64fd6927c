//! Per-domain centroid and radius summaries for layout hinting.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use titlecase::titlecase;

use crate::store::ViewGraph;

/// Domains need this many positioned members before a bubble is worth drawing.
pub const MIN_BUBBLE_MEMBERS: usize = 5;

/// Advisory layout hint for one domain: where its members sit and how wide they spread. Consumed
/// only by the rendering surface; nothing downstream depends on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainBubble {
    pub domain: String,
    /// The domain text title-cased for display.
    pub label: String,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub count: usize,
}

/// Summarize the display graph's positioned nodes into per-domain bubbles, ordered by domain.
///
/// Nodes without a settled position do not contribute. The centroid is the member mean and the
/// radius grows with the square root of membership, floored at 120.
pub fn recompute(display: &ViewGraph) -> Vec<DomainBubble> {
    let mut sums: BTreeMap<&str, (f32, f32, usize)> = BTreeMap::new();
    for concept in display.concepts.values() {
        let Some(position) = concept.position else {
            continue;
        };
        let entry = sums.entry(concept.domain.as_str()).or_insert((0.0, 0.0, 0));
        entry.0 += position.x;
        entry.1 += position.y;
        entry.2 += 1;
    }
    sums.into_iter()
        .filter(|(_, (_, _, count))| *count >= MIN_BUBBLE_MEMBERS)
        .map(|(domain, (x_sum, y_sum, count))| DomainBubble {
            domain: domain.to_string(),
            label: titlecase(domain),
            x: x_sum / count as f32,
            y: y_sum / count as f32,
            radius: (70.0 + 55.0 * (count as f32).sqrt()).max(120.0),
            count,
        })
        .collect()
}
