use serde::{Deserialize, Serialize};
use std::{fs::read_to_string, path::Path, time::Duration};

use crate::error::SynopticError;

fn default_overview_node_limit() -> usize {
    250
}

fn default_overview_link_limit() -> usize {
    500
}

fn default_neighbor_limit() -> usize {
    100
}

fn default_evidence_node_limit() -> usize {
    150
}

fn default_evidence_edge_limit() -> usize {
    300
}

fn default_expand_timeout_ms() -> u64 {
    10_000
}

fn default_highlight_retry_attempts() -> u32 {
    10
}

fn default_highlight_retry_delay_ms() -> u64 {
    100
}

/// Tunables of one [crate::engine::ViewEngine] instance.
///
/// Every field has a serde default matching the values below, so a partial `[engine]` table (or
/// none at all) deserializes into a working configuration. Engines own their config; there is no
/// process-global provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Node cap requested from the overview fetch on graph load.
    pub overview_node_limit: usize,
    /// Link cap requested from the overview fetch on graph load.
    pub overview_link_limit: usize,
    /// Result cap requested from each neighbor expansion.
    pub neighbor_limit: usize,
    /// Node cap requested from the evidence-subgraph fetch.
    pub evidence_node_limit: usize,
    /// Edge cap requested from the evidence-subgraph fetch.
    pub evidence_edge_limit: usize,
    /// Ceiling on a single neighbor expansion before it self-cancels and clears its loading
    /// marker.
    pub expand_timeout_ms: u64,
    /// Attempt ceiling of the highlight retry loop that waits for the first graph load.
    pub highlight_retry_attempts: u32,
    /// Sleep between highlight retry attempts.
    pub highlight_retry_delay_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            overview_node_limit: default_overview_node_limit(),
            overview_link_limit: default_overview_link_limit(),
            neighbor_limit: default_neighbor_limit(),
            evidence_node_limit: default_evidence_node_limit(),
            evidence_edge_limit: default_evidence_edge_limit(),
            expand_timeout_ms: default_expand_timeout_ms(),
            highlight_retry_attempts: default_highlight_retry_attempts(),
            highlight_retry_delay_ms: default_highlight_retry_delay_ms(),
        }
    }
}

impl EngineConfig {
    pub fn expand_timeout(&self) -> Duration {
        Duration::from_millis(self.expand_timeout_ms)
    }

    pub fn highlight_retry_delay(&self) -> Duration {
        Duration::from_millis(self.highlight_retry_delay_ms)
    }

    /// Parse a config from a toml document holding an `[engine]` table. Missing table or missing
    /// fields fall back to defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, SynopticError> {
        #[derive(Deserialize)]
        struct Document {
            #[serde(default)]
            engine: EngineConfig,
        }
        let doc: Document = toml::from_str(content)?;
        Ok(doc.engine)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, SynopticError> {
        tracing::debug!("Reading engine config from {:?}", path.as_ref());
        let content = read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}
