use std::io;

use http::status::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use thiserror::Error;
use tokio::time::error::Elapsed;

use crate::properties::GraphId;

/// Failure taxonomy of the view engine.
///
/// Only [SynopticError::GraphSwitch] is meant for end users; every other variant stays internal
/// to the engine, which degrades (logs and leaves prior state intact) instead of propagating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum SynopticError {
    #[error("Fetch failed: {0}")]
    Fetch(String),
    #[error("Switching to graph '{graph}' failed: {reason}")]
    GraphSwitch { graph: GraphId, reason: String },
    #[error("File System error: {0}")]
    Io(String),
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
    #[error("Timed out: {0}")]
    Timeout(String),
}

impl SynopticError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            SynopticError::Fetch(_) => StatusCode::BAD_GATEWAY,
            SynopticError::GraphSwitch { .. } => StatusCode::SERVICE_UNAVAILABLE,
            SynopticError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SynopticError::NotFound(_) => StatusCode::NOT_FOUND,
            SynopticError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SynopticError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Fold any engine-internal failure into the one error value surfaced to callers.
    pub fn into_graph_switch(self, graph: &GraphId) -> SynopticError {
        match self {
            SynopticError::GraphSwitch { .. } => self,
            other => SynopticError::GraphSwitch {
                graph: graph.clone(),
                reason: other.to_string(),
            },
        }
    }
}

impl From<toml::de::Error> for SynopticError {
    fn from(src: toml::de::Error) -> SynopticError {
        SynopticError::Serialization(format!("Toml deserialization error: {src}"))
    }
}

impl From<JsonError> for SynopticError {
    fn from(src: JsonError) -> SynopticError {
        SynopticError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<Elapsed> for SynopticError {
    fn from(src: Elapsed) -> SynopticError {
        SynopticError::Timeout(format!("{src}"))
    }
}

impl From<io::Error> for SynopticError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => SynopticError::NotFound(format!("{x}")),
            _ => SynopticError::Io(format!("IOError: {}", x.kind())),
        }
    }
}
