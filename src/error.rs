//! Error types for layout and endpoint-group construction.
//!
//! Everything here is a programmer or configuration error: operations are
//! local and deterministic, so nothing is retried.

use thiserror::Error;

use crate::model::NodeId;

#[derive(Debug, Error)]
pub enum PlumbingError {
    /// The node cannot be measured yet (not attached to the document).
    /// Callers must render nodes before asking for their layout.
    #[error("invalid state for node '{node}': {reason}")]
    InvalidState { node: NodeId, reason: String },

    /// A schema entry is malformed. Raised when the endpoint group is built,
    /// never at render time.
    #[error("endpoint schema entry {index}: {reason}")]
    SchemaResolution { index: usize, reason: String },

    #[error("unknown node '{0}'")]
    UnknownNode(NodeId),

    /// A `layout` attribute on a model is not an `{x, y}` object.
    #[error("invalid layout attribute: {0}")]
    InvalidLayout(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PlumbingError>;
