//! Error types for the node store and content handling.

use thiserror::Error;

use crate::entities::NodeId;

/// Errors raised by node store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No node with this identifier exists in the store.
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// The node exists but has no content loaded.
    #[error("no content loaded for node {0}")]
    ContentNotFound(NodeId),

    /// Text offered as raw content already carries transformation markup.
    #[error("content already carries transformation markup")]
    AlreadyTransformed,
}
