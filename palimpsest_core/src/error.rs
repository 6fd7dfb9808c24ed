//! Engine error types.

use palimpsest_rules::StoreError;
use thiserror::Error;

/// Top-level engine error type.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A node store lookup or update failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A session snapshot could not be serialized or restored.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// Engine configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}
