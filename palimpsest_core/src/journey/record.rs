//! Records kept by the journey ledger.

use palimpsest_rules::{Character, NodeId, TemporalLayer};
use serde::{Deserialize, Serialize};

/// One step of the journey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitRecord {
    pub node_id: NodeId,
    pub character: Character,
    pub temporal_layer: TemporalLayer,

    /// Position of this visit in the sequence.
    pub sequence_index: usize,

    /// How many times the node had been visited, this visit included.
    pub revisit_count: u32,

    /// Tags engaged while this was the most recent visit.
    pub engaged_tags: Vec<String>,
}

/// Movement from one node to the next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: NodeId,
    pub to: NodeId,
    pub engaged_tags: Vec<String>,
}
