//! Authored node definitions and visit-driven visual state.

use serde::{Deserialize, Serialize};

use super::{Character, NodeId, TemporalLayer};

/// Visual complexity of a node, escalating with repeated visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum VisualState {
    #[default]
    Unvisited,
    Visited,
    Revisited,
    Complex,
    Fragmented,
}

/// Visit counts at which a node escalates its visual state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitThresholds {
    pub revisited: u32,
    pub complex: u32,
    pub fragmented: u32,
}

impl Default for VisitThresholds {
    fn default() -> Self {
        Self {
            revisited: 2,
            complex: 4,
            fragmented: 6,
        }
    }
}

impl VisitThresholds {
    /// Compute the visual state for a visit count.
    ///
    /// Checks run from the highest tier down, so the result never decreases
    /// as the visit count grows, even for oddly ordered thresholds.
    pub fn state_for(&self, visit_count: u32) -> VisualState {
        if visit_count == 0 {
            VisualState::Unvisited
        } else if visit_count >= self.fragmented {
            VisualState::Fragmented
        } else if visit_count >= self.complex.min(self.fragmented) {
            VisualState::Complex
        } else if visit_count >= self.revisited.min(self.complex).min(self.fragmented) {
            VisualState::Revisited
        } else {
            VisualState::Visited
        }
    }
}

/// A narrative node as authored. Never mutated at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub title: String,
    pub character: Character,

    /// Raw temporal position; see [`TemporalLayer::from_value`].
    pub temporal_value: i32,

    pub initial_connections: Vec<NodeId>,

    /// Thematic tags ("strange attractors") shared across nodes.
    pub strange_attractors: Vec<String>,

    pub thresholds: VisitThresholds,
}

impl Node {
    /// Create a node with no edges, no tags and default thresholds.
    pub fn new(id: impl Into<NodeId>, title: impl Into<String>, character: Character) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            character,
            temporal_value: 5,
            initial_connections: Vec::new(),
            strange_attractors: Vec::new(),
            thresholds: VisitThresholds::default(),
        }
    }

    /// Position on the timeline; decides the temporal layer.
    pub fn with_temporal_value(mut self, value: i32) -> Self {
        self.temporal_value = value;
        self
    }

    /// Connection revealed from the start.
    pub fn with_connection(mut self, target: impl Into<NodeId>) -> Self {
        self.initial_connections.push(target.into());
        self
    }

    /// Tag this node draws the reader towards.
    pub fn with_attractor(mut self, tag: impl Into<String>) -> Self {
        self.strange_attractors.push(tag.into());
        self
    }

    pub fn with_thresholds(mut self, thresholds: VisitThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// The temporal layer this node lives in.
    pub fn temporal_layer(&self) -> TemporalLayer {
        TemporalLayer::from_value(self.temporal_value)
    }
}
