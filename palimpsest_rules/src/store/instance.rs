//! Runtime state for a single node.

use serde::{Deserialize, Serialize};

use crate::content::{DisplayContent, EnhancedContent};
use crate::entities::{Character, Node, NodeId, TemporalLayer, VisualState};
use crate::transformation::TransformationRule;

/// A node plus everything the reader has done to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInstanceState {
    pub node: Node,

    /// Only ever increases, except on a full reset.
    pub visit_count: u32,

    /// Derived from `visit_count` and the node's thresholds.
    pub visual_state: VisualState,

    /// Always a superset of the node's initial connections.
    pub revealed_connections: Vec<NodeId>,

    /// Accumulated rules; never pruned during a session.
    pub transformations: Vec<TransformationRule>,

    pub content: Option<EnhancedContent>,

    /// Derived display text. Recomputed, never used as a source.
    pub current_content: Option<DisplayContent>,
}

impl NodeInstanceState {
    /// Unvisited instance of an authored node, with its initial connections revealed.
    pub fn new(node: Node) -> Self {
        Self {
            revealed_connections: node.initial_connections.clone(),
            node,
            visit_count: 0,
            visual_state: VisualState::Unvisited,
            transformations: Vec::new(),
            content: None,
            current_content: None,
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.node.id
    }

    pub fn character(&self) -> Character {
        self.node.character
    }

    /// Layer derived from the authored temporal value.
    pub fn temporal_layer(&self) -> TemporalLayer {
        self.node.temporal_layer()
    }

    pub(crate) fn record_visit(&mut self) -> u32 {
        self.visit_count = self.visit_count.saturating_add(1);
        self.visual_state = self.node.thresholds.state_for(self.visit_count);
        self.visit_count
    }

    pub(crate) fn reveal_connection(&mut self, target: NodeId) -> bool {
        if target == self.node.id || self.revealed_connections.contains(&target) {
            return false;
        }
        self.revealed_connections.push(target);
        true
    }

    pub(crate) fn add_rule_if_absent(&mut self, rule: TransformationRule) -> bool {
        if self.transformations.iter().any(|existing| existing.duplicates(&rule)) {
            return false;
        }
        self.transformations.push(rule);
        true
    }

    pub(crate) fn reset(&mut self) {
        self.visit_count = 0;
        self.visual_state = VisualState::Unvisited;
        self.revealed_connections = self.node.initial_connections.clone();
        self.transformations.clear();
        self.current_content = None;
    }
}
