//! Node store - owns the mutable state of every node in the constellation.

mod instance;

pub use instance::*;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::content::{DisplayContent, EnhancedContent};
use crate::entities::{Node, NodeId};
use crate::error::StoreError;
use crate::transformation::TransformationRule;

/// The central container for node instance state.
///
/// All mutation goes through the update operations below; there is no
/// mutable access to individual nodes from outside the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeStore {
    nodes: BTreeMap<NodeId, NodeInstanceState>,
}

impl NodeStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding a fresh instance for each authored node.
    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        let mut store = Self::new();
        for node in nodes {
            store.insert(node);
        }
        store
    }

    /// Add an authored node, replacing any previous node with the same ID.
    pub fn insert(&mut self, node: Node) {
        self.nodes.insert(node.id.clone(), NodeInstanceState::new(node));
    }

    /// Instance state of a node, or `NodeNotFound`.
    pub fn get(&self, id: &NodeId) -> Result<&NodeInstanceState, StoreError> {
        self.nodes
            .get(id)
            .ok_or_else(|| StoreError::NodeNotFound(id.clone()))
    }

    fn get_mut(&mut self, id: &NodeId) -> Result<&mut NodeInstanceState, StoreError> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| StoreError::NodeNotFound(id.clone()))
    }

    /// Whether a node with this ID exists.
    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Nodes in ID order.
    pub fn iter(&self) -> impl Iterator<Item = &NodeInstanceState> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Register a visit and return the new visit count.
    pub fn visit(&mut self, id: &NodeId) -> Result<u32, StoreError> {
        Ok(self.get_mut(id)?.record_visit())
    }

    /// Reveal an edge in both directions. Returns whether anything changed.
    pub fn reveal_connection(&mut self, from: &NodeId, to: &NodeId) -> Result<bool, StoreError> {
        // Check both ends before touching either.
        self.get(to)?;
        let forward = self.get_mut(from)?.reveal_connection(to.clone());
        let backward = self.get_mut(to)?.reveal_connection(from.clone());
        Ok(forward || backward)
    }

    /// Attach authored content to a node. Any rendered text is discarded,
    /// since it was produced from the previous content.
    pub fn set_content(&mut self, id: &NodeId, content: EnhancedContent) -> Result<(), StoreError> {
        let state = self.get_mut(id)?;
        state.content = Some(content);
        state.current_content = None;
        Ok(())
    }

    /// Store the latest rendered text of a node.
    pub fn set_current_content(&mut self, id: &NodeId, content: DisplayContent) -> Result<(), StoreError> {
        self.get_mut(id)?.current_content = Some(content);
        Ok(())
    }

    /// Append a rule to a node unless an equivalent one is already there.
    pub fn add_rule_if_absent(&mut self, id: &NodeId, rule: TransformationRule) -> Result<bool, StoreError> {
        let state = self.get_mut(id)?;
        let added = state.add_rule_if_absent(rule);
        if added {
            debug!(node_id = %id, rules = state.transformations.len(), "rule added");
        }
        Ok(added)
    }

    /// Return every node to its freshly authored state. Content is kept.
    pub fn reset(&mut self) {
        for state in self.nodes.values_mut() {
            state.reset();
        }
    }
}
