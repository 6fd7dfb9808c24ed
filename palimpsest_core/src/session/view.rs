//! Read-only views handed to the presentation layer, and persisted state.

use palimpsest_rules::{Character, DisplayContent, NodeId, NodeStore, VisualState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::journey::JourneyLedger;
use crate::orchestrator::RenderedContent;
use crate::rules::RuleStore;
use crate::transform::PriorityBreakdown;
use crate::variants::VariantSource;

/// What a visualization needs to draw one node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSummary {
    pub id: NodeId,
    pub title: String,
    pub character: Character,
    pub visual_state: VisualState,
    pub visit_count: u32,
    /// The current node or one of its revealed neighbours.
    pub is_relevant: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstellationView {
    pub nodes: Vec<NodeSummary>,
    /// Undirected edges, each listed once with the smaller ID first.
    pub connections: Vec<(NodeId, NodeId)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadingView {
    pub node_id: NodeId,
    pub title: String,
    pub content: Option<DisplayContent>,
    pub variant: Option<VariantSource>,
    pub transformation_count: usize,
    pub breakdown: PriorityBreakdown,
    pub visual_state: VisualState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitOutcome {
    pub visit_count: u32,
    pub visual_state: VisualState,
    /// `None` when the node has no content loaded.
    pub content: Option<DisplayContent>,
}

/// Everything needed to resume a reading session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub store: NodeStore,
    pub ledger: JourneyLedger,
    #[serde(default)]
    pub rules: RuleStore,
    /// The last render of each visited node.
    #[serde(default)]
    pub renders: BTreeMap<NodeId, RenderedContent>,
}
