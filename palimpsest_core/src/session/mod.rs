//! Reading Session - the single owner of mutable reading state.
//!
//! A session holds the node store, the journey ledger, the authored rule
//! catalog and the orchestrator caches. Every operation that can fail returns
//! an [`EngineError`], leaves state untouched, and records the message for
//! [`ReadingSession::last_error`].

mod view;

pub use view::*;

use palimpsest_rules::{
    DisplayContent, EnhancedContent, Node, NodeId, NodeStore, TransformationRule,
};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, instrument, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::journey::JourneyLedger;
use crate::orchestrator::{Orchestrator, PassThrottle, RenderedContent};
use crate::rules::RuleStore;
use crate::transform::sanitize;

/// A reader's session over one narrative graph.
pub struct ReadingSession {
    store: NodeStore,
    ledger: JourneyLedger,
    rules: RuleStore,
    orchestrator: Orchestrator,
    throttle: PassThrottle,
    clock: Box<dyn Clock>,
    renders: HashMap<NodeId, RenderedContent>,
    last_error: Option<String>,
}

impl ReadingSession {
    /// Session over the authored `nodes`, with no content and an empty journey.
    pub fn new(nodes: impl IntoIterator<Item = Node>, config: EngineConfig) -> Self {
        Self {
            store: NodeStore::from_nodes(nodes),
            ledger: JourneyLedger::new(),
            rules: RuleStore::new(),
            throttle: PassThrottle::new(config.min_refresh_interval_ms),
            orchestrator: Orchestrator::new(config),
            clock: Box::new(SystemClock),
            renders: HashMap::new(),
            last_error: None,
        }
    }

    /// Replace the clock used for refresh throttling.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        self.orchestrator.config()
    }

    /// All nodes and their instance state.
    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    /// The journey so far.
    pub fn ledger(&self) -> &JourneyLedger {
        &self.ledger
    }

    pub fn rules(&self) -> &RuleStore {
        &self.rules
    }

    /// The node visited last.
    pub fn current_node(&self) -> Option<&NodeId> {
        self.ledger.current_node()
    }

    /// Message of the most recent failed operation.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn track<T>(&mut self, result: Result<T, EngineError>) -> Result<T, EngineError> {
        if let Err(error) = &result {
            warn!(%error, "session operation failed");
            self.last_error = Some(error.to_string());
        }
        result
    }

    /// Parse authored text with the section markers and attach it to a node.
    pub fn load_content(&mut self, node_id: &NodeId, text: &str) -> Result<(), EngineError> {
        self.set_content(node_id, EnhancedContent::parse(text))
    }

    /// Attach already structured content to a node.
    ///
    /// Text that arrives carrying transformation markup is sanitized first,
    /// so transformed output can never become a transformation source. A node
    /// that has already been visited is re-rendered from the new text.
    pub fn set_content(&mut self, node_id: &NodeId, content: EnhancedContent) -> Result<(), EngineError> {
        let result = self.replace_content(node_id, content);
        self.track(result)
    }

    fn replace_content(&mut self, node_id: &NodeId, content: EnhancedContent) -> Result<(), EngineError> {
        let content = if content.is_contaminated() {
            warn!(node_id = %node_id, "loaded content carries transformation markup, sanitizing");
            clean(content)
        } else {
            content
        };
        self.store.set_content(node_id, content)?;
        self.renders.remove(node_id);
        self.orchestrator.invalidate(node_id);

        if self.store.get(node_id)?.visit_count > 0 {
            self.refresh(node_id)?;
        }
        Ok(())
    }

    /// Register an authored rule; it reaches the node once its condition holds.
    pub fn add_authored_rule(&mut self, node_id: &NodeId, rule: TransformationRule) -> Result<bool, EngineError> {
        let result = self
            .store
            .get(node_id)
            .map(|_| ())
            .map_err(EngineError::from);
        let result = result.map(|()| self.rules.add_authored(node_id.clone(), rule));
        self.track(result)
    }

    /// Visit a node: count it, record it, promote rules and re-render it.
    #[instrument(skip(self))]
    pub fn visit_node(&mut self, node_id: &NodeId) -> Result<VisitOutcome, EngineError> {
        let result = self.try_visit(node_id);
        self.track(result)
    }

    fn try_visit(&mut self, node_id: &NodeId) -> Result<VisitOutcome, EngineError> {
        let visit_count = self.store.visit(node_id)?;

        let node = self.store.get(node_id)?;
        let sequence_index = self
            .ledger
            .record_visit(node_id, node.character(), node.node.temporal_value);

        self.rules.promote(
            &mut self.store,
            &self.ledger,
            node_id,
            self.orchestrator.conditions_mut(),
        )?;
        if let Some(rule) = self
            .orchestrator
            .journey_rule_for(self.store.get(node_id)?, &self.ledger)
        {
            RuleStore::adopt(&mut self.store, node_id, rule)?;
        }

        let content = self.refresh(node_id)?;
        let visual_state = self.store.get(node_id)?.visual_state;
        info!(
            node_id = %node_id,
            visit_count,
            sequence_index,
            ?visual_state,
            "node visited"
        );

        Ok(VisitOutcome {
            visit_count,
            visual_state,
            content,
        })
    }

    /// Re-render a node and store the result as its current content.
    fn refresh(&mut self, node_id: &NodeId) -> Result<Option<DisplayContent>, EngineError> {
        let node = self.store.get(node_id)?;
        if node.content.is_none() {
            debug!(node_id = %node_id, "no content loaded, nothing to render");
            return Ok(None);
        }

        let rendered = self.orchestrator.compute_display_content(node, &self.ledger)?;
        self.store.set_current_content(node_id, rendered.content.clone())?;
        let content = rendered.content.clone();
        self.renders.insert(node_id.clone(), rendered);
        Ok(Some(content))
    }

    /// Record engagement with a tag and refresh the current node.
    ///
    /// Returns the refreshed content, or `None` if there is no current node
    /// or the refresh was throttled.
    #[instrument(skip(self))]
    pub fn engage_tag(&mut self, tag: &str) -> Result<Option<DisplayContent>, EngineError> {
        self.ledger.record_tag_engagement(tag);

        let Some(current) = self.ledger.current_node().cloned() else {
            return Ok(None);
        };
        if !self.throttle.allow(&current, self.clock.now()) {
            debug!(node_id = %current, "refresh throttled");
            return Ok(None);
        }

        let result = self.refresh(&current);
        self.track(result)
    }

    /// Reveal an edge between two nodes in both directions.
    pub fn reveal_connection(&mut self, from: &NodeId, to: &NodeId) -> Result<bool, EngineError> {
        let result = self.store.reveal_connection(from, to).map_err(EngineError::from);
        self.track(result)
    }

    /// Node summaries and revealed edges for the visualization.
    pub fn constellation(&self) -> ConstellationView {
        let current = self.current_node();
        let neighbours: BTreeSet<&NodeId> = current
            .and_then(|id| self.store.get(id).ok())
            .map(|node| node.revealed_connections.iter().collect())
            .unwrap_or_default();

        let mut connections = BTreeSet::new();
        let nodes = self
            .store
            .iter()
            .map(|node| {
                for target in &node.revealed_connections {
                    let edge = if node.id() < target {
                        (node.id().clone(), target.clone())
                    } else {
                        (target.clone(), node.id().clone())
                    };
                    connections.insert(edge);
                }

                let is_relevant = current == Some(node.id())
                    || neighbours.contains(node.id())
                    || current.is_some_and(|id| node.revealed_connections.contains(id));

                NodeSummary {
                    id: node.id().clone(),
                    title: node.node.title.clone(),
                    character: node.character(),
                    visual_state: node.visual_state,
                    visit_count: node.visit_count,
                    is_relevant,
                }
            })
            .collect();

        ConstellationView {
            nodes,
            connections: connections.into_iter().collect(),
        }
    }

    /// Current content of a node with a summary of what shaped it.
    pub fn reading_view(&mut self, node_id: &NodeId) -> Result<ReadingView, EngineError> {
        let result = self.store.get(node_id).map_err(EngineError::from).map(|node| {
            let render = self.renders.get(node_id);
            ReadingView {
                node_id: node_id.clone(),
                title: node.node.title.clone(),
                content: node.current_content.clone(),
                variant: render.map(|r| r.variant.clone()),
                transformation_count: render.map_or(0, |r| r.applied.len()),
                breakdown: render.map(RenderedContent::breakdown).unwrap_or_default(),
                visual_state: node.visual_state,
            }
        });
        self.track(result)
    }

    /// Persistable copy of the reading state. Caches are not included.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            store: self.store.clone(),
            ledger: self.ledger.clone(),
            rules: self.rules.clone(),
            renders: self
                .renders
                .iter()
                .map(|(id, rendered)| (id.clone(), rendered.clone()))
                .collect(),
        }
    }

    /// The snapshot as JSON.
    pub fn snapshot_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string(&self.snapshot())?)
    }

    /// Replace all reading state with a snapshot. Caches start empty.
    ///
    /// Render records travel with the snapshot, so the reading view reports
    /// what shaped each restored text. A snapshot without them has its
    /// current node rendered again.
    pub fn restore(&mut self, snapshot: SessionSnapshot) {
        self.store = snapshot.store;
        self.ledger = snapshot.ledger;
        self.rules = snapshot.rules;
        self.renders = snapshot.renders.into_iter().collect();
        self.orchestrator.clear();
        self.throttle.clear();
        self.last_error = None;

        if let Some(current) = self.ledger.current_node().cloned() {
            if !self.renders.contains_key(&current) {
                if let Err(error) = self.refresh(&current) {
                    warn!(node_id = %current, %error, "restored node could not be rendered");
                }
            }
        }
        info!(
            nodes = self.store.len(),
            visits = self.ledger.len(),
            renders = self.renders.len(),
            "session restored"
        );
    }

    /// Parse a snapshot produced by [`ReadingSession::snapshot_json`] and restore it.
    pub fn restore_json(&mut self, json: &str) -> Result<(), EngineError> {
        let result = serde_json::from_str::<SessionSnapshot>(json).map_err(EngineError::from);
        let result = result.map(|snapshot| self.restore(snapshot));
        self.track(result)
    }

    /// Forget the journey. Authored nodes, content and rules are kept.
    pub fn reset(&mut self) {
        self.store.reset();
        self.ledger.reset();
        self.orchestrator.clear();
        self.throttle.clear();
        self.renders.clear();
        self.last_error = None;
        info!("session reset");
    }
}

fn clean(content: EnhancedContent) -> EnhancedContent {
    EnhancedContent {
        base: sanitize(&content.base),
        visit_variants: content
            .visit_variants
            .into_iter()
            .map(|(count, text)| (count, sanitize(&text)))
            .collect(),
        sections: content
            .sections
            .into_iter()
            .map(|(name, text)| (name, sanitize(&text)))
            .collect(),
    }
}
