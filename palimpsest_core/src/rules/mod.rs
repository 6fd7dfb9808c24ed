//! Transformation Rule Store - promotes satisfied rules onto nodes.
//!
//! Authored rules wait in a catalog until their condition holds for the
//! reader's journey, then are appended to the node's rule list in the
//! [`NodeStore`]. Journey-derived rules take the same path. Rule lists only
//! grow; nothing here removes a rule.

use palimpsest_rules::{
    NodeId, NodeStore, RuleOrigin, StoreError, TextTransformation, TransformationCondition,
    TransformationRule,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::conditions::ConditionCache;
use crate::journey::JourneyLedger;

/// Authored rules keyed by the node they apply to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleStore {
    catalog: BTreeMap<NodeId, Vec<TransformationRule>>,
}

impl RuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an authored rule. Returns false if an equivalent rule is
    /// already registered for the node.
    pub fn add_authored(&mut self, node_id: NodeId, rule: TransformationRule) -> bool {
        let rules = self.catalog.entry(node_id).or_default();
        if rules.iter().any(|existing| existing.duplicates(&rule)) {
            return false;
        }
        rules.push(rule);
        true
    }

    /// Authored rules registered for a node, in registration order.
    pub fn authored_for(&self, node_id: &NodeId) -> &[TransformationRule] {
        self.catalog.get(node_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of authored rules across all nodes.
    pub fn len(&self) -> usize {
        self.catalog.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append every authored rule for `node_id` whose condition now holds.
    ///
    /// Returns how many rules were newly added to the node.
    pub fn promote(
        &self,
        store: &mut NodeStore,
        ledger: &JourneyLedger,
        node_id: &NodeId,
        conditions: &mut ConditionCache,
    ) -> Result<usize, StoreError> {
        let node = store.get(node_id)?;
        let satisfied: Vec<TransformationRule> = self
            .authored_for(node_id)
            .iter()
            .filter(|rule| conditions.evaluate(&rule.condition, ledger, node))
            .cloned()
            .collect();

        let mut promoted = 0;
        for rule in satisfied {
            if store.add_rule_if_absent(node_id, rule)? {
                promoted += 1;
            }
        }
        if promoted > 0 {
            debug!(node_id = %node_id, promoted, "authored rules promoted");
        }
        Ok(promoted)
    }

    /// Append a journey-derived rule to a node through the same duplicate check.
    pub fn adopt(store: &mut NodeStore, node_id: &NodeId, rule: TransformationRule) -> Result<bool, StoreError> {
        store.add_rule_if_absent(node_id, rule)
    }
}

/// Build a rule that fires again whenever the last `window` visits recur.
///
/// Returns `None` when there is nothing to transform or no history yet.
pub fn journey_rule(
    ledger: &JourneyLedger,
    window: usize,
    transformations: Vec<TextTransformation>,
) -> Option<TransformationRule> {
    if transformations.is_empty() || ledger.is_empty() {
        return None;
    }
    let pattern = ledger.recent_sequence(window).to_vec();
    Some(
        TransformationRule::new(TransformationCondition::JourneyPattern(pattern), transformations)
            .with_origin(RuleOrigin::Journey),
    )
}
