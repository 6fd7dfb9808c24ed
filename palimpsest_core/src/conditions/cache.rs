//! Memoized condition results.

use palimpsest_rules::{NodeId, NodeInstanceState, TransformationCondition};
use std::collections::{HashMap, VecDeque};

use super::evaluate;
use crate::journey::JourneyLedger;

/// Everything a condition result depends on.
///
/// A key built after any visit or tag engagement differs from every key built
/// before it, so a stale result can never be read back.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConditionCacheKey {
    pub condition: TransformationCondition,
    pub node_id: NodeId,
    pub visit_count: u32,
    pub sequence_len: usize,
    pub tag_engagements: u32,
}

impl ConditionCacheKey {
    /// Key for evaluating `condition` on `node` at the ledger's current state.
    pub fn new(condition: &TransformationCondition, ledger: &JourneyLedger, node: &NodeInstanceState) -> Self {
        Self {
            condition: condition.clone(),
            node_id: node.id().clone(),
            visit_count: node.visit_count,
            sequence_len: ledger.len(),
            tag_engagements: ledger.total_tag_engagements(),
        }
    }
}

/// Bounded memo table for [`evaluate`]; evicts the oldest entry when full.
#[derive(Debug, Clone)]
pub struct ConditionCache {
    capacity: usize,
    entries: HashMap<ConditionCacheKey, bool>,
    order: VecDeque<ConditionCacheKey>,
    hits: u64,
    misses: u64,
}

impl ConditionCache {
    /// Cache holding at most `capacity` results, never fewer than one.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
            hits: 0,
            misses: 0,
        }
    }

    /// Evaluate through the cache.
    pub fn evaluate(
        &mut self,
        condition: &TransformationCondition,
        ledger: &JourneyLedger,
        node: &NodeInstanceState,
    ) -> bool {
        let key = ConditionCacheKey::new(condition, ledger, node);
        if let Some(result) = self.entries.get(&key) {
            self.hits += 1;
            return *result;
        }

        self.misses += 1;
        let result = evaluate(condition, ledger, node);
        if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, result);
        result
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (hits, misses) since creation or the last clear.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.hits = 0;
        self.misses = 0;
    }
}
