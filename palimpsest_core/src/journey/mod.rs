//! Journey Ledger - the append-only record of the reader's path.
//!
//! The ledger stores what happened and derives signals from it:
//! - the ordered sequence of visited nodes (revisits included)
//! - per-node visit counters and per-tag engagement counters
//! - detailed visit and transition records, indexed by position
//! - aggregates such as character focus and recursive awareness

mod patterns;
mod record;

pub use patterns::*;
pub use record::*;

use palimpsest_rules::{Character, NodeId, TemporalLayer};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The reader's path through the narrative, append-only until reset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JourneyLedger {
    sequence: Vec<NodeId>,
    revisit_counts: BTreeMap<NodeId, u32>,
    tag_engagement: BTreeMap<String, u32>,
    visits: Vec<VisitRecord>,
    transitions: Vec<TransitionRecord>,
}

impl JourneyLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a visit and return its index in the sequence.
    ///
    /// Must happen before any condition that depends on this visit is evaluated.
    pub fn record_visit(&mut self, node_id: &NodeId, character: Character, temporal_value: i32) -> usize {
        let sequence_index = self.sequence.len();

        if let Some(previous) = self.sequence.last() {
            self.transitions.push(TransitionRecord {
                from: previous.clone(),
                to: node_id.clone(),
                engaged_tags: Vec::new(),
            });
        }

        let counter = self.revisit_counts.entry(node_id.clone()).or_insert(0);
        *counter += 1;
        let revisit_count = *counter;

        self.sequence.push(node_id.clone());
        self.visits.push(VisitRecord {
            node_id: node_id.clone(),
            character,
            temporal_layer: TemporalLayer::from_value(temporal_value),
            sequence_index,
            revisit_count,
            engaged_tags: Vec::new(),
        });

        sequence_index
    }

    /// Count an engagement with a tag, attributing it to the latest visit and
    /// transition when they exist.
    pub fn record_tag_engagement(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if let Some(visit) = self.visits.last_mut() {
            visit.engaged_tags.push(tag.clone());
        }
        if let Some(transition) = self.transitions.last_mut() {
            transition.engaged_tags.push(tag.clone());
        }
        *self.tag_engagement.entry(tag).or_insert(0) += 1;
    }

    /// The last `n` visited nodes, oldest first.
    pub fn recent_sequence(&self, n: usize) -> &[NodeId] {
        let start = self.sequence.len().saturating_sub(n);
        &self.sequence[start..]
    }

    /// Times `node_id` appears in the journey, counting the first visit.
    pub fn revisit_count_of(&self, node_id: &NodeId) -> u32 {
        self.revisit_counts.get(node_id).copied().unwrap_or(0)
    }

    /// Character of the second-to-last visit, if there have been two.
    pub fn character_of_previous_visit(&self) -> Option<Character> {
        self.visits
            .len()
            .checked_sub(2)
            .map(|index| self.visits[index].character)
    }

    /// Engagements recorded for `tag`, zero when never engaged.
    pub fn tag_engagement_count(&self, tag: &str) -> u32 {
        self.tag_engagement.get(tag).copied().unwrap_or(0)
    }

    /// Engagement counts by tag, in name order.
    pub fn tag_engagements(&self) -> &BTreeMap<String, u32> {
        &self.tag_engagement
    }

    /// Total engagements across all tags.
    pub fn total_tag_engagements(&self) -> u32 {
        self.tag_engagement.values().sum()
    }

    /// Every visited node in visit order, repeats included.
    pub fn sequence(&self) -> &[NodeId] {
        &self.sequence
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// One record per visit, parallel to [`JourneyLedger::sequence`].
    pub fn visits(&self) -> &[VisitRecord] {
        &self.visits
    }

    /// One record per move between consecutive visits.
    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    /// The most recently visited node.
    pub fn current_node(&self) -> Option<&NodeId> {
        self.sequence.last()
    }

    /// Whether `node_id` appears anywhere in the journey.
    pub fn has_visited(&self, node_id: &NodeId) -> bool {
        self.revisit_counts.contains_key(node_id)
    }

    /// Number of different nodes visited at least once.
    pub fn distinct_nodes_visited(&self) -> usize {
        self.revisit_counts.len()
    }

    /// Characters of the last `n` visits, oldest first.
    pub fn recent_characters(&self, n: usize) -> Vec<Character> {
        let start = self.visits.len().saturating_sub(n);
        self.visits[start..].iter().map(|v| v.character).collect()
    }

    /// Share of visits that went to each character.
    pub fn character_focus(&self) -> BTreeMap<Character, f64> {
        let mut counts: BTreeMap<Character, usize> = BTreeMap::new();
        for visit in &self.visits {
            *counts.entry(visit.character).or_default() += 1;
        }
        self.ratios(counts)
    }

    /// Share of visits that went to each temporal layer.
    pub fn temporal_focus(&self) -> BTreeMap<TemporalLayer, f64> {
        let mut counts: BTreeMap<TemporalLayer, usize> = BTreeMap::new();
        for visit in &self.visits {
            *counts.entry(visit.temporal_layer).or_default() += 1;
        }
        self.ratios(counts)
    }

    fn ratios<K: Ord>(&self, counts: BTreeMap<K, usize>) -> BTreeMap<K, f64> {
        let total = self.visits.len() as f64;
        counts
            .into_iter()
            .map(|(key, count)| (key, count as f64 / total))
            .collect()
    }

    /// The most visited character. Ties go to the earlier character.
    pub fn dominant_character(&self) -> Option<Character> {
        let focus = self.character_focus();
        Character::ALL
            .iter()
            .filter_map(|c| focus.get(c).map(|ratio| (*c, *ratio)))
            .fold(None, |best: Option<(Character, f64)>, (c, ratio)| match best {
                Some((_, best_ratio)) if best_ratio >= ratio => best,
                _ => Some((c, ratio)),
            })
            .map(|(c, _)| c)
    }

    /// Share of visits that returned to an already visited node, in `[0, 1]`.
    pub fn recursive_awareness(&self) -> f64 {
        if self.sequence.is_empty() {
            return 0.0;
        }
        let distinct: BTreeSet<&NodeId> = self.sequence.iter().collect();
        (self.sequence.len() - distinct.len()) as f64 / self.sequence.len() as f64
    }

    /// Forget the whole journey.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
