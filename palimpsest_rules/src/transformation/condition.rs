//! The declarative condition language.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::entities::{NodeId, TemporalLayer};

/// A predicate over a node's state and the reader's journey.
///
/// Conditions are immutable trees. Leaves inspect one signal; `AllOf`, `AnyOf`
/// and `Not` compose them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum TransformationCondition {
    /// The node has been visited at least this many times.
    MinVisits(u32),

    /// The journey ends with exactly this sequence of nodes.
    VisitPattern(Vec<NodeId>),

    /// Every listed node has been visited at some point, in any order.
    PreviouslyVisited(BTreeSet<NodeId>),

    /// A thematic tag has been engaged at least `min` times.
    TagEngagement { tag: String, min: u32 },

    /// The node lives in this temporal layer.
    TemporalPosition(TemporalLayer),

    /// At least this many distinct nodes have been visited.
    EndpointProgress { min_distinct_nodes: usize },

    /// Each listed node has been visited at least the paired number of times.
    RevisitPattern(Vec<(NodeId, u32)>),

    /// The previous visit belonged to a different character than this node.
    CharacterBleed,

    /// The most recent steps of the journey match this sequence.
    JourneyPattern(Vec<NodeId>),

    AllOf(Vec<TransformationCondition>),
    AnyOf(Vec<TransformationCondition>),
    Not(Box<TransformationCondition>),
}

impl TransformationCondition {
    /// The journey must end with `ids`, in order.
    pub fn visit_pattern<I, T>(ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<NodeId>,
    {
        Self::VisitPattern(ids.into_iter().map(Into::into).collect())
    }

    pub fn journey_pattern<I, T>(ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<NodeId>,
    {
        Self::JourneyPattern(ids.into_iter().map(Into::into).collect())
    }

    /// Every node in `ids` must have been visited.
    pub fn previously_visited<I, T>(ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<NodeId>,
    {
        Self::PreviouslyVisited(ids.into_iter().map(Into::into).collect())
    }

    /// `tag` must have been engaged at least `min` times.
    pub fn tag_engagement(tag: impl Into<String>, min: u32) -> Self {
        Self::TagEngagement {
            tag: tag.into(),
            min,
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(condition: TransformationCondition) -> Self {
        Self::Not(Box::new(condition))
    }

    /// Number of nodes in the tree, combinators included.
    pub fn size(&self) -> usize {
        match self {
            Self::AllOf(children) | Self::AnyOf(children) => {
                1 + children.iter().map(Self::size).sum::<usize>()
            }
            Self::Not(child) => 1 + child.size(),
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_previously_visited_ignores_order() {
        let a = TransformationCondition::previously_visited(["x", "y"]);
        let b = TransformationCondition::previously_visited(["y", "x", "x"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_condition_size() {
        let condition = TransformationCondition::AllOf(vec![
            TransformationCondition::MinVisits(2),
            TransformationCondition::not(TransformationCondition::CharacterBleed),
        ]);
        assert_eq!(condition.size(), 4);
    }

    #[test]
    fn test_condition_serde_shape() {
        let condition = TransformationCondition::AnyOf(vec![
            TransformationCondition::MinVisits(3),
            TransformationCondition::tag_engagement("recursion", 2),
        ]);
        let json = serde_json::to_value(&condition).unwrap();

        assert_eq!(json["type"], "anyOf");
        assert_eq!(json["value"][0]["type"], "minVisits");
        assert_eq!(json["value"][1]["value"]["tag"], "recursion");

        let back: TransformationCondition = serde_json::from_value(json).unwrap();
        assert_eq!(back, condition);
    }
}
