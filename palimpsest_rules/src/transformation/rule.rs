//! Transformation rules - a condition paired with the edits it unlocks.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{TextTransformation, TransformationCondition};

/// Unique identifier for rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleId(pub Uuid);

impl RuleId {
    /// Create a new random rule ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RuleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a rule came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleOrigin {
    /// Written by the author alongside the node content.
    Authored,
    /// Produced at runtime by the journey-pattern detector.
    Journey,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformationRule {
    pub id: RuleId,
    pub condition: TransformationCondition,
    pub transformations: Vec<TextTransformation>,
    pub origin: RuleOrigin,
}

impl TransformationRule {
    /// An authored rule with a fresh ID.
    pub fn new(condition: TransformationCondition, transformations: Vec<TextTransformation>) -> Self {
        Self {
            id: RuleId::new(),
            condition,
            transformations,
            origin: RuleOrigin::Authored,
        }
    }

    pub fn with_origin(mut self, origin: RuleOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Whether `other` would duplicate this rule on the same node.
    ///
    /// Authored rules are keyed by condition alone; journey-derived rules by
    /// condition and transformation list.
    pub fn duplicates(&self, other: &TransformationRule) -> bool {
        if self.condition != other.condition {
            return false;
        }
        match (self.origin, other.origin) {
            (RuleOrigin::Journey, _) | (_, RuleOrigin::Journey) => {
                self.transformations == other.transformations
            }
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authored_duplicates_by_condition() {
        let a = TransformationRule::new(
            TransformationCondition::MinVisits(2),
            vec![TextTransformation::replace("a", "b")],
        );
        let b = TransformationRule::new(
            TransformationCondition::MinVisits(2),
            vec![TextTransformation::replace("c", "d")],
        );
        assert_ne!(a.id, b.id);
        assert!(a.duplicates(&b));
    }

    #[test]
    fn test_journey_duplicates_need_equal_transformations() {
        let condition = TransformationCondition::journey_pattern(["a", "b"]);
        let a = TransformationRule::new(condition.clone(), vec![TextTransformation::replace("a", "b")])
            .with_origin(RuleOrigin::Journey);
        let b = TransformationRule::new(condition.clone(), vec![TextTransformation::replace("c", "d")])
            .with_origin(RuleOrigin::Journey);
        let c = TransformationRule::new(condition, vec![TextTransformation::replace("a", "b")])
            .with_origin(RuleOrigin::Journey);

        assert!(!a.duplicates(&b));
        assert!(a.duplicates(&c));
    }
}
