//! Condition Evaluator - pure evaluation of the condition language.
//!
//! `evaluate` reads the node state and the ledger and nothing else; it never
//! mutates either. Every well-formed tree evaluates to a boolean, including
//! empty combinators and histories shorter than a pattern.

mod cache;

pub use cache::*;

use palimpsest_rules::{NodeId, NodeInstanceState, TransformationCondition};

use crate::journey::JourneyLedger;

/// Evaluate `condition` for `node` against the journey so far.
pub fn evaluate(condition: &TransformationCondition, ledger: &JourneyLedger, node: &NodeInstanceState) -> bool {
    use TransformationCondition::*;

    match condition {
        MinVisits(threshold) => node.visit_count >= *threshold,
        VisitPattern(pattern) | JourneyPattern(pattern) => ends_with_pattern(ledger, pattern),
        PreviouslyVisited(required) => required.iter().all(|id| ledger.has_visited(id)),
        TagEngagement { tag, min } => ledger.tag_engagement_count(tag) >= *min,
        TemporalPosition(layer) => node.temporal_layer() == *layer,
        EndpointProgress { min_distinct_nodes } => ledger.distinct_nodes_visited() >= *min_distinct_nodes,
        RevisitPattern(pairs) => pairs
            .iter()
            .all(|(id, min)| ledger.revisit_count_of(id) >= *min),
        CharacterBleed => ledger
            .character_of_previous_visit()
            .is_some_and(|previous| previous != node.character()),
        AllOf(children) => children.iter().all(|child| evaluate(child, ledger, node)),
        AnyOf(children) => children.iter().any(|child| evaluate(child, ledger, node)),
        Not(child) => !evaluate(child, ledger, node),
    }
}

/// Whether the journey ends with exactly `pattern`. An empty pattern always matches.
fn ends_with_pattern(ledger: &JourneyLedger, pattern: &[NodeId]) -> bool {
    ledger.sequence().ends_with(pattern)
}
