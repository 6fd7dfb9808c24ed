//! Recognisable shapes in the recent journey.

use palimpsest_rules::{
    AnnotationPlacement, EmphasisStyle, FragmentStyle, NodeInstanceState, Priority, TextTransformation,
};
use serde::{Deserialize, Serialize};

use super::JourneyLedger;
use crate::transform::{first_sentence, last_sentence};

/// A pattern detected in the tail of the journey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JourneyPatternKind {
    /// The current node already appeared earlier in the window.
    Revisitation,
    /// The last three visits alternate between two characters (A, B, A).
    CharacterLoop,
}

impl JourneyPatternKind {
    /// Name of the content section keyed to this pattern.
    pub fn section_key(&self) -> &'static str {
        match self {
            JourneyPatternKind::Revisitation => "journey-revisitation",
            JourneyPatternKind::CharacterLoop => "journey-character-loop",
        }
    }
}

/// Detect patterns over the last `window` visits, in a fixed order.
pub fn detect_patterns(ledger: &JourneyLedger, window: usize) -> Vec<JourneyPatternKind> {
    let mut patterns = Vec::new();

    let recent = ledger.recent_sequence(window);
    if let Some((current, earlier)) = recent.split_last() {
        if earlier.contains(current) {
            patterns.push(JourneyPatternKind::Revisitation);
        }
    }

    if let [a, b, c] = ledger.recent_characters(3)[..] {
        if a == c && a != b {
            patterns.push(JourneyPatternKind::CharacterLoop);
        }
    }

    patterns
}

/// Transformations suggested by the detected patterns for a node's text.
pub fn journey_transformations(
    patterns: &[JourneyPatternKind],
    ledger: &JourneyLedger,
    node: &NodeInstanceState,
    text: &str,
) -> Vec<TextTransformation> {
    let mut transformations = Vec::new();
    let revisits = ledger.revisit_count_of(node.id());

    for pattern in patterns {
        match pattern {
            JourneyPatternKind::Revisitation => {
                if let Some(opening) = first_sentence(text) {
                    let intensity = revisits.clamp(1, 5) as u8;
                    transformations.push(
                        TextTransformation::emphasize(opening, EmphasisStyle::Fade, intensity)
                            .with_priority(Priority::Medium),
                    );
                }
                if revisits >= 3 {
                    if let Some(closing) = last_sentence(text) {
                        transformations.push(
                            TextTransformation::fragment(closing, FragmentStyle::Progressive, "...")
                                .with_priority(Priority::Low),
                        );
                    }
                }
            }
            JourneyPatternKind::CharacterLoop => {
                if let Some(closing) = last_sentence(text) {
                    transformations.push(
                        TextTransformation::annotate(
                            closing,
                            "the voices circle back",
                            AnnotationPlacement::Interlinear,
                        )
                        .with_priority(Priority::Low),
                    );
                }
            }
        }
    }

    transformations
}

#[cfg(test)]
mod tests {
    use super::*;
    use palimpsest_rules::{Character, Node, NodeId, TransformationKind};

    fn id(s: &str) -> NodeId {
        NodeId::from(s)
    }

    #[test]
    fn test_revisitation_and_loop() {
        let mut ledger = JourneyLedger::new();
        ledger.record_visit(&id("arch-discovery"), Character::Archaeologist, 2);
        ledger.record_visit(&id("algo-awakening"), Character::Algorithm, 5);
        assert!(detect_patterns(&ledger, 3).is_empty());

        ledger.record_visit(&id("arch-discovery"), Character::Archaeologist, 2);
        assert_eq!(
            detect_patterns(&ledger, 3),
            vec![JourneyPatternKind::Revisitation, JourneyPatternKind::CharacterLoop]
        );
    }

    #[test]
    fn test_revisitation_outside_window_is_ignored() {
        let mut ledger = JourneyLedger::new();
        for node in ["a", "b", "c", "a"] {
            ledger.record_visit(&id(node), Character::Algorithm, 5);
        }
        assert!(detect_patterns(&ledger, 3).is_empty());
        assert_eq!(detect_patterns(&ledger, 4), vec![JourneyPatternKind::Revisitation]);
    }

    #[test]
    fn test_loop_needs_two_characters() {
        let mut ledger = JourneyLedger::new();
        for node in ["a", "b", "c"] {
            ledger.record_visit(&id(node), Character::LastHuman, 8);
        }
        assert!(detect_patterns(&ledger, 3).is_empty());
    }

    #[test]
    fn test_journey_transformations_target_sentences() {
        let mut ledger = JourneyLedger::new();
        for node in ["a", "b", "a", "b", "a"] {
            ledger.record_visit(&id(node), Character::Algorithm, 5);
        }
        let state = NodeInstanceState::new(Node::new("a", "A", Character::Algorithm));
        let text = "The signal repeats. Nothing else moves.";

        let transformations = journey_transformations(
            &[JourneyPatternKind::Revisitation],
            &ledger,
            &state,
            text,
        );

        assert_eq!(transformations.len(), 2);
        assert_eq!(transformations[0].selector, "The signal repeats.");
        assert!(matches!(
            transformations[0].kind,
            TransformationKind::Emphasize { style: EmphasisStyle::Fade, intensity } if intensity.value() == 3
        ));
        assert_eq!(transformations[1].selector, "Nothing else moves.");
    }
}
