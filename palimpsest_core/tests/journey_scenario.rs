//! End-to-end reading journeys through a small constellation.

use palimpsest_core::{evaluate, sanitize, EngineConfig, ReadingSession};
use palimpsest_rules::{
    Character, Node, NodeId, TextTransformation, TransformationCondition, TransformationRule, VisualState,
};

const DISCOVERY: &str = "The dig uncovered a sealed chamber. Dust hung in the lamp light.";
const AWAKENING: &str = "A process woke in the archive. It read every record twice.";

fn id(s: &str) -> NodeId {
    NodeId::from(s)
}

fn constellation() -> ReadingSession {
    let nodes = [
        Node::new("arch-discovery", "The Discovery", Character::Archaeologist)
            .with_temporal_value(2)
            .with_connection("algo-awakening")
            .with_attractor("memory"),
        Node::new("algo-awakening", "The Awakening", Character::Algorithm)
            .with_temporal_value(5)
            .with_connection("human-choice"),
        Node::new("human-choice", "The Choice", Character::LastHuman).with_temporal_value(9),
    ];
    let mut session = ReadingSession::new(nodes, EngineConfig::default());
    session.load_content(&id("arch-discovery"), DISCOVERY).unwrap();
    session.load_content(&id("algo-awakening"), AWAKENING).unwrap();
    session
        .load_content(
            &id("human-choice"),
            "Nothing is decided yet.\n---after-algorithm---\nThe machine left its choice with you.",
        )
        .unwrap();
    session
}

#[test]
fn test_return_after_another_voice() {
    let mut session = constellation();

    let first = session.visit_node(&id("arch-discovery")).unwrap();
    let first = first.content.unwrap();
    assert_eq!(first.as_str(), DISCOVERY);

    session.visit_node(&id("algo-awakening")).unwrap();
    let returned = session.visit_node(&id("arch-discovery")).unwrap();
    assert_eq!(returned.visit_count, 2);
    assert_eq!(returned.visual_state, VisualState::Revisited);

    let ledger = session.ledger();
    let node = session.store().get(&id("arch-discovery")).unwrap();
    assert!(evaluate(&TransformationCondition::CharacterBleed, ledger, node));
    assert!(evaluate(
        &TransformationCondition::journey_pattern(["arch-discovery", "algo-awakening", "arch-discovery"]),
        ledger,
        node,
    ));

    let content = returned.content.unwrap();
    assert_ne!(content, first);
    assert!(content.as_str().contains("Algorithm"));
    assert_eq!(sanitize(content.as_str()), DISCOVERY);
}

#[test]
fn test_rendering_is_stable_for_an_unchanged_journey() {
    let mut session = constellation();
    session.visit_node(&id("arch-discovery")).unwrap();
    session.visit_node(&id("algo-awakening")).unwrap();

    let before = session.reading_view(&id("algo-awakening")).unwrap();
    let after = session.reading_view(&id("algo-awakening")).unwrap();
    assert_eq!(before, after);
    assert!(before.transformation_count <= EngineConfig::default().max_transformations);
}

#[test]
fn test_bleed_section_replaces_text() {
    let mut session = constellation();
    session.visit_node(&id("algo-awakening")).unwrap();
    let outcome = session.visit_node(&id("human-choice")).unwrap();

    assert_eq!(
        sanitize(outcome.content.unwrap().as_str()),
        "The machine left its choice with you."
    );
}

#[test]
fn test_authored_rule_applies_after_prerequisite() {
    let mut session = constellation();
    session
        .add_authored_rule(
            &id("human-choice"),
            TransformationRule::new(
                TransformationCondition::AllOf(vec![
                    TransformationCondition::previously_visited(["arch-discovery"]),
                    TransformationCondition::MinVisits(1),
                ]),
                vec![TextTransformation::replace("decided", "written").immediately()],
            ),
        )
        .unwrap();

    let untouched = session.visit_node(&id("human-choice")).unwrap();
    assert_eq!(untouched.content.unwrap().as_str(), "Nothing is decided yet.");

    session.visit_node(&id("arch-discovery")).unwrap();
    let changed = session.visit_node(&id("human-choice")).unwrap();
    let text = changed.content.unwrap();
    assert!(text.as_str().contains(">written</span>"));
    assert_eq!(sanitize(text.as_str()), "Nothing is decided yet.");
}

#[test]
fn test_snapshot_resumes_the_same_rendering() {
    let mut session = constellation();
    session.visit_node(&id("arch-discovery")).unwrap();
    session.visit_node(&id("algo-awakening")).unwrap();
    let json = session.snapshot_json().unwrap();

    let mut resumed = constellation();
    resumed.restore_json(&json).unwrap();

    let original = session.visit_node(&id("arch-discovery")).unwrap();
    let replayed = resumed.visit_node(&id("arch-discovery")).unwrap();
    assert_eq!(original.content, replayed.content);
}
