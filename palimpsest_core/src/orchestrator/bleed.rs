//! Character bleed: traces of the previous narrator in the current text.

use palimpsest_rules::{AnnotationPlacement, Character, EmphasisStyle, Priority, TextTransformation};

use crate::transform::first_sentence;

/// Words that carry a character's voice into other nodes.
pub fn motifs(character: Character) -> &'static [&'static str] {
    match character {
        Character::Archaeologist => &["memory", "past", "dig", "artifact", "ruins", "dust"],
        Character::Algorithm => &["data", "pattern", "process", "code", "signal", "compute"],
        Character::LastHuman => &["choice", "future", "alone", "human", "breath", "silence"],
    }
}

/// Whether the first occurrence of `word` in `text` stands alone, so that
/// emphasizing that occurrence never splits a longer word.
fn first_occurrence_is_word(text: &str, word: &str) -> bool {
    let Some(start) = text.find(word) else {
        return false;
    };
    let before = text[..start].chars().next_back();
    let after = text[start + word.len()..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}

/// Transformations marking `text` as touched by the `previous` character,
/// strongest first.
pub fn bleed_transformations(previous: Character, text: &str) -> Vec<TextTransformation> {
    let mut transformations = Vec::new();

    if let Some(opening) = first_sentence(text) {
        transformations.push(
            TextTransformation::annotate(
                opening,
                format!("an echo of the {}", previous),
                AnnotationPlacement::Marginal,
            )
            .with_priority(Priority::High),
        );
    }

    transformations.extend(
        motifs(previous)
            .iter()
            .filter(|word| first_occurrence_is_word(text, **word))
            .map(|word| {
                TextTransformation::emphasize(*word, EmphasisStyle::Glitch, 3).with_priority(Priority::Medium)
            }),
    );

    transformations
}

#[cfg(test)]
mod tests {
    use super::*;
    use palimpsest_rules::TransformationKind;

    #[test]
    fn test_annotation_names_previous_character() {
        let transformations =
            bleed_transformations(Character::Algorithm, "The dig site is quiet. A signal hums below.");

        assert_eq!(transformations.len(), 2);
        assert_eq!(transformations[0].selector, "The dig site is quiet.");
        match &transformations[0].kind {
            TransformationKind::Annotate { note, .. } => assert_eq!(note, "an echo of the Algorithm"),
            other => panic!("unexpected kind {:?}", other),
        }
        assert_eq!(transformations[1].selector, "signal");
        assert_eq!(transformations[1].effective_priority(), Priority::Medium);
    }

    #[test]
    fn test_no_motifs_no_emphasis() {
        let transformations = bleed_transformations(Character::LastHuman, "Stone and water.");
        assert_eq!(transformations.len(), 1);
    }

    #[test]
    fn test_motifs_match_whole_words_only() {
        let transformations =
            bleed_transformations(Character::Algorithm, "The database was old. Nobody processed it.");
        assert_eq!(transformations.len(), 1);

        let transformations = bleed_transformations(Character::Algorithm, "Raw data, then a pattern.");
        let selectors: Vec<&str> = transformations[1..].iter().map(|t| t.selector.as_str()).collect();
        assert_eq!(selectors, vec!["data", "pattern"]);
    }

    #[test]
    fn test_empty_text() {
        assert!(bleed_transformations(Character::Archaeologist, "").is_empty());
    }
}
