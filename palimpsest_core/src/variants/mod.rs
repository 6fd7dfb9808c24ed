//! Content Variant Selector - chooses which authored text a node shows.
//!
//! Sources are tried in a fixed priority order and the first one with an
//! authored section wins:
//!
//! 1. `after-<character>` when arriving from a different character
//! 2. `recursive-awareness` when the reader keeps circling back
//! 3. `journey-*` sections for patterns in the recent journey
//! 4. `tag-<tag>` for sufficiently engaged tags
//! 5. the visit-count variant with the largest key not above the visit count
//! 6. the base text
//!
//! Legacy content, which carries visit-count variants only, goes straight
//! to steps 5 and 6.

use palimpsest_rules::{Character, EnhancedContent, NodeInstanceState};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::journey::{detect_patterns, JourneyLedger, JourneyPatternKind};

/// Section shown once recursive awareness passes its threshold.
pub const RECURSIVE_AWARENESS_SECTION: &str = "recursive-awareness";

/// Section key for a tag variant.
pub fn tag_section(tag: &str) -> String {
    format!("tag-{}", tag)
}

/// Configured thresholds for the engagement-driven variants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariantThresholds {
    pub recursive_awareness: f64,
    pub tag_engagement: u32,
}

impl Default for VariantThresholds {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for VariantThresholds {
    fn from(config: &EngineConfig) -> Self {
        Self {
            recursive_awareness: config.recursive_awareness_threshold,
            tag_engagement: config.tag_engagement_threshold,
        }
    }
}

/// The signals the selector looks at, captured from the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionContext {
    pub visit_count: u32,
    pub current_character: Character,
    pub previous_character: Option<Character>,
    pub patterns: Vec<JourneyPatternKind>,
    /// Engaged tags, highest count first, ties by name.
    pub tag_engagement: Vec<(String, u32)>,
    pub recursive_awareness: f64,
}

impl SelectionContext {
    /// Capture the signals for `node` from the ledger's current state.
    pub fn from_ledger(node: &NodeInstanceState, ledger: &JourneyLedger, window: usize) -> Self {
        let mut tag_engagement: Vec<(String, u32)> = ledger
            .tag_engagements()
            .iter()
            .map(|(tag, count)| (tag.clone(), *count))
            .collect();
        // Stable sort over a name-ordered map keeps ties alphabetical.
        tag_engagement.sort_by(|a, b| b.1.cmp(&a.1));

        Self {
            visit_count: node.visit_count,
            current_character: node.character(),
            previous_character: ledger.character_of_previous_visit(),
            patterns: detect_patterns(ledger, window),
            tag_engagement,
            recursive_awareness: ledger.recursive_awareness(),
        }
    }

    /// The character being bled from, if the reader just switched voices.
    pub fn bleeding_from(&self) -> Option<Character> {
        self.previous_character
            .filter(|previous| *previous != self.current_character)
    }
}

/// Where the selected text came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariantSource {
    CharacterBleed(Character),
    RecursiveAwareness,
    JourneyPattern(JourneyPatternKind),
    TagEngagement(String),
    VisitCount(u32),
    Base,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectedVariant<'a> {
    pub text: &'a str,
    pub source: VariantSource,
}

/// Pick the text `content` shows in `context`. Always returns a text; the
/// base text is the last resort.
pub fn select_variant<'a>(
    content: &'a EnhancedContent,
    context: &SelectionContext,
    thresholds: &VariantThresholds,
) -> SelectedVariant<'a> {
    if !content.is_legacy() {
        if let Some(selected) = select_section(content, context, thresholds) {
            return selected;
        }
    }

    if let Some((count, text)) = content.visit_variant_entry(context.visit_count) {
        return SelectedVariant {
            text,
            source: VariantSource::VisitCount(count),
        };
    }

    SelectedVariant {
        text: &content.base,
        source: VariantSource::Base,
    }
}

fn select_section<'a>(
    content: &'a EnhancedContent,
    context: &SelectionContext,
    thresholds: &VariantThresholds,
) -> Option<SelectedVariant<'a>> {
    let found = |key: &str, source: VariantSource| {
        content
            .section(key)
            .map(|text| SelectedVariant { text, source })
    };

    if let Some(previous) = context.bleeding_from() {
        if let Some(selected) = found(&previous.bleed_section(), VariantSource::CharacterBleed(previous)) {
            return Some(selected);
        }
    }

    if context.recursive_awareness > thresholds.recursive_awareness {
        if let Some(selected) = found(RECURSIVE_AWARENESS_SECTION, VariantSource::RecursiveAwareness) {
            return Some(selected);
        }
    }

    for pattern in &context.patterns {
        if let Some(selected) = found(pattern.section_key(), VariantSource::JourneyPattern(*pattern)) {
            return Some(selected);
        }
    }

    context
        .tag_engagement
        .iter()
        .filter(|(_, count)| *count >= thresholds.tag_engagement)
        .find_map(|(tag, _)| found(&tag_section(tag), VariantSource::TagEngagement(tag.clone())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use palimpsest_rules::Node;

    fn context(visit_count: u32) -> SelectionContext {
        SelectionContext {
            visit_count,
            current_character: Character::Archaeologist,
            previous_character: None,
            patterns: Vec::new(),
            tag_engagement: Vec::new(),
            recursive_awareness: 0.0,
        }
    }

    fn layered() -> EnhancedContent {
        EnhancedContent::new("base")
            .with_visit_variant(1, "first")
            .with_visit_variant(3, "third")
            .with_section("after-algorithm", "bleed")
            .with_section(RECURSIVE_AWARENESS_SECTION, "aware")
            .with_section("journey-revisitation", "again")
            .with_section("tag-memory", "memory")
    }

    #[test]
    fn test_bleed_beats_visit_variant() {
        let content = layered();
        let mut ctx = context(3);
        ctx.previous_character = Some(Character::Algorithm);

        let selected = select_variant(&content, &ctx, &VariantThresholds::default());
        assert_eq!(selected.text, "bleed");
        assert_eq!(selected.source, VariantSource::CharacterBleed(Character::Algorithm));
    }

    #[test]
    fn test_same_character_is_not_bleed() {
        let content = layered();
        let mut ctx = context(2);
        ctx.previous_character = Some(Character::Archaeologist);

        let selected = select_variant(&content, &ctx, &VariantThresholds::default());
        assert_eq!(selected.source, VariantSource::VisitCount(1));
    }

    #[test]
    fn test_priority_order_below_bleed() {
        let content = layered();
        let thresholds = VariantThresholds::default();

        let mut ctx = context(4);
        ctx.recursive_awareness = 0.75;
        ctx.patterns = vec![JourneyPatternKind::Revisitation];
        ctx.tag_engagement = vec![("memory".into(), 5)];
        assert_eq!(select_variant(&content, &ctx, &thresholds).text, "aware");

        ctx.recursive_awareness = 0.5;
        assert_eq!(select_variant(&content, &ctx, &thresholds).text, "again");

        ctx.patterns.clear();
        assert_eq!(select_variant(&content, &ctx, &thresholds).text, "memory");

        ctx.tag_engagement = vec![("memory".into(), 2)];
        assert_eq!(select_variant(&content, &ctx, &thresholds).text, "third");
    }

    #[test]
    fn test_missing_sections_fall_through() {
        let content = EnhancedContent::new("base").with_section("tag-other", "other");
        let mut ctx = context(0);
        ctx.previous_character = Some(Character::LastHuman);
        ctx.patterns = vec![JourneyPatternKind::CharacterLoop];

        let selected = select_variant(&content, &ctx, &VariantThresholds::default());
        assert_eq!(selected.text, "base");
        assert_eq!(selected.source, VariantSource::Base);
    }

    #[test]
    fn test_legacy_content_uses_visit_counts_only() {
        let content = EnhancedContent::from_visit_variants(
            [(1, "one".to_string()), (3, "three".to_string())].into_iter().collect(),
        );
        let mut ctx = context(5);
        ctx.previous_character = Some(Character::Algorithm);
        ctx.recursive_awareness = 1.0;

        assert_eq!(select_variant(&content, &ctx, &VariantThresholds::default()).text, "three");
        assert_eq!(select_variant(&content, &context(2), &VariantThresholds::default()).text, "one");
        assert_eq!(select_variant(&content, &context(0), &VariantThresholds::default()).text, "one");
    }

    #[test]
    fn test_tag_ties_resolve_by_name() {
        let content = EnhancedContent::new("base")
            .with_section("tag-alpha", "alpha")
            .with_section("tag-beta", "beta");

        let mut ledger = JourneyLedger::new();
        let node = NodeInstanceState::new(Node::new("n", "N", Character::Algorithm));
        for tag in ["beta", "alpha", "beta", "alpha", "beta", "alpha"] {
            ledger.record_tag_engagement(tag);
        }

        let ctx = SelectionContext::from_ledger(&node, &ledger, 3);
        assert_eq!(ctx.tag_engagement[0].0, "alpha");
        assert_eq!(select_variant(&content, &ctx, &VariantThresholds::default()).text, "alpha");
    }
}
