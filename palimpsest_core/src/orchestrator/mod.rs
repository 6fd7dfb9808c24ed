//! Transformation Orchestrator - one render pass per (node, journey state).
//!
//! A pass selects the variant text, gathers candidate transformations from
//! character bleed, journey patterns and the node's stored rules, applies
//! them to the raw text and checks the result before caching it. Bleed and
//! journey sources are capped individually; each satisfied rule contributes
//! a fixed number of transformations; the applier caps the total.

mod bleed;
mod throttle;

pub use bleed::*;
pub use throttle::*;

use palimpsest_rules::{
    contains_transformation_markup, DisplayContent, NodeId, NodeInstanceState, RawContent, StoreError,
    TextTransformation, TransformationRule,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, warn};

use crate::conditions::ConditionCache;
use crate::config::EngineConfig;
use crate::journey::{journey_transformations, JourneyLedger};
use crate::rules::journey_rule;
use crate::transform::{inspect, sanitize, ContentAnomaly, PriorityBreakdown, TextTransformer};
use crate::variants::{select_variant, SelectionContext, VariantSource, VariantThresholds};

/// Everything a rendered content depends on besides the authored data.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentCacheKey {
    pub node_id: NodeId,
    pub visit_count: u32,
    pub sequence_len: usize,
    pub tag_engagements: u32,
}

impl ContentCacheKey {
    /// Key for `node` at the ledger's current state.
    pub fn new(node: &NodeInstanceState, ledger: &JourneyLedger) -> Self {
        Self {
            node_id: node.id().clone(),
            visit_count: node.visit_count,
            sequence_len: ledger.len(),
            tag_engagements: ledger.total_tag_engagements(),
        }
    }
}

/// The outcome of a render pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedContent {
    pub content: DisplayContent,
    pub variant: VariantSource,
    pub applied: Vec<TextTransformation>,
    pub dropped: usize,
    /// Set when the transformed text was rejected and the base text shown.
    #[serde(skip)]
    pub fallback: Option<ContentAnomaly>,
}

impl RenderedContent {
    /// Applied transformations counted by tier.
    pub fn breakdown(&self) -> PriorityBreakdown {
        PriorityBreakdown::of(&self.applied)
    }
}

/// Bounded FIFO cache of rendered content.
#[derive(Debug, Clone)]
pub struct ContentCache {
    capacity: usize,
    entries: HashMap<ContentCacheKey, RenderedContent>,
    order: VecDeque<ContentCacheKey>,
}

impl ContentCache {
    /// Cache holding at most `capacity` renders, never fewer than one.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn get(&self, key: &ContentCacheKey) -> Option<&RenderedContent> {
        self.entries.get(key)
    }

    /// Store a render, evicting the oldest entry once full.
    pub fn insert(&mut self, key: ContentCacheKey, rendered: RenderedContent) {
        if self.entries.contains_key(&key) {
            self.entries.insert(key, rendered);
            return;
        }
        if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, rendered);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every render of `node_id`, whatever journey state it was keyed to.
    pub fn evict_node(&mut self, node_id: &NodeId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| &key.node_id != node_id);
        self.order.retain(|key| &key.node_id != node_id);
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

/// Runs render passes and owns the caches they share.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    config: EngineConfig,
    transformer: TextTransformer,
    cache: ContentCache,
    conditions: ConditionCache,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Orchestrator {
    /// Orchestrator with empty caches sized from `config`.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            transformer: TextTransformer::new(config.max_transformations),
            cache: ContentCache::new(config.content_cache_capacity),
            conditions: ConditionCache::new(config.condition_cache_capacity),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    pub fn conditions(&self) -> &ConditionCache {
        &self.conditions
    }

    /// The condition cache, for rule promotion.
    pub fn conditions_mut(&mut self) -> &mut ConditionCache {
        &mut self.conditions
    }

    /// Drop every cached render and condition result.
    pub fn clear(&mut self) {
        self.cache.clear();
        self.conditions.clear();
    }

    /// Forget cached renders of one node, after its authored content changed.
    pub fn invalidate(&mut self, node_id: &NodeId) {
        let evicted = self.cache.evict_node(node_id);
        debug!(%node_id, evicted, "render cache invalidated");
    }

    fn selection_context(&self, node: &NodeInstanceState, ledger: &JourneyLedger) -> SelectionContext {
        SelectionContext::from_ledger(node, ledger, self.config.recent_window)
    }

    /// Render the display content for `node` at the current journey state.
    ///
    /// Returns the cached render when nothing it depends on has changed.
    pub fn compute_display_content(
        &mut self,
        node: &NodeInstanceState,
        ledger: &JourneyLedger,
    ) -> Result<RenderedContent, StoreError> {
        let key = ContentCacheKey::new(node, ledger);
        if let Some(cached) = self.cache.get(&key) {
            debug!(node_id = %node.id(), "render cache hit");
            return Ok(cached.clone());
        }

        let content = node
            .content
            .as_ref()
            .ok_or_else(|| StoreError::ContentNotFound(node.id().clone()))?;
        let context = self.selection_context(node, ledger);
        let variant = select_variant(content, &context, &VariantThresholds::from(&self.config));

        if contains_transformation_markup(variant.text) {
            warn!(node_id = %node.id(), "stored text carries transformation markup, showing it sanitized");
            let rendered = RenderedContent {
                content: DisplayContent::new(sanitize(variant.text)),
                variant: variant.source,
                applied: Vec::new(),
                dropped: 0,
                fallback: None,
            };
            self.cache.insert(key, rendered.clone());
            return Ok(rendered);
        }

        let raw = RawContent::new(variant.text)?;
        let candidates = self.gather(node, ledger, &context, raw.as_str());
        let applied = self.transformer.apply(&raw, &candidates);

        let anomaly = inspect(
            applied.content.as_str(),
            raw.as_str(),
            &applied.inserted_texts(),
            self.config.max_markup_depth,
            self.config.min_output_ratio,
        );
        let rendered = match anomaly {
            Some(anomaly) => {
                warn!(node_id = %node.id(), %anomaly, "rendered text rejected, showing base text");
                RenderedContent {
                    content: DisplayContent::untransformed(&raw),
                    variant: variant.source,
                    applied: Vec::new(),
                    dropped: applied.dropped,
                    fallback: Some(anomaly),
                }
            }
            None => RenderedContent {
                content: applied.content,
                variant: variant.source,
                applied: applied.applied,
                dropped: applied.dropped,
                fallback: None,
            },
        };

        debug!(
            node_id = %node.id(),
            visit_count = node.visit_count,
            applied = rendered.applied.len(),
            dropped = rendered.dropped,
            "content rendered"
        );
        self.cache.insert(key, rendered.clone());
        Ok(rendered)
    }

    /// Candidate transformations in gather order: bleed, journey, stored rules.
    fn gather(
        &mut self,
        node: &NodeInstanceState,
        ledger: &JourneyLedger,
        context: &SelectionContext,
        text: &str,
    ) -> Vec<TextTransformation> {
        let mut candidates = Vec::new();

        if let Some(previous) = context.bleeding_from() {
            candidates.extend(
                bleed_transformations(previous, text)
                    .into_iter()
                    .take(self.config.bleed_limit),
            );
        }

        candidates.extend(
            journey_transformations(&context.patterns, ledger, node, text)
                .into_iter()
                .take(self.config.journey_limit),
        );

        for rule in &node.transformations {
            if self.conditions.evaluate(&rule.condition, ledger, node) {
                candidates.extend(
                    rule.transformations
                        .iter()
                        .take(self.config.transformations_per_rule)
                        .cloned(),
                );
            }
        }

        candidates
    }

    /// A journey-derived rule for the node's current text, if the recent
    /// journey shows a pattern.
    pub fn journey_rule_for(&self, node: &NodeInstanceState, ledger: &JourneyLedger) -> Option<TransformationRule> {
        let content = node.content.as_ref()?;
        let context = self.selection_context(node, ledger);
        if context.patterns.is_empty() {
            return None;
        }
        let variant = select_variant(content, &context, &VariantThresholds::from(&self.config));
        let transformations = journey_transformations(&context.patterns, ledger, node, variant.text);
        journey_rule(ledger, self.config.recent_window, transformations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palimpsest_rules::{
        AnnotationPlacement, Character, EmphasisStyle, EnhancedContent, Node, NodeStore, Priority,
        TransformationCondition, TransformationRule,
    };

    const DISCOVERY: &str = "The dig uncovered a sealed chamber. Inside, the data still hummed.";

    struct Fixture {
        store: NodeStore,
        ledger: JourneyLedger,
    }

    impl Fixture {
        fn new() -> Self {
            let mut store = NodeStore::from_nodes([
                Node::new("arch-discovery", "Discovery", Character::Archaeologist).with_temporal_value(2),
                Node::new("algo-awakening", "Awakening", Character::Algorithm).with_temporal_value(5),
            ]);
            store
                .set_content(&NodeId::from("arch-discovery"), EnhancedContent::new(DISCOVERY))
                .unwrap();
            store
                .set_content(
                    &NodeId::from("algo-awakening"),
                    EnhancedContent::new("A process woke. It counted the silence."),
                )
                .unwrap();
            Self {
                store,
                ledger: JourneyLedger::new(),
            }
        }

        fn visit(&mut self, id: &str) -> NodeId {
            let id = NodeId::from(id);
            self.store.visit(&id).unwrap();
            let node = self.store.get(&id).unwrap();
            self.ledger.record_visit(&id, node.character(), node.node.temporal_value);
            id
        }

        fn node(&self, id: &NodeId) -> &NodeInstanceState {
            self.store.get(id).unwrap()
        }
    }

    #[test]
    fn test_first_visit_is_untransformed() {
        let mut fixture = Fixture::new();
        let id = fixture.visit("arch-discovery");
        let mut orchestrator = Orchestrator::default();

        let rendered = orchestrator.compute_display_content(fixture.node(&id), &fixture.ledger).unwrap();
        assert_eq!(rendered.content.as_str(), DISCOVERY);
        assert_eq!(rendered.variant, VariantSource::Base);
    }

    #[test]
    fn test_repeated_render_is_cached_and_identical() {
        let mut fixture = Fixture::new();
        fixture.visit("arch-discovery");
        let id = fixture.visit("algo-awakening");
        let mut orchestrator = Orchestrator::default();

        let first = orchestrator.compute_display_content(fixture.node(&id), &fixture.ledger).unwrap();
        let second = orchestrator.compute_display_content(fixture.node(&id), &fixture.ledger).unwrap();
        assert_eq!(first, second);
        assert_eq!(orchestrator.cache().len(), 1);
    }

    #[test]
    fn test_bleed_from_previous_character() {
        let mut fixture = Fixture::new();
        fixture.visit("algo-awakening");
        let id = fixture.visit("arch-discovery");
        let mut orchestrator = Orchestrator::default();

        let rendered = orchestrator.compute_display_content(fixture.node(&id), &fixture.ledger).unwrap();
        assert!(rendered.content.as_str().contains("an echo of the Algorithm"));
        assert!(rendered.content.as_str().contains("emphasis-glitch"));
        assert_eq!(sanitize(rendered.content.as_str()), DISCOVERY);
    }

    #[test]
    fn test_stored_rules_contribute_once_satisfied() {
        let mut fixture = Fixture::new();
        let id = fixture.visit("arch-discovery");
        fixture
            .store
            .add_rule_if_absent(
                &id,
                TransformationRule::new(
                    TransformationCondition::MinVisits(2),
                    vec![
                        TextTransformation::replace("sealed", "breached"),
                        TextTransformation::replace("chamber", "vault"),
                    ],
                ),
            )
            .unwrap();
        let mut orchestrator = Orchestrator::default();

        let rendered = orchestrator.compute_display_content(fixture.node(&id), &fixture.ledger).unwrap();
        assert!(rendered.applied.is_empty());

        fixture.visit("arch-discovery");
        let rendered = orchestrator.compute_display_content(fixture.node(&id), &fixture.ledger).unwrap();
        assert!(rendered.content.as_str().contains(">breached</span>"));
        assert!(!rendered.content.as_str().contains(">vault</span>"));
    }

    #[test]
    fn test_contaminated_text_is_sanitized_not_transformed() {
        let mut fixture = Fixture::new();
        let id = NodeId::from("arch-discovery");
        fixture
            .store
            .set_content(
                &id,
                EnhancedContent::new(
                    "The <span data-transform=\"replace\" class=\"replacement\" data-original=\"dig\">wound</span> waited.",
                ),
            )
            .unwrap();
        fixture.visit("algo-awakening");
        fixture.visit("arch-discovery");
        let mut orchestrator = Orchestrator::default();

        let rendered = orchestrator.compute_display_content(fixture.node(&id), &fixture.ledger).unwrap();
        assert_eq!(rendered.content.as_str(), "The dig waited.");
        assert!(rendered.applied.is_empty());
    }

    #[test]
    fn test_missing_content_is_an_error() {
        let mut store = NodeStore::from_nodes([Node::new("bare", "Bare", Character::LastHuman)]);
        let id = NodeId::from("bare");
        store.visit(&id).unwrap();
        let result = Orchestrator::default().compute_display_content(store.get(&id).unwrap(), &JourneyLedger::new());
        assert!(matches!(result, Err(StoreError::ContentNotFound(_))));
    }

    #[test]
    fn test_journey_rule_needs_a_pattern() {
        let mut fixture = Fixture::new();
        let orchestrator = Orchestrator::default();
        let id = fixture.visit("arch-discovery");
        assert!(orchestrator.journey_rule_for(fixture.node(&id), &fixture.ledger).is_none());

        fixture.visit("algo-awakening");
        let id = fixture.visit("arch-discovery");
        let rule = orchestrator.journey_rule_for(fixture.node(&id), &fixture.ledger).unwrap();
        assert_eq!(
            rule.condition,
            TransformationCondition::journey_pattern(["arch-discovery", "algo-awakening", "arch-discovery"])
        );
    }

    #[test]
    fn test_authored_placeholder_words_are_kept() {
        let mut fixture = Fixture::new();
        let id = fixture.visit("arch-discovery");
        fixture
            .store
            .add_rule_if_absent(
                &id,
                TransformationRule::new(
                    TransformationCondition::MinVisits(1),
                    vec![TextTransformation::annotate(
                        "chamber",
                        "its purpose undefined",
                        AnnotationPlacement::Inline,
                    )],
                ),
            )
            .unwrap();
        let mut orchestrator = Orchestrator::default();

        let rendered = orchestrator.compute_display_content(fixture.node(&id), &fixture.ledger).unwrap();
        assert_eq!(rendered.fallback, None);
        assert_eq!(rendered.applied.len(), 1);
        assert!(rendered.content.as_str().contains("[its purpose undefined]"));
    }

    #[test]
    fn test_rejected_render_falls_back_to_base_text() {
        let mut fixture = Fixture::new();
        let id = fixture.visit("arch-discovery");
        fixture
            .store
            .add_rule_if_absent(
                &id,
                TransformationRule::new(
                    TransformationCondition::MinVisits(1),
                    vec![
                        TextTransformation::emphasize("The dig uncovered a sealed chamber.", EmphasisStyle::Fade, 2),
                        TextTransformation::emphasize("sealed", EmphasisStyle::Bold, 2),
                    ],
                ),
            )
            .unwrap();
        let mut orchestrator = Orchestrator::new(EngineConfig {
            max_markup_depth: 1,
            transformations_per_rule: 2,
            ..EngineConfig::default()
        });

        let rendered = orchestrator.compute_display_content(fixture.node(&id), &fixture.ledger).unwrap();
        assert_eq!(rendered.fallback, Some(ContentAnomaly::ExcessiveNesting(2)));
        assert_eq!(rendered.content.as_str(), DISCOVERY);
        assert!(rendered.applied.is_empty());
        assert!(!rendered.content.is_transformed());

        // The fallback is cached like any other render.
        let again = orchestrator.compute_display_content(fixture.node(&id), &fixture.ledger).unwrap();
        assert_eq!(again, rendered);
    }

    #[test]
    fn test_all_sources_together_are_capped() {
        let mut fixture = Fixture::new();
        fixture.visit("arch-discovery");
        fixture.visit("algo-awakening");
        let id = fixture.visit("arch-discovery");
        let rules = [
            (TransformationCondition::MinVisits(1), TextTransformation::replace("Inside", "Within")),
            (TransformationCondition::MinVisits(2), TextTransformation::replace("hummed", "sang")),
            (TransformationCondition::CharacterBleed, TextTransformation::replace("still", "yet")),
            (
                TransformationCondition::previously_visited(["algo-awakening"]),
                TextTransformation::replace("sealed", "breached"),
            ),
            (
                TransformationCondition::EndpointProgress { min_distinct_nodes: 2 },
                TextTransformation::replace("chamber", "vault"),
            ),
        ];
        for (condition, transformation) in rules {
            assert!(fixture
                .store
                .add_rule_if_absent(&id, TransformationRule::new(condition, vec![transformation]))
                .unwrap());
        }
        let mut orchestrator = Orchestrator::default();

        let rendered = orchestrator.compute_display_content(fixture.node(&id), &fixture.ledger).unwrap();
        assert_eq!(rendered.fallback, None);
        assert_eq!(rendered.applied.len(), orchestrator.config().max_transformations);
        assert!(rendered.dropped > 0);
        // The bleed annotation is the only high priority candidate and always survives the cap.
        assert_eq!(rendered.applied[0].effective_priority(), Priority::High);
        assert_eq!(rendered.breakdown().high, 1);
        assert!(rendered.content.as_str().contains("an echo of the Algorithm"));
    }

    #[test]
    fn test_invalidate_drops_only_that_node() {
        let mut fixture = Fixture::new();
        let discovery = fixture.visit("arch-discovery");
        let awakening = fixture.visit("algo-awakening");
        let mut orchestrator = Orchestrator::default();
        orchestrator.compute_display_content(fixture.node(&discovery), &fixture.ledger).unwrap();
        orchestrator.compute_display_content(fixture.node(&awakening), &fixture.ledger).unwrap();
        assert_eq!(orchestrator.cache().len(), 2);

        orchestrator.invalidate(&discovery);
        assert_eq!(orchestrator.cache().len(), 1);
        let key = ContentCacheKey::new(fixture.node(&awakening), &fixture.ledger);
        assert!(orchestrator.cache().get(&key).is_some());
    }

    #[test]
    fn test_content_cache_evicts_oldest() {
        let mut cache = ContentCache::new(2);
        let rendered = RenderedContent {
            content: DisplayContent::new("x"),
            variant: VariantSource::Base,
            applied: Vec::new(),
            dropped: 0,
            fallback: None,
        };
        let key = |n: u32| ContentCacheKey {
            node_id: NodeId::from("a"),
            visit_count: n,
            sequence_len: n as usize,
            tag_engagements: 0,
        };

        cache.insert(key(1), rendered.clone());
        cache.insert(key(2), rendered.clone());
        cache.insert(key(3), rendered);
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&key(1)).is_none());
        assert!(cache.get(&key(3)).is_some());
    }
}
