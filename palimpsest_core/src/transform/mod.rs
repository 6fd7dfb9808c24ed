//! Text Transformation Applier - turns base text plus edits into display text.
//!
//! The pipeline always starts from `RawContent`, the untransformed base, so the
//! same inputs always produce byte-identical output. Edits are prepared first:
//! 1. **Deduplicate** by (type, selector), keeping the first seen
//! 2. **Order** by tier (immediate, high, medium, low), stable within a tier
//! 3. **Cap** to a fixed maximum, reporting what was dropped
//!
//! and then applied one after another. Selectors only match authored text,
//! never text inside markup inserted by an earlier edit.

mod fragment;
mod markup;
mod selectors;

pub use fragment::*;
pub use markup::{inspect, markup_depth, sanitize, ContentAnomaly};
pub use selectors::*;

use palimpsest_rules::{
    AnnotationPlacement, DisplayContent, ExpansionPlacement, FragmentStyle, Priority, RawContent,
    TextTransformation, TransformationKind, TransformationType,
};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, warn};

use markup::{escape_text, find_all_unprotected, find_unprotected, Element};

/// Maximum number of transformations applied in one pass by default.
pub const DEFAULT_MAX_TRANSFORMATIONS: usize = 4;

/// Emphasis markers kept around a replacement, longest first.
const EMPHASIS_MARKERS: [&str; 4] = ["**", "__", "*", "_"];

/// Transformations ready to apply, with bookkeeping on what was removed.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedTransformations {
    pub transformations: Vec<TextTransformation>,
    /// Candidates collapsed into an earlier one with the same (type, selector).
    pub duplicates: usize,
    /// Candidates cut by the cap.
    pub dropped: usize,
}

/// Deduplicate, order and cap candidate transformations.
pub fn prepare(candidates: impl IntoIterator<Item = TextTransformation>, max: usize) -> PreparedTransformations {
    let mut seen: HashSet<(TransformationType, String)> = HashSet::new();
    let mut unique = Vec::new();
    let mut duplicates = 0;

    for candidate in candidates {
        if seen.insert((candidate.transformation_type(), candidate.selector.clone())) {
            unique.push(candidate);
        } else {
            duplicates += 1;
        }
    }

    unique.sort_by_key(TextTransformation::tier);

    let dropped = unique.len().saturating_sub(max);
    if dropped > 0 {
        warn!(
            dropped,
            max,
            candidates = unique.len(),
            "transformation cap reached, lowest priority transformations dropped"
        );
        unique.truncate(max);
    }

    PreparedTransformations {
        transformations: unique,
        duplicates,
        dropped,
    }
}

/// Applied transformations counted by tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PriorityBreakdown {
    pub immediate: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl PriorityBreakdown {
    /// Count `transformations` by the tier they were ordered in.
    pub fn of(transformations: &[TextTransformation]) -> Self {
        let mut breakdown = Self::default();
        for t in transformations {
            if t.apply_immediately {
                breakdown.immediate += 1;
                continue;
            }
            match t.effective_priority() {
                Priority::High => breakdown.high += 1,
                Priority::Medium => breakdown.medium += 1,
                Priority::Low => breakdown.low += 1,
            }
        }
        breakdown
    }

    /// Sum across all tiers.
    pub fn total(&self) -> usize {
        self.immediate + self.high + self.medium + self.low
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// The result of one application pass.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedContent {
    pub content: DisplayContent,
    /// Transformations that changed the text, in application order.
    pub applied: Vec<TextTransformation>,
    /// Prepared transformations whose selector was not found.
    pub unmatched: Vec<TextTransformation>,
    pub duplicates: usize,
    pub dropped: usize,
}

impl AppliedContent {
    pub fn breakdown(&self) -> PriorityBreakdown {
        PriorityBreakdown::of(&self.applied)
    }

    /// The authored texts the applied transformations wrote into the output.
    pub fn inserted_texts(&self) -> Vec<&str> {
        self.applied
            .iter()
            .filter_map(|t| match &t.kind {
                TransformationKind::Replace { replacement, .. } => Some(replacement.as_str()),
                TransformationKind::Expand { text, .. } => Some(text.as_str()),
                TransformationKind::Annotate { note, .. } => Some(note.as_str()),
                TransformationKind::Fragment { .. } | TransformationKind::Emphasize { .. } => None,
            })
            .collect()
    }
}

/// Applies prepared transformations to raw content.
#[derive(Debug, Clone, Copy)]
pub struct TextTransformer {
    max_transformations: usize,
}

impl Default for TextTransformer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TRANSFORMATIONS)
    }
}

impl TextTransformer {
    /// Transformer applying at most `max_transformations` per pass.
    pub fn new(max_transformations: usize) -> Self {
        Self { max_transformations }
    }

    /// Upper bound on transformations applied in one pass.
    pub fn max_transformations(&self) -> usize {
        self.max_transformations
    }

    /// Apply `candidates` to `base`. Pure: equal inputs give equal outputs.
    pub fn apply(&self, base: &RawContent, candidates: &[TextTransformation]) -> AppliedContent {
        let prepared = prepare(candidates.iter().cloned(), self.max_transformations);
        let mut working = base.as_str().to_string();
        let mut applied = Vec::new();
        let mut unmatched = Vec::new();

        for transformation in prepared.transformations {
            match apply_one(&working, &transformation, base) {
                Some(next) => {
                    working = next;
                    applied.push(transformation);
                }
                None => {
                    debug!(selector = %transformation.selector, "selector not found, transformation skipped");
                    unmatched.push(transformation);
                }
            }
        }

        AppliedContent {
            content: DisplayContent::new(working),
            applied,
            unmatched,
            duplicates: prepared.duplicates,
            dropped: prepared.dropped,
        }
    }
}

fn fragment_class(style: FragmentStyle) -> &'static str {
    match style {
        FragmentStyle::Character => "fragment-character",
        FragmentStyle::Word => "fragment-word",
        FragmentStyle::Progressive => "fragment-progressive",
        FragmentStyle::Glitch => "fragment-glitch",
    }
}

fn expansion_class(placement: ExpansionPlacement) -> &'static str {
    match placement {
        ExpansionPlacement::Append => "expand-append",
        ExpansionPlacement::Inline => "expand-inline",
        ExpansionPlacement::Paragraph => "expand-paragraph",
        ExpansionPlacement::Reveal => "expand-reveal",
    }
}

fn emphasis_marker(selector: &str) -> Option<&'static str> {
    EMPHASIS_MARKERS.iter().copied().find(|marker| {
        selector.len() > marker.len() * 2 && selector.starts_with(marker) && selector.ends_with(marker)
    })
}

/// End of the paragraph containing `from`, before any trailing whitespace.
fn paragraph_end(text: &str, from: usize) -> usize {
    let end = text[from..]
        .find("\n\n")
        .map_or(text.len(), |offset| from + offset);
    text[..end].trim_end().len().max(from)
}

fn insert_at(text: &str, at: usize, insertion: &str) -> String {
    let mut out = String::with_capacity(text.len() + insertion.len());
    out.push_str(&text[..at]);
    out.push_str(insertion);
    out.push_str(&text[at..]);
    out
}

fn replace_range(text: &str, at: usize, len: usize, replacement: &str) -> String {
    let mut out = String::with_capacity(text.len() + replacement.len());
    out.push_str(&text[..at]);
    out.push_str(replacement);
    out.push_str(&text[at + len..]);
    out
}

/// Apply one transformation to the working text, or `None` if its selector
/// does not occur in authored text.
fn apply_one(working: &str, transformation: &TextTransformation, base: &RawContent) -> Option<String> {
    let selector = transformation.selector.as_str();
    let end_of = |at: usize| at + selector.len();

    match &transformation.kind {
        TransformationKind::Replace {
            replacement,
            replace_all,
            preserve_emphasis,
        } => {
            let positions = if *replace_all {
                find_all_unprotected(working, selector)
            } else {
                find_unprotected(working, selector).into_iter().collect()
            };
            if positions.is_empty() {
                return None;
            }

            let replacement = match emphasis_marker(selector).filter(|_| *preserve_emphasis) {
                Some(marker) if !replacement.starts_with(marker) => {
                    format!("{}{}{}", marker, replacement, marker)
                }
                _ => replacement.clone(),
            };
            let element = Element::new("replace", "replacement")
                .original(selector)
                .render(&escape_text(&replacement));

            let mut out = working.to_string();
            for at in positions.into_iter().rev() {
                out = replace_range(&out, at, selector.len(), &element);
            }
            Some(out)
        }

        TransformationKind::Fragment { style, pattern } => {
            let at = find_unprotected(working, selector)?;
            let seed = fragment_seed(base.as_str(), selector);
            let fragmented = fragment_text(selector, *style, pattern, seed);
            let element = Element::new("fragment", fragment_class(*style))
                .original(selector)
                .render(&escape_text(&fragmented));
            Some(replace_range(working, at, selector.len(), &element))
        }

        TransformationKind::Expand { text, placement } => {
            let at = find_unprotected(working, selector)?;
            let mut element = Element::new("expand", expansion_class(*placement)).added();
            if *placement == ExpansionPlacement::Reveal {
                element = element.hidden();
            }
            let rendered = element.render(&escape_text(text));

            Some(match placement {
                ExpansionPlacement::Inline | ExpansionPlacement::Reveal => {
                    insert_at(working, end_of(at), &format!(" {}", rendered))
                }
                ExpansionPlacement::Append => {
                    insert_at(working, paragraph_end(working, end_of(at)), &format!(" {}", rendered))
                }
                ExpansionPlacement::Paragraph => {
                    insert_at(working, paragraph_end(working, end_of(at)), &format!("\n\n{}", rendered))
                }
            })
        }

        TransformationKind::Emphasize { style, intensity } => {
            let at = find_unprotected(working, selector)?;
            let class = format!("emphasis-{} intensity-{}", style.as_str(), intensity.value());
            let element = Element::new("emphasize", class).render(selector);
            Some(replace_range(working, at, selector.len(), &element))
        }

        TransformationKind::Annotate { note, placement } => {
            let at = find_unprotected(working, selector)?;
            let note = escape_text(note);

            Some(match placement {
                AnnotationPlacement::Inline => {
                    let element = Element::new("annotate", "annotation-inline")
                        .added()
                        .render(&format!("[{}]", note));
                    insert_at(working, end_of(at), &format!(" {}", element))
                }
                AnnotationPlacement::Marginal => {
                    let element = Element::new("annotate", "annotation-marginal").added().render(&note);
                    insert_at(working, end_of(at), &element)
                }
                AnnotationPlacement::Interlinear => {
                    let gloss = Element::new("annotate", "gloss").added().render(&note);
                    let element = Element::new("annotate", "annotation-interlinear")
                        .render(&format!("{}{}", selector, gloss));
                    replace_range(working, at, selector.len(), &element)
                }
                AnnotationPlacement::Footnote => {
                    let number = working.matches("class=\"footnote\"").count() + 1;
                    let reference = Element::new("annotate", "footnote-ref")
                        .added()
                        .render(&format!("[{}]", number));
                    let body = Element::new("annotate", "footnote")
                        .added()
                        .render(&format!("[{}] {}", number, note));
                    let marked = insert_at(working, end_of(at), &reference);
                    format!("{}\n\n{}", marked.trim_end(), body)
                }
            })
        }
    }
}
