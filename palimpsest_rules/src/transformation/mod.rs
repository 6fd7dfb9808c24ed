//! The transformation vocabulary: conditions, text edits and the rules pairing them.
//!
//! Everything here is plain data. Evaluation and application live in
//! `palimpsest_core`.

mod condition;
mod rule;

pub use condition::*;
pub use rule::*;

use serde::{Deserialize, Serialize};

/// Priority tier of a transformation. Higher tiers are applied first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Sort rank, lowest first.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }
}

/// How the fragmentation pattern interrupts the selected text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FragmentStyle {
    /// Pattern between every character.
    Character,
    /// Pattern between words.
    Word,
    /// Pattern repeated more often towards the end of the selection.
    Progressive,
    /// Pattern at seeded pseudo-random word boundaries.
    Glitch,
}

/// Visual style of an emphasis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EmphasisStyle {
    Italic,
    Bold,
    Color,
    Spacing,
    Highlight,
    Glitch,
    Fade,
}

impl EmphasisStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmphasisStyle::Italic => "italic",
            EmphasisStyle::Bold => "bold",
            EmphasisStyle::Color => "color",
            EmphasisStyle::Spacing => "spacing",
            EmphasisStyle::Highlight => "highlight",
            EmphasisStyle::Glitch => "glitch",
            EmphasisStyle::Fade => "fade",
        }
    }
}

/// Emphasis weight from 1 (subtle) to 5 (overwhelming).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Intensity(u8);

impl Intensity {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Create an intensity, clamped into `1..=5`.
    pub fn new(value: u8) -> Self {
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl Default for Intensity {
    fn default() -> Self {
        Self(2)
    }
}

impl TryFrom<u8> for Intensity {
    type Error = std::convert::Infallible;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(Self::new(value))
    }
}

impl From<Intensity> for u8 {
    fn from(intensity: Intensity) -> Self {
        intensity.0
    }
}

/// Where expansion text is inserted relative to the selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExpansionPlacement {
    /// At the end of the paragraph containing the selector.
    Append,
    /// Directly after the selector.
    Inline,
    /// As a new paragraph after the one containing the selector.
    Paragraph,
    /// Directly after the selector, hidden until the reader reveals it.
    Reveal,
}

/// Where an annotation is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnnotationPlacement {
    Inline,
    Footnote,
    Marginal,
    Interlinear,
}

/// Discriminant of a [`TransformationKind`], used for deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformationType {
    Replace,
    Fragment,
    Expand,
    Emphasize,
    Annotate,
}

impl TransformationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformationType::Replace => "replace",
            TransformationType::Fragment => "fragment",
            TransformationType::Expand => "expand",
            TransformationType::Emphasize => "emphasize",
            TransformationType::Annotate => "annotate",
        }
    }
}

/// The edit a transformation performs, with its variant-specific parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TransformationKind {
    Replace {
        replacement: String,
        #[serde(default)]
        replace_all: bool,
        #[serde(default)]
        preserve_emphasis: bool,
    },
    Fragment {
        style: FragmentStyle,
        pattern: String,
    },
    Expand {
        text: String,
        placement: ExpansionPlacement,
    },
    Emphasize {
        style: EmphasisStyle,
        #[serde(default)]
        intensity: Intensity,
    },
    Annotate {
        note: String,
        placement: AnnotationPlacement,
    },
}

/// A single text-level edit located by a selector substring.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextTransformation {
    pub selector: String,

    #[serde(flatten)]
    pub kind: TransformationKind,

    #[serde(default)]
    pub priority: Option<Priority>,

    /// Jump ahead of every priority tier.
    #[serde(default)]
    pub apply_immediately: bool,
}

impl TextTransformation {
    fn with_kind(selector: impl Into<String>, kind: TransformationKind) -> Self {
        Self {
            selector: selector.into(),
            kind,
            priority: None,
            apply_immediately: false,
        }
    }

    /// Replace the first occurrence of `selector`.
    pub fn replace(selector: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self::with_kind(
            selector,
            TransformationKind::Replace {
                replacement: replacement.into(),
                replace_all: false,
                preserve_emphasis: false,
            },
        )
    }

    /// Interrupt the first occurrence of `selector` with `pattern`.
    pub fn fragment(selector: impl Into<String>, style: FragmentStyle, pattern: impl Into<String>) -> Self {
        Self::with_kind(
            selector,
            TransformationKind::Fragment {
                style,
                pattern: pattern.into(),
            },
        )
    }

    /// Insert `text` relative to the first occurrence of `selector`.
    pub fn expand(
        selector: impl Into<String>,
        text: impl Into<String>,
        placement: ExpansionPlacement,
    ) -> Self {
        Self::with_kind(
            selector,
            TransformationKind::Expand {
                text: text.into(),
                placement,
            },
        )
    }

    /// Wrap the first occurrence of `selector`. Intensity is clamped.
    pub fn emphasize(selector: impl Into<String>, style: EmphasisStyle, intensity: u8) -> Self {
        Self::with_kind(
            selector,
            TransformationKind::Emphasize {
                style,
                intensity: Intensity::new(intensity),
            },
        )
    }

    /// Attach `note` to the first occurrence of `selector`.
    pub fn annotate(
        selector: impl Into<String>,
        note: impl Into<String>,
        placement: AnnotationPlacement,
    ) -> Self {
        Self::with_kind(
            selector,
            TransformationKind::Annotate {
                note: note.into(),
                placement,
            },
        )
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Apply ahead of every priority tier.
    pub fn immediately(mut self) -> Self {
        self.apply_immediately = true;
        self
    }

    /// For replacements, substitute every match rather than the first.
    pub fn all_matches(mut self) -> Self {
        if let TransformationKind::Replace { replace_all, .. } = &mut self.kind {
            *replace_all = true;
        }
        self
    }

    /// For replacements, keep emphasis markers wrapped around the selector.
    pub fn keeping_emphasis(mut self) -> Self {
        if let TransformationKind::Replace {
            preserve_emphasis, ..
        } = &mut self.kind
        {
            *preserve_emphasis = true;
        }
        self
    }

    pub fn transformation_type(&self) -> TransformationType {
        match self.kind {
            TransformationKind::Replace { .. } => TransformationType::Replace,
            TransformationKind::Fragment { .. } => TransformationType::Fragment,
            TransformationKind::Expand { .. } => TransformationType::Expand,
            TransformationKind::Emphasize { .. } => TransformationType::Emphasize,
            TransformationKind::Annotate { .. } => TransformationType::Annotate,
        }
    }

    /// Priority with the default tier filled in.
    pub fn effective_priority(&self) -> Priority {
        self.priority.unwrap_or(Priority::Medium)
    }

    /// Sort rank: immediate transformations first, then by priority tier.
    pub fn tier(&self) -> u8 {
        if self.apply_immediately {
            0
        } else {
            self.effective_priority().rank()
        }
    }
}
