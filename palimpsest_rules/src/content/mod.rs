//! Node content: authored variants, raw base text and rendered display text.
//!
//! `RawContent` and `DisplayContent` are distinct types with no conversion
//! from display back to raw. Only raw text is ever fed to the transformer.

mod parser;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::StoreError;

/// Attribute carried by every element the transformer inserts.
pub const TRANSFORM_ATTRIBUTE: &str = "data-transform";

/// Whether `text` contains markup inserted by the transformer.
pub fn contains_transformation_markup(text: &str) -> bool {
    text.contains(TRANSFORM_ATTRIBUTE)
}

/// Parsed content for one node: base text plus keyed alternatives.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnhancedContent {
    pub base: String,

    /// Visit count -> text.
    #[serde(default)]
    pub visit_variants: BTreeMap<u32, String>,

    /// Section name -> text.
    #[serde(default)]
    pub sections: BTreeMap<String, String>,
}

impl EnhancedContent {
    /// Content with only a base text.
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            ..Default::default()
        }
    }

    /// Content in the legacy format: visit-count variants only.
    ///
    /// The lowest keyed variant doubles as the base text.
    pub fn from_visit_variants(variants: BTreeMap<u32, String>) -> Self {
        let base = variants.values().next().cloned().unwrap_or_default();
        Self {
            base,
            visit_variants: variants,
            sections: BTreeMap::new(),
        }
    }

    /// Add text shown from the given visit count onwards.
    pub fn with_visit_variant(mut self, visit_count: u32, text: impl Into<String>) -> Self {
        self.visit_variants.insert(visit_count, text.into());
        self
    }

    /// Add a named section.
    pub fn with_section(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.sections.insert(name.into(), text.into());
        self
    }

    /// Text of a named section, such as `after-algorithm` or `tag-memory`.
    pub fn section(&self, name: &str) -> Option<&str> {
        self.sections.get(name).map(String::as_str)
    }

    /// The variant with the largest key not exceeding `visit_count`.
    pub fn visit_variant(&self, visit_count: u32) -> Option<&str> {
        self.visit_variant_entry(visit_count).map(|(_, text)| text)
    }

    /// Like [`EnhancedContent::visit_variant`], with the key that matched.
    pub fn visit_variant_entry(&self, visit_count: u32) -> Option<(u32, &str)> {
        self.visit_variants
            .range(..=visit_count)
            .next_back()
            .map(|(key, text)| (*key, text.as_str()))
    }

    /// Content without named sections, as older stories were authored.
    pub fn is_legacy(&self) -> bool {
        self.sections.is_empty()
    }

    /// Whether any variant carries transformer markup.
    pub fn is_contaminated(&self) -> bool {
        contains_transformation_markup(&self.base)
            || self.visit_variants.values().any(|t| contains_transformation_markup(t))
            || self.sections.values().any(|t| contains_transformation_markup(t))
    }
}

/// Untransformed narrative text, the only valid input to the transformer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawContent(String);

impl RawContent {
    /// Wrap authored text, rejecting anything that already carries
    /// transformer markup.
    pub fn new(text: impl Into<String>) -> Result<Self, StoreError> {
        let text = text.into();
        if contains_transformation_markup(&text) {
            return Err(StoreError::AlreadyTransformed);
        }
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RawContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rendered text ready for display. Never a source for further transformation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisplayContent(String);

impl DisplayContent {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Display an untransformed raw text as-is.
    pub fn untransformed(raw: &RawContent) -> Self {
        Self(raw.as_str().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the transformer left any markup in this text.
    pub fn is_transformed(&self) -> bool {
        contains_transformation_markup(&self.0)
    }
}

impl std::fmt::Display for DisplayContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visit_variant_lookup() {
        let content = EnhancedContent::new("base")
            .with_visit_variant(1, "first")
            .with_visit_variant(3, "third");

        assert_eq!(content.visit_variant(0), None);
        assert_eq!(content.visit_variant(1), Some("first"));
        assert_eq!(content.visit_variant(2), Some("first"));
        assert_eq!(content.visit_variant(7), Some("third"));
        assert_eq!(content.visit_variant_entry(2), Some((1, "first")));
        assert_eq!(content.visit_variant_entry(0), None);
    }

    #[test]
    fn test_legacy_content_uses_lowest_variant_as_base() {
        let mut variants = BTreeMap::new();
        variants.insert(2, "later".to_string());
        variants.insert(1, "opening".to_string());

        let content = EnhancedContent::from_visit_variants(variants);
        assert_eq!(content.base, "opening");
        assert!(content.is_legacy());
    }

    #[test]
    fn test_raw_content_rejects_markup() {
        assert!(RawContent::new("plain words").is_ok());
        assert_eq!(
            RawContent::new(r#"<span data-transform="emphasize">x</span>"#),
            Err(StoreError::AlreadyTransformed)
        );
    }

    #[test]
    fn test_contamination_check_covers_variants() {
        let clean = EnhancedContent::new("a").with_section("after-algorithm", "b");
        assert!(!clean.is_contaminated());

        let dirty = clean.with_visit_variant(2, r#"<span data-transform="replace">c</span>"#);
        assert!(dirty.is_contaminated());
    }
}
