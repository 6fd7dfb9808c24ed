//! The markup the transformer inserts, and how to recognise and remove it.
//!
//! Every inserted element is a `<span>` carrying `data-transform`. Elements
//! that add text (annotations, expansions) also carry `data-added`; elements
//! that rewrite text (replacements, fragments) keep the authored words in
//! `data-original`. Everything else merely wraps authored text.

use palimpsest_rules::TRANSFORM_ATTRIBUTE;
use std::ops::Range;

const ADDED_ATTRIBUTE: &str = "data-added";
const ORIGINAL_ATTRIBUTE: &str = "data-original";
const SPAN_OPEN: &str = "<span";
const SPAN_CLOSE: &str = "</span>";

/// Text that a structurally broken render tends to contain.
const PLACEHOLDERS: [&str; 4] = ["undefined", "[object Object]", "NaN", "{{"];

pub(crate) fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub(crate) fn escape_text(value: &str) -> String {
    value.replace('<', "&lt;").replace('>', "&gt;")
}

fn unescape(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Builder for one inserted element.
pub(crate) struct Element<'a> {
    kind: &'a str,
    class: String,
    added: bool,
    hidden: bool,
    original: Option<&'a str>,
}

impl<'a> Element<'a> {
    pub(crate) fn new(kind: &'a str, class: impl Into<String>) -> Self {
        Self {
            kind,
            class: class.into(),
            added: false,
            hidden: false,
            original: None,
        }
    }

    pub(crate) fn added(mut self) -> Self {
        self.added = true;
        self
    }

    pub(crate) fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub(crate) fn original(mut self, text: &'a str) -> Self {
        self.original = Some(text);
        self
    }

    pub(crate) fn render(&self, inner: &str) -> String {
        let mut tag = format!(
            "{} {}=\"{}\" class=\"{}\"",
            SPAN_OPEN, TRANSFORM_ATTRIBUTE, self.kind, self.class
        );
        if self.added {
            tag.push(' ');
            tag.push_str(ADDED_ATTRIBUTE);
        }
        if self.hidden {
            tag.push_str(" hidden");
        }
        if let Some(original) = self.original {
            tag.push_str(&format!(" {}=\"{}\"", ORIGINAL_ATTRIBUTE, escape_attribute(original)));
        }
        format!("{}>{}{}", tag, inner, SPAN_CLOSE)
    }
}

/// A `<span ...>` or `</span>` tag found in text.
#[derive(Debug)]
struct Tag<'a> {
    range: Range<usize>,
    body: &'a str,
    closing: bool,
}

fn next_tag(text: &str, from: usize) -> Option<Tag<'_>> {
    let mut search = from;
    while let Some(offset) = text[search..].find('<') {
        let start = search + offset;
        let rest = &text[start..];
        if rest.starts_with(SPAN_CLOSE) {
            return Some(Tag {
                range: start..start + SPAN_CLOSE.len(),
                body: &text[start..start + SPAN_CLOSE.len()],
                closing: true,
            });
        }
        if rest.starts_with(SPAN_OPEN) {
            let end = rest.find('>').map(|e| start + e + 1)?;
            return Some(Tag {
                range: start..end,
                body: &text[start..end],
                closing: false,
            });
        }
        search = start + 1;
    }
    None
}

fn attribute_value<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let marker = format!("{}=\"", name);
    let start = tag.find(&marker)? + marker.len();
    let end = tag[start..].find('"')? + start;
    Some(&tag[start..end])
}

fn has_flag(tag: &str, name: &str) -> bool {
    tag.split_whitespace()
        .any(|part| part.trim_end_matches('>') == name)
}

/// Byte ranges a selector must not match inside: every tag, plus the full
/// extent of elements whose content is not authored text.
pub(crate) fn protected_ranges(text: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut stack: Vec<(usize, bool)> = Vec::new();
    let mut cursor = 0;

    while let Some(tag) = next_tag(text, cursor) {
        cursor = tag.range.end;
        ranges.push(tag.range.clone());
        if tag.closing {
            if let Some((start, protect)) = stack.pop() {
                if protect {
                    ranges.push(start..tag.range.end);
                }
            }
        } else {
            let protect = has_flag(tag.body, ADDED_ATTRIBUTE) || tag.body.contains(ORIGINAL_ATTRIBUTE);
            stack.push((tag.range.start, protect));
        }
    }
    ranges
}

fn is_free(range: &Range<usize>, protected: &[Range<usize>]) -> bool {
    protected
        .iter()
        .all(|p| range.end <= p.start || range.start >= p.end)
}

/// First occurrence of `needle` outside protected ranges.
pub(crate) fn find_unprotected(text: &str, needle: &str) -> Option<usize> {
    find_all_unprotected(text, needle).into_iter().next()
}

/// All non-overlapping occurrences of `needle` outside protected ranges.
pub(crate) fn find_all_unprotected(text: &str, needle: &str) -> Vec<usize> {
    if needle.is_empty() {
        return Vec::new();
    }
    let protected = protected_ranges(text);
    text.match_indices(needle)
        .map(|(start, _)| start)
        .filter(|start| is_free(&(*start..*start + needle.len()), &protected))
        .collect()
}

/// Maximum nesting depth of transformer elements.
pub fn markup_depth(text: &str) -> usize {
    let mut depth: usize = 0;
    let mut deepest = 0;
    let mut cursor = 0;
    while let Some(tag) = next_tag(text, cursor) {
        cursor = tag.range.end;
        if tag.closing {
            depth = depth.saturating_sub(1);
        } else {
            depth += 1;
            deepest = deepest.max(depth);
        }
    }
    deepest
}

/// Find the `</span>` closing the element opened just before `from`.
fn matching_close(text: &str, from: usize) -> Option<Range<usize>> {
    let mut depth = 1;
    let mut cursor = from;
    while let Some(tag) = next_tag(text, cursor) {
        cursor = tag.range.end;
        if tag.closing {
            depth -= 1;
            if depth == 0 {
                return Some(tag.range);
            }
        } else {
            depth += 1;
        }
    }
    None
}

/// Strip transformer markup, recovering the authored narrative text.
///
/// Added elements are dropped together with the whitespace that introduced
/// them, rewritten elements are restored from `data-original`, and wrapping
/// elements are unwrapped. Unbalanced transformer tags are discarded; other
/// markup is kept.
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;

    while let Some(tag) = next_tag(text, cursor) {
        out.push_str(&text[cursor..tag.range.start]);
        cursor = tag.range.end;

        if tag.closing {
            // A closer with no opener in view is left alone.
            out.push_str(tag.body);
            continue;
        }

        let Some(close) = matching_close(text, tag.range.end) else {
            // Unbalanced opener from a broken render.
            if !tag.body.contains(TRANSFORM_ATTRIBUTE) {
                out.push_str(tag.body);
            }
            continue;
        };
        let inner = &text[tag.range.end..close.start];
        cursor = close.end;

        if !tag.body.contains(TRANSFORM_ATTRIBUTE) {
            out.push_str(tag.body);
            out.push_str(&sanitize(inner));
            out.push_str(SPAN_CLOSE);
        } else if has_flag(tag.body, ADDED_ATTRIBUTE) {
            let kept = out.trim_end().len();
            out.truncate(kept);
        } else if let Some(original) = attribute_value(tag.body, ORIGINAL_ATTRIBUTE) {
            out.push_str(&unescape(original));
        } else {
            out.push_str(&sanitize(inner));
        }
    }

    out.push_str(&text[cursor..]);
    out
}

/// Structural problems that make rendered text unfit for display.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentAnomaly {
    Empty,
    ExcessiveNesting(usize),
    Unbalanced,
    Placeholder(&'static str),
    TooShort { ratio: f64 },
}

impl std::fmt::Display for ContentAnomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentAnomaly::Empty => write!(f, "empty output"),
            ContentAnomaly::ExcessiveNesting(depth) => write!(f, "markup nested {} deep", depth),
            ContentAnomaly::Unbalanced => write!(f, "unbalanced markup"),
            ContentAnomaly::Placeholder(p) => write!(f, "placeholder text {:?}", p),
            ContentAnomaly::TooShort { ratio } => write!(f, "output is {:.2} of source length", ratio),
        }
    }
}

fn is_balanced(text: &str) -> bool {
    let mut depth: i64 = 0;
    let mut cursor = 0;
    while let Some(tag) = next_tag(text, cursor) {
        cursor = tag.range.end;
        depth += if tag.closing { -1 } else { 1 };
        if depth < 0 {
            return false;
        }
    }
    depth == 0
}

/// Check rendered `output` against the `source` it was rendered from.
///
/// `inserted` lists the texts the applied transformations put into the
/// output; placeholder words found in them or in `source` are authored and
/// not treated as a broken render.
pub fn inspect(
    output: &str,
    source: &str,
    inserted: &[&str],
    max_depth: usize,
    min_ratio: f64,
) -> Option<ContentAnomaly> {
    if output.trim().is_empty() && !source.trim().is_empty() {
        return Some(ContentAnomaly::Empty);
    }
    if !is_balanced(output) {
        return Some(ContentAnomaly::Unbalanced);
    }
    let depth = markup_depth(output);
    if depth > max_depth {
        return Some(ContentAnomaly::ExcessiveNesting(depth));
    }
    if let Some(placeholder) = PLACEHOLDERS
        .iter()
        .find(|p| {
            output.contains(*p)
                && !source.contains(*p)
                && !inserted.iter().any(|text| text.contains(*p))
        })
    {
        return Some(ContentAnomaly::Placeholder(placeholder));
    }
    let source_len = source.chars().count();
    if source_len > 0 {
        let ratio = sanitize(output).chars().count() as f64 / source_len as f64;
        if ratio < min_ratio {
            return Some(ContentAnomaly::TooShort { ratio });
        }
    }
    None
}
