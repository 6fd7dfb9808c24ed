//! Splits authored text on variant delimiters.
//!
//! Two delimiter lines are recognised:
//! - `---[N]` starts the variant shown from visit `N` on
//! - `---name---` starts the named section `name`
//!
//! Text before the first delimiter is the base. Malformed delimiters make the
//! whole text fall back to an unsegmented base.

use tracing::debug;

use super::EnhancedContent;

enum Delimiter {
    Visit(u32),
    Section(String),
}

#[derive(Debug)]
struct Malformed;

fn parse_delimiter(line: &str) -> Result<Option<Delimiter>, Malformed> {
    let line = line.trim();
    let Some(rest) = line.strip_prefix("---") else {
        return Ok(None);
    };

    if let Some(inner) = rest.strip_prefix('[') {
        let number = inner.strip_suffix(']').ok_or(Malformed)?;
        return number
            .trim()
            .parse::<u32>()
            .map(|n| Some(Delimiter::Visit(n)))
            .map_err(|_| Malformed);
    }

    match rest.strip_suffix("---") {
        Some(name) if is_section_name(name) => Ok(Some(Delimiter::Section(name.to_string()))),
        Some(name) if name.is_empty() || name.chars().all(|c| c == '-') => Ok(None),
        Some(_) => Err(Malformed),
        // A markdown horizontal rule, not a delimiter.
        None => Ok(None),
    }
}

fn is_section_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn flush(content: &mut EnhancedContent, current: &Option<Delimiter>, buffer: &mut Vec<&str>) {
    let body = buffer.join("\n").trim().to_string();
    buffer.clear();
    match current {
        None => content.base = body,
        Some(Delimiter::Visit(n)) => {
            content.visit_variants.insert(*n, body);
        }
        Some(Delimiter::Section(name)) => {
            content.sections.insert(name.clone(), body);
        }
    }
}

fn try_parse(text: &str) -> Result<EnhancedContent, Malformed> {
    let mut content = EnhancedContent::default();
    let mut current: Option<Delimiter> = None;
    let mut buffer: Vec<&str> = Vec::new();

    for line in text.lines() {
        match parse_delimiter(line)? {
            Some(delimiter) => {
                flush(&mut content, &current, &mut buffer);
                current = Some(delimiter);
            }
            None => buffer.push(line),
        }
    }
    flush(&mut content, &current, &mut buffer);

    if content.base.is_empty() {
        if let Some(first) = content.visit_variants.values().next() {
            content.base = first.clone();
        }
    }

    Ok(content)
}

impl EnhancedContent {
    /// Parse authored text into base content and variants.
    pub fn parse(text: &str) -> Self {
        match try_parse(text) {
            Ok(content) => content,
            Err(Malformed) => {
                debug!("malformed content delimiters, using text as unsegmented base");
                EnhancedContent::new(text.trim())
            }
        }
    }
}
