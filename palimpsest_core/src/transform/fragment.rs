//! Deterministic fragmentation of selected text.

use palimpsest_rules::FragmentStyle;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

/// Upper bound on pattern repetitions in the progressive style.
const MAX_PROGRESSIVE_REPEAT: usize = 5;

/// Seed for the glitch style, derived from the inputs only.
pub fn fragment_seed(base: &str, selector: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(base.as_bytes());
    hasher.update([0u8]);
    hasher.update(selector.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Interrupt `text` with `pattern` according to `style`.
pub fn fragment_text(text: &str, style: FragmentStyle, pattern: &str, seed: u64) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() < 2 && style != FragmentStyle::Character {
        return split_midword(text, pattern);
    }

    match style {
        FragmentStyle::Character => by_character(text, pattern),
        FragmentStyle::Word => words.join(&format!("{} ", pattern)),
        FragmentStyle::Progressive => {
            let mut out = String::from(words[0]);
            for (index, word) in words.iter().enumerate().skip(1) {
                out.push_str(&pattern.repeat(index.min(MAX_PROGRESSIVE_REPEAT)));
                out.push(' ');
                out.push_str(word);
            }
            out
        }
        FragmentStyle::Glitch => {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut out = String::from(words[0]);
            let mut inserted = false;
            for word in &words[1..] {
                if rng.random_bool(0.5) {
                    out.push_str(pattern);
                    inserted = true;
                }
                out.push(' ');
                out.push_str(word);
            }
            if inserted {
                out
            } else {
                words.join(&format!("{} ", pattern))
            }
        }
    }
}

fn by_character(text: &str, pattern: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() * (pattern.len() + 1));
    for (index, c) in chars.iter().enumerate() {
        out.push(*c);
        if let Some(next) = chars.get(index + 1) {
            if !c.is_whitespace() && !next.is_whitespace() {
                out.push_str(pattern);
            }
        }
    }
    out
}

fn split_midword(text: &str, pattern: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() < 2 {
        return format!("{}{}", text, pattern);
    }
    let middle = chars.len() / 2;
    let head: String = chars[..middle].iter().collect();
    let tail: String = chars[middle..].iter().collect();
    format!("{}{}{}", head, pattern, tail)
}
