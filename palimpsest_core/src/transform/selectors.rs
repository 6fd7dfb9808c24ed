//! Locating sentences in authored prose.

/// Lines that are not prose: headings, quotes, rules, empty lines.
fn is_prose_line(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty() && !line.starts_with('#') && !line.starts_with('>') && !line.starts_with("---")
}

/// Split a line into its sentences, keeping terminal punctuation.
fn sentences(line: &str) -> Vec<&str> {
    let mut result = Vec::new();
    let mut start = 0;
    let bytes = line.as_bytes();

    for (index, byte) in bytes.iter().enumerate() {
        if matches!(byte, b'.' | b'!' | b'?') {
            let at_boundary = bytes.get(index + 1).map_or(true, |next| next.is_ascii_whitespace());
            if at_boundary {
                let sentence = line[start..=index].trim();
                if !sentence.is_empty() {
                    result.push(sentence);
                }
                start = index + 1;
            }
        }
    }

    let tail = line[start..].trim();
    if !tail.is_empty() {
        result.push(tail);
    }
    result
}

/// The first sentence of the first prose line.
pub fn first_sentence(text: &str) -> Option<&str> {
    text.lines()
        .find(|line| is_prose_line(line))
        .and_then(|line| sentences(line).into_iter().next())
}

/// The last sentence of the last prose line.
pub fn last_sentence(text: &str) -> Option<&str> {
    text.lines()
        .rev()
        .find(|line| is_prose_line(line))
        .and_then(|line| sentences(line).into_iter().last())
}
