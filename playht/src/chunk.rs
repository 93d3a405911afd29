//! Text splitting for payload size limits.
//!
//! The synthesis backend rejects oversized text items, so long input lines
//! are broken up before synthesis: first at sentence endings once a line
//! passes the soft limit, then at word boundaries for anything still over
//! the hard limit. Limits count characters, never bytes.

/// Length at which a line is split at sentence endings.
pub const SOFT_CHARACTER_MAX: usize = 350;

/// Length at which a piece is split at word boundaries.
pub const HARD_CHARACTER_MAX: usize = 500;

/// Splits a line of text into pieces within the default limits.
///
/// Whitespace-only input produces no pieces.
pub fn split_text(line: &str) -> Vec<String> {
    split_text_with_limits(line, SOFT_CHARACTER_MAX, HARD_CHARACTER_MAX)
}

/// Splits a line of text with explicit soft/hard limits.
pub fn split_text_with_limits(line: &str, soft: usize, hard: usize) -> Vec<String> {
    let line = line.trim();
    if line.is_empty() {
        return Vec::new();
    }
    if char_len(line) <= soft {
        return vec![line.to_string()];
    }

    let mut pieces = Vec::new();
    for packed in pack_sentences(line, soft) {
        if char_len(&packed) <= hard {
            pieces.push(packed);
        } else {
            pieces.extend(split_words(&packed, hard));
        }
    }
    pieces
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Splits at sentence-ending punctuation and greedily repacks the
/// sentences into pieces at most `soft` characters long (single sentences
/// over the limit stay whole here; the word pass handles them).
fn pack_sentences(line: &str, soft: usize) -> Vec<String> {
    let mut sentences: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().is_none_or(|n| n.is_whitespace()) {
            sentences.push(std::mem::take(&mut current));
        }
    }
    if !current.trim().is_empty() {
        sentences.push(current);
    }

    let mut packed: Vec<String> = Vec::new();
    for sentence in sentences {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }
        match packed.last_mut() {
            Some(last) if char_len(last) + 1 + char_len(sentence) <= soft => {
                last.push(' ');
                last.push_str(sentence);
            }
            _ => packed.push(sentence.to_string()),
        }
    }
    packed
}

/// Greedily packs whitespace-separated words into pieces at most `hard`
/// characters long. A single word over the limit stays whole rather than
/// being cut mid-word.
fn split_words(text: &str, hard: usize) -> Vec<String> {
    let mut pieces: Vec<String> = Vec::new();
    for word in text.split_whitespace() {
        match pieces.last_mut() {
            Some(last) if char_len(last) + 1 + char_len(word) <= hard => {
                last.push(' ');
                last.push_str(word);
            }
            _ => pieces.push(word.to_string()),
        }
    }
    pieces
}
