//! Sentence segmentation for streaming synthesis.
//!
//! The scheduler consumes text one sentence at a time so that the first
//! sentence can start playing while the rest are still being synthesized.
//! [`Segmenter`] is the seam; [`SentenceSegmenter`] is the default
//! punctuation-based implementation.

use std::collections::HashSet;

/// Abbreviations (lower-case, without the trailing period) after which a
/// period does not end a sentence.
const DEFAULT_ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "vs", "etc", "e.g", "i.e", "approx",
    "fig", "inc", "ltd", "co", "mt", "dept", "est",
];

/// Splits text into an ordered sequence of sentence strings.
///
/// Must be pure: the same input always yields the same segments, in
/// document order.
#[cfg_attr(test, mockall::automock)]
pub trait Segmenter: Send + Sync {
    /// Split `text` into sentences. May return an empty vector.
    fn segment(&self, text: &str) -> Vec<String>;
}

/// Punctuation-based sentence splitter.
///
/// Splits at `.`, `!` and `?` (plus trailing quotes/brackets) followed by
/// whitespace, except after known abbreviations and single-letter initials.
#[derive(Debug, Clone)]
pub struct SentenceSegmenter {
    abbreviations: HashSet<String>,
}

impl SentenceSegmenter {
    /// Create a segmenter with the built-in abbreviation list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            abbreviations: DEFAULT_ABBREVIATIONS.iter().map(ToString::to_string).collect(),
        }
    }

    /// Add extra abbreviations (case-insensitive, trailing period optional).
    #[must_use]
    pub fn with_abbreviations<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.abbreviations.extend(
            extra
                .into_iter()
                .map(|a| a.as_ref().trim_end_matches('.').to_lowercase()),
        );
        self
    }

    fn is_abbreviation(&self, before_period: &str, rest: &[char]) -> bool {
        let mut words = before_period.rsplit(char::is_whitespace);
        let token = words.next().unwrap_or_default().trim_start_matches(is_opener);

        let mut chars = token.chars();
        match (chars.next(), chars.next()) {
            (None, _) => false,
            (Some(c), None) => is_initial(c, words.next().unwrap_or_default(), rest),
            _ => self.abbreviations.contains(&token.to_lowercase()),
        }
    }
}

impl Default for SentenceSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Segmenter for SentenceSegmenter {
    fn segment(&self, text: &str) -> Vec<String> {
        let text = collapse_whitespace(text);
        if text.is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = text.chars().collect();
        let mut sentences = Vec::new();
        let mut current = String::new();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            current.push(c);
            i += 1;

            if !is_terminator(c) {
                continue;
            }

            let word_end = current.len() - c.len_utf8();
            let mut terminators = 1;
            let mut closed = false;

            // Absorb "?!", "..." and closing quotes/brackets into this sentence.
            while i < chars.len() && (is_terminator(chars[i]) || is_closer(chars[i])) {
                if is_closer(chars[i]) {
                    closed = true;
                } else {
                    terminators += 1;
                }
                current.push(chars[i]);
                i += 1;
            }

            let at_boundary = i >= chars.len() || chars[i].is_whitespace();
            if !at_boundary {
                continue;
            }

            if c == '.' && terminators == 1 && !closed && self.is_abbreviation(&current[..word_end], &chars[i..])
            {
                continue;
            }

            push_trimmed(&mut sentences, &mut current);
        }

        push_trimmed(&mut sentences, &mut current);
        sentences
    }
}

/// Split text into sentences with the default [`SentenceSegmenter`].
#[must_use]
pub fn split_sentences(text: &str) -> Vec<String> {
    SentenceSegmenter::new().segment(text)
}

// ── Internal helpers ───────────────────────────────────────────────

const fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '…')
}

const fn is_closer(c: char) -> bool {
    matches!(c, '"' | '\'' | ')' | ']' | '”' | '’' | '»')
}

const fn is_opener(c: char) -> bool {
    matches!(c, '"' | '\'' | '(' | '[' | '“' | '‘' | '«')
}

/// A lone capital before a period counts as an initial inside a run of
/// initials ("J. R. R. Tolkien") or after a capitalized word ("George W.
/// Bush"). "Plan B. It works." at the start of a sentence is still joined.
fn is_initial(letter: char, previous: &str, rest: &[char]) -> bool {
    if !letter.is_uppercase() {
        return false;
    }

    let next: String = rest
        .iter()
        .skip_while(|c| c.is_whitespace())
        .take_while(|c| !c.is_whitespace())
        .collect();
    let previous = previous.trim_start_matches(is_opener);
    if looks_like_initial(&next) || looks_like_initial(previous) {
        return true;
    }

    // "So do I." ends a sentence.
    letter != 'I' && previous.chars().next().is_some_and(char::is_uppercase)
}

fn looks_like_initial(token: &str) -> bool {
    let mut chars = token.chars();
    matches!(
        (chars.next(), chars.next(), chars.next()),
        (Some(c), Some('.'), None) if c.is_uppercase()
    )
}

fn push_trimmed(sentences: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
    current.clear();
}

fn collapse_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut prev_space = false;

    for c in text.chars() {
        if c.is_whitespace() {
            if !prev_space {
                result.push(' ');
                prev_space = true;
            }
        } else {
            result.push(c);
            prev_space = false;
        }
    }

    result.trim().to_string()
}
