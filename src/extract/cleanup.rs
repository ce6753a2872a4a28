//! Text cleanup applied to located cell contents
//!
//! Cells arrive as fragments: one per `<p>` inside the cell, or the whole
//! cell text when it has no paragraphs. Entities are already decoded by the
//! HTML parser, so cleanup only deals with whitespace, conjunctions and
//! parenthetical asides.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static PARENTHETICAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^()]*\)").expect("valid regex"));

static RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*[-\u{2013}]\s*(\d+)").expect("valid regex"));

/// Collapses every whitespace run (including non-breaking spaces) to a
/// single space and trims the ends
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Comma-separated names, trimmed and deduplicated in first-seen order
///
/// "Aussie, Little Blue Dog, Aussie" becomes `["Aussie", "Little Blue Dog"]`.
pub fn comma_set(fragments: &[String]) -> Vec<String> {
    dedupe(
        fragments
            .iter()
            .flat_map(|f| f.split(','))
            .map(clean_text)
            .filter(|s| !s.is_empty())
            .collect(),
    )
}

/// Splits one fragment into phrases
///
/// `&` counts as "and", parenthetical asides are dropped, and the result is
/// split on the conjunction. Empty tokens are discarded.
pub fn phrases(fragment: &str) -> Vec<String> {
    let text = fragment.replace('&', " and ");
    let text = PARENTHETICAL_RE.replace_all(&text, " ");
    let text = clean_text(&text);

    text.split(" and ")
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "and")
        .map(str::to_string)
        .collect()
}

/// Phrases of every fragment, in document order
pub fn phrase_list(fragments: &[String]) -> Vec<String> {
    fragments.iter().flat_map(|f| phrases(f)).collect()
}

/// Like [`phrase_list`] without repeated values
pub fn phrase_set(fragments: &[String]) -> Vec<String> {
    dedupe(phrase_list(fragments))
}

/// Phrase list where " to " also separates items ("Medium to Large")
pub fn span_list(fragments: &[String]) -> Vec<String> {
    fragments
        .iter()
        .flat_map(|f| {
            clean_text(f)
                .split(" to ")
                .flat_map(phrases)
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Parses the first `min-max` pair in the text
///
/// Each bound is parsed on its own and falls back to 0; text without a pair
/// yields `[0, 0]`.
pub fn parse_range(text: &str) -> [u32; 2] {
    match RANGE_RE.captures(text) {
        Some(caps) => [
            caps[1].parse().unwrap_or(0),
            caps[2].parse().unwrap_or(0),
        ],
        None => [0, 0],
    }
}

fn dedupe(values: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|v| seen.insert(v.clone()))
        .collect()
}
