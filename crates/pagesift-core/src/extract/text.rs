//! Text helpers shared by all extraction modes.

use scraper::ElementRef;

/// Collapse all runs of whitespace to single spaces and trim.
pub fn normalize_ws(text: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    words.join(" ")
}

/// Whitespace-normalized text of an element's subtree, in document order.
pub fn element_text(element: &ElementRef) -> String {
    let words: Vec<&str> = element.text().flat_map(str::split_whitespace).collect();
    words.join(" ")
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Cut a string to at most `max` characters, keeping the prefix.
///
/// Counts characters, not bytes, and makes no attempt to avoid splitting
/// mid-word; that is the defined behavior, not an accident.
pub fn truncate_chars(mut text: String, max: usize) -> String {
    if let Some((idx, _)) = text.char_indices().nth(max) {
        text.truncate(idx);
    }
    text
}
