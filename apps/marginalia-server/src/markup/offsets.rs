//! Plain-text offset space
//!
//! All anchors address characters of a block's plain text: the markup with
//! every tag removed and every character reference decoded to the single
//! character it stands for. Offsets count Unicode scalar values.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::tokenizer::tokenize;

/// Plain text of a markup string
pub fn plain_text_of(markup: &str) -> String {
    tokenize(markup).filter_map(|t| t.plain_char()).collect()
}

/// Length of the plain text in characters
pub fn plain_len(markup: &str) -> usize {
    tokenize(markup).filter(|t| !t.is_tag()).count()
}

/// Plain text spanned by `[start, end)`, or `None` if the span is invalid
pub fn plain_slice(markup: &str, start: usize, end: usize) -> Option<String> {
    if start > end {
        return None;
    }

    let slice: String = tokenize(markup)
        .filter_map(|t| t.plain_char())
        .skip(start)
        .take(end - start)
        .collect();

    (slice.chars().count() == end - start).then_some(slice)
}

/// Byte range of the markup covering plain-text span `[start, end)`.
///
/// The range starts at the first character's token and ends after the last
/// character's token, so entities are never split. Tags lying strictly
/// inside the span are included; tags at its edges are not.
pub fn markup_span(markup: &str, start: usize, end: usize) -> Option<Range<usize>> {
    if start >= end {
        return None;
    }

    let mut offset = 0;
    let mut span_start = None;
    for token in tokenize(markup).filter(|t| !t.is_tag()) {
        if offset == start {
            span_start = Some(token.start);
        }
        offset += 1;
        if offset == end {
            return span_start.map(|s| s..token.end());
        }
    }

    None
}

/// How an accepted edit was applied to the markup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplacementStrategy {
    /// The stored offsets still matched the original text
    Offsets,
    /// The offsets were stale; the first verbatim occurrence was replaced
    TextSearch,
    /// Neither matched; the content was left alone
    Unchanged,
}

/// Result of [`apply_text_replacement`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub content: String,
    pub strategy: ReplacementStrategy,
    /// Plain-text characters the replacement occupies in `content`; a
    /// newline written as `<br>` counts zero
    pub inserted_len: usize,
}

/// Replace the plain-text span `[start, end)` of `markup` with `replacement`.
///
/// `replacement` is plain text: it is escaped, and newlines become `<br>`.
/// Tags lying inside the span are kept, after the replacement, so the
/// element structure survives the edit.
///
/// The span is only trusted if it still reads `original`; otherwise the
/// first verbatim occurrence of `original` in the markup is replaced, and
/// failing that the markup is returned unchanged.
pub fn apply_text_replacement(
    markup: &str,
    start: usize,
    end: usize,
    original: &str,
    replacement: &str,
) -> Replacement {
    let encoded = encode_replacement(replacement);
    let inserted_len = plain_len(&encoded);

    if plain_slice(markup, start, end).as_deref() == Some(original) {
        if let Some(span) = markup_span(markup, start, end) {
            let interior: String = tokenize(&markup[span.clone()])
                .filter(|t| t.is_tag())
                .map(|t| t.raw)
                .collect();
            return Replacement {
                content: splice(markup, span, &(encoded + &interior)),
                strategy: ReplacementStrategy::Offsets,
                inserted_len,
            };
        }
    }

    if !original.is_empty() {
        if let Some(pos) = markup.find(original) {
            return Replacement {
                content: splice(markup, pos..pos + original.len(), &encoded),
                strategy: ReplacementStrategy::TextSearch,
                inserted_len,
            };
        }
    }

    Replacement {
        content: markup.to_string(),
        strategy: ReplacementStrategy::Unchanged,
        inserted_len: 0,
    }
}

fn encode_replacement(text: &str) -> String {
    html_escape::encode_text(text).replace('\n', "<br>")
}

fn splice(markup: &str, span: Range<usize>, insert: &str) -> String {
    let mut out = String::with_capacity(markup.len() - span.len() + insert.len());
    out.push_str(&markup[..span.start]);
    out.push_str(insert);
    out.push_str(&markup[span.end..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_strips_tags_and_decodes() {
        let markup = "<p>Fish &amp; <b>chips</b></p>";
        assert_eq!(plain_text_of(markup), "Fish & chips");
        assert_eq!(plain_len(markup), 12);
    }

    #[test]
    fn test_plain_slice() {
        let markup = "Hello <em>world</em>";
        assert_eq!(plain_slice(markup, 6, 11).as_deref(), Some("world"));
        assert_eq!(plain_slice(markup, 0, 0).as_deref(), Some(""));
        assert_eq!(plain_slice(markup, 6, 12), None);
        assert_eq!(plain_slice(markup, 7, 6), None);
    }

    #[test]
    fn test_markup_span_keeps_entities_whole() {
        let markup = "a &amp; b";
        let span = markup_span(markup, 2, 3).unwrap();
        assert_eq!(&markup[span], "&amp;");
    }

    #[test]
    fn test_markup_span_across_tags() {
        let markup = "Hel<b>lo</b> world";
        let span = markup_span(markup, 0, 5).unwrap();
        assert_eq!(&markup[span], "Hel<b>lo");
        assert_eq!(markup_span(markup, 5, 5), None);
        assert_eq!(markup_span(markup, 0, 12), None);
    }

    #[test]
    fn test_replace_by_offsets() {
        let result = apply_text_replacement("Hello world", 6, 11, "world", "earth");
        assert_eq!(result.content, "Hello earth");
        assert_eq!(result.strategy, ReplacementStrategy::Offsets);
    }

    #[test]
    fn test_replace_keeps_interior_tags() {
        let result =
            apply_text_replacement("<p>Tom &amp; <i>Jerry</i></p>", 4, 11, "& Jerry", "and Spike");
        assert_eq!(result.content, "<p>Tom and Spike<i></i></p>");
        assert_eq!(result.strategy, ReplacementStrategy::Offsets);
    }

    #[test]
    fn test_replacement_is_escaped_and_newlines_become_breaks() {
        let result = apply_text_replacement("a b", 2, 3, "b", "<x>\ny");
        assert_eq!(result.content, "a &lt;x&gt;<br>y");
    }

    #[test]
    fn test_inserted_len_counts_plain_characters() {
        let result = apply_text_replacement("Hello world", 6, 11, "world", "big\nworld");
        assert_eq!(result.content, "Hello big<br>world");
        assert_eq!(result.inserted_len, 8);
        assert_eq!(plain_len(&result.content), 6 + result.inserted_len);

        let escaped = apply_text_replacement("a b", 2, 3, "b", "<&>");
        assert_eq!(escaped.inserted_len, 3);

        let untouched = apply_text_replacement("Hello", 0, 3, "xyz", "abc");
        assert_eq!(untouched.inserted_len, 0);
    }

    #[test]
    fn test_stale_offsets_fall_back_to_search() {
        let result = apply_text_replacement("Hello brave world", 6, 11, "world", "earth");
        assert_eq!(result.content, "Hello brave earth");
        assert_eq!(result.strategy, ReplacementStrategy::TextSearch);
    }

    #[test]
    fn test_unmatched_leaves_content() {
        let result = apply_text_replacement("Hello", 0, 3, "xyz", "abc");
        assert_eq!(result.content, "Hello");
        assert_eq!(result.strategy, ReplacementStrategy::Unchanged);
    }
}
