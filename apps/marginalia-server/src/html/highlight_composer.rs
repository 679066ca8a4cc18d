//! Highlight composition at plain-text offsets
//!
//! Wraps the plain-text span of every live annotation in a highlight
//! element. The scan walks the block's tokens once, carrying the running
//! plain-text offset, so tags are copied verbatim and entities are never
//! split. Overlapping ranges become nested wrappers; where two ranges cross,
//! the inner wrapper is closed and reopened so that every element in the
//! output stays balanced.

use std::cmp::Reverse;
use std::collections::HashMap;

use lol_html::{element, rewrite_str, RewriteStrSettings, Selector};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::annotations::ContentBlock;
use crate::markup::{plain_len, tokenize, TokenKind};

/// Configuration for highlight wrappers
#[derive(Debug, Clone)]
pub struct HighlightConfig {
    /// Element used for wrappers
    pub wrapper_element: String,
    /// CSS class prefix for highlights
    pub class_prefix: String,
    /// Data attribute for the annotation ID
    pub id_attribute: String,
    /// Data attribute for the annotation kind
    pub kind_attribute: String,
    /// Class added to the wrappers of the selected annotation
    pub active_class: String,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            wrapper_element: "span".to_string(),
            class_prefix: "mg-highlight".to_string(),
            id_attribute: "data-annotation-id".to_string(),
            kind_attribute: "data-annotation-kind".to_string(),
            active_class: "active".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightKind {
    Comment,
    Suggestion,
}

impl HighlightKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HighlightKind::Comment => "comment",
            HighlightKind::Suggestion => "suggestion",
        }
    }
}

/// A plain-text span to highlight, derived per render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightRange {
    pub start: usize,
    pub end: usize,
    pub kind: HighlightKind,
    pub id: Uuid,
}

/// What activating a highlight should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightAction {
    OpenComment(Uuid),
    ReviewSuggestion(Uuid),
}

/// Click dispatch table for the wrappers of one render
#[derive(Debug, Clone, Default)]
pub struct HighlightTargets {
    by_id: HashMap<Uuid, HighlightKind>,
}

impl HighlightTargets {
    pub fn from_ranges<'a>(ranges: impl IntoIterator<Item = &'a HighlightRange>) -> Self {
        Self {
            by_id: ranges.into_iter().map(|r| (r.id, r.kind)).collect(),
        }
    }

    /// Action assigned to the wrapper carrying `id`
    pub fn action_for(&self, id: Uuid) -> Option<HighlightAction> {
        self.by_id.get(&id).map(|kind| match kind {
            HighlightKind::Comment => HighlightAction::OpenComment(id),
            HighlightKind::Suggestion => HighlightAction::ReviewSuggestion(id),
        })
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Result of highlight composition
#[derive(Debug)]
pub struct ComposeResult {
    /// The markup with highlight wrappers
    pub html: String,
    /// Number of ranges rendered
    pub injected_count: usize,
    /// Number of wrapper elements emitted; above `injected_count` when
    /// ranges had to be split around tags or crossing ranges
    pub wrapper_count: usize,
    /// Ranges that were empty or ran past the end of the text
    pub skipped: Vec<Uuid>,
    pub targets: HighlightTargets,
}

/// Errors during highlight composition
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("HTML rewrite failed: {0}")]
    RewriteError(String),
}

/// Wrap each range's plain-text span `[start, end)` in highlight elements.
///
/// Ranges opening at the same offset nest longest first, then by ascending
/// id. Invalid ranges are reported in `skipped` and otherwise ignored.
/// With no valid range the markup is returned unchanged.
pub fn inject_at_offsets(
    markup: &str,
    ranges: &[HighlightRange],
    config: &HighlightConfig,
) -> ComposeResult {
    let len = plain_len(markup);
    let (mut valid, invalid): (Vec<&HighlightRange>, Vec<&HighlightRange>) = ranges
        .iter()
        .partition(|r| r.start < r.end && r.end <= len);

    let skipped: Vec<Uuid> = invalid.iter().map(|r| r.id).collect();
    if !skipped.is_empty() {
        tracing::debug!(count = skipped.len(), text_len = len, "Skipping invalid highlight ranges");
    }

    let targets = HighlightTargets::from_ranges(valid.iter().copied());
    if valid.is_empty() {
        return ComposeResult {
            html: markup.to_string(),
            injected_count: 0,
            wrapper_count: 0,
            skipped,
            targets,
        };
    }

    valid.sort_by_key(|r| (r.start, Reverse(r.end), r.id));

    let mut writer = WrapperWriter::new(markup.len(), config);
    let mut pending = valid.iter().copied().peekable();
    let mut offset = 0;

    for token in tokenize(markup) {
        writer.close_ending(offset);

        match token.kind {
            TokenKind::Tag => {
                if token.tag().is_some_and(|t| t.changes_nesting()) {
                    writer.close_to(0);
                }
                writer.out.push_str(token.raw);
            }
            TokenKind::Text(_) | TokenKind::Entity(_) => {
                while let Some(range) = pending.next_if(|r| r.start == offset) {
                    writer.active.push(range);
                }
                writer.sync();
                writer.out.push_str(token.raw);
                offset += 1;
            }
        }
    }
    writer.close_ending(offset);
    writer.close_to(0);

    ComposeResult {
        html: writer.out,
        injected_count: valid.len(),
        wrapper_count: writer.wrapper_count,
        skipped,
        targets,
    }
}

/// Output buffer plus the wrapper bookkeeping of one scan.
///
/// `active` lists the ranges covering the current position in nesting
/// order. The first `open` of them have an open wrapper in the output; the
/// rest are reopened lazily before the next character.
struct WrapperWriter<'r, 'c> {
    out: String,
    config: &'c HighlightConfig,
    active: Vec<&'r HighlightRange>,
    open: usize,
    wrapper_count: usize,
}

impl<'r, 'c> WrapperWriter<'r, 'c> {
    fn new(capacity: usize, config: &'c HighlightConfig) -> Self {
        Self {
            out: String::with_capacity(capacity * 2),
            config,
            active: Vec::new(),
            open: 0,
            wrapper_count: 0,
        }
    }

    /// Drop ranges ending at `offset`, closing their wrappers and any
    /// wrappers nested inside them
    fn close_ending(&mut self, offset: usize) {
        let Some(first) = self.active.iter().position(|r| r.end == offset) else {
            return;
        };
        self.close_to(first);
        self.active.retain(|r| r.end != offset);
    }

    /// Close output wrappers until only `depth` remain open
    fn close_to(&mut self, depth: usize) {
        while self.open > depth {
            self.out.push_str("</");
            self.out.push_str(&self.config.wrapper_element);
            self.out.push('>');
            self.open -= 1;
        }
    }

    /// Open wrappers for every active range not yet open
    fn sync(&mut self) {
        while self.open < self.active.len() {
            let range = self.active[self.open];
            let kind = range.kind.as_str();
            let c = self.config;
            self.out.push_str(&format!(
                "<{} class=\"{} {}-{}\" {}=\"{}\" {}=\"{}\">",
                c.wrapper_element,
                c.class_prefix,
                c.class_prefix,
                kind,
                c.id_attribute,
                range.id,
                c.kind_attribute,
                kind
            ));
            self.open += 1;
            self.wrapper_count += 1;
        }
    }
}

/// Highlight ranges for a block's live annotations: unresolved comments and
/// pending suggestions whose anchors are still current
pub fn live_ranges(block: &ContentBlock) -> Vec<HighlightRange> {
    let comments = block
        .comments
        .iter()
        .filter(|c| c.is_live())
        .map(|c| HighlightRange {
            start: c.start_offset,
            end: c.end_offset,
            kind: HighlightKind::Comment,
            id: c.id,
        });

    let suggestions = block
        .suggestions
        .iter()
        .filter(|s| s.is_live())
        .map(|s| HighlightRange {
            start: s.start_offset,
            end: s.end_offset,
            kind: HighlightKind::Suggestion,
            id: s.id,
        });

    comments.chain(suggestions).collect()
}

/// Render a block with highlights for all its live annotations
pub fn compose_block(block: &ContentBlock, config: &HighlightConfig) -> ComposeResult {
    let ranges = live_ranges(block);
    let result = inject_at_offsets(&block.content, &ranges, config);
    if !result.skipped.is_empty() {
        tracing::warn!(
            block_id = %block.id,
            block_key = %block.block_key,
            skipped = result.skipped.len(),
            "Annotations fall outside the block text"
        );
    }
    result
}

/// Add the active class to every wrapper of annotation `id`
pub fn mark_active(html: &str, id: Uuid, config: &HighlightConfig) -> Result<String, ComposeError> {
    let selector = format!(
        "{}[{}=\"{}\"]",
        config.wrapper_element, config.id_attribute, id
    );
    selector
        .parse::<Selector>()
        .map_err(|e| ComposeError::RewriteError(e.to_string()))?;

    let active_class = config.active_class.as_str();
    let result = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!(selector, |el| {
                let class = match el.get_attribute("class") {
                    Some(existing) => format!("{} {}", existing, active_class),
                    None => active_class.to_string(),
                };
                el.set_attribute("class", &class)?;
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|e| ComposeError::RewriteError(e.to_string()))?;

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::{plain_text_of, Tag, TagKind};

    fn range(start: usize, end: usize, kind: HighlightKind, n: u128) -> HighlightRange {
        HighlightRange {
            start,
            end,
            kind,
            id: Uuid::from_u128(n),
        }
    }

    /// Plain text inside the wrappers of `id`, asserting that every element
    /// in `html` is balanced
    fn wrapped_text(html: &str, id: Uuid) -> String {
        let marker = format!("data-annotation-id=\"{}\"", id);
        let mut stack: Vec<(String, bool)> = Vec::new();
        let mut text = String::new();

        for token in tokenize(html) {
            match token.tag() {
                Some(tag) if tag.opens_element() => {
                    stack.push((tag.name.to_string(), token.raw.contains(&marker)));
                }
                Some(Tag {
                    name,
                    kind: TagKind::Close,
                }) => {
                    let (open, _) = stack.pop().expect("close without open");
                    assert_eq!(open, name, "mismatched close in {}", html);
                }
                Some(_) => {}
                None => {
                    if stack.iter().any(|(_, ours)| *ours) {
                        text.extend(token.plain_char());
                    }
                }
            }
        }

        assert!(stack.is_empty(), "unclosed elements in {}", html);
        text
    }

    #[test]
    fn test_no_ranges_is_identity() {
        let config = HighlightConfig::default();
        for markup in ["", "plain", "<p>a &amp; <b>b</b></p>", "<br/>x<!-- c -->"] {
            let result = inject_at_offsets(markup, &[], &config);
            assert_eq!(result.html, markup);
            assert_eq!(result.injected_count, 0);
        }
    }

    #[test]
    fn test_single_range() {
        let config = HighlightConfig::default();
        let comment = range(0, 5, HighlightKind::Comment, 1);
        let result = inject_at_offsets("Hello world", &[comment], &config);

        assert_eq!(
            result.html,
            format!(
                "<span class=\"mg-highlight mg-highlight-comment\" data-annotation-id=\"{}\" data-annotation-kind=\"comment\">Hello</span> world",
                comment.id
            )
        );
        assert_eq!(result.injected_count, 1);
        assert_eq!(result.wrapper_count, 1);
    }

    #[test]
    fn test_overlapping_ranges_nest() {
        let config = HighlightConfig::default();
        let comment = range(0, 7, HighlightKind::Comment, 1);
        let suggestion = range(3, 11, HighlightKind::Suggestion, 2);
        let result = inject_at_offsets("Hello world", &[suggestion, comment], &config);

        assert_eq!(wrapped_text(&result.html, comment.id), "Hello w");
        assert_eq!(wrapped_text(&result.html, suggestion.id), "lo world");
        assert_eq!(plain_text_of(&result.html), "Hello world");
        assert_eq!(result.injected_count, 2);
        assert_eq!(result.wrapper_count, 3);
    }

    #[test]
    fn test_span_correctness_across_markup() {
        let config = HighlightConfig::default();
        let markup = "<p>Fish &amp; <b>chips</b> &lt;3</p><p>Second</p>";
        let plain: Vec<char> = plain_text_of(markup).chars().collect();

        for start in 0..plain.len() {
            for end in start + 1..=plain.len() {
                let r = range(start, end, HighlightKind::Comment, 7);
                let result = inject_at_offsets(markup, &[r], &config);
                let expected: String = plain[start..end].iter().collect();
                assert_eq!(wrapped_text(&result.html, r.id), expected);
                assert_eq!(plain_text_of(&result.html), plain.iter().collect::<String>());
            }
        }
    }

    #[test]
    fn test_entities_are_never_split() {
        let config = HighlightConfig::default();
        let markup = "a &amp; b";
        let result = inject_at_offsets(markup, &[range(2, 3, HighlightKind::Comment, 1)], &config);

        assert!(result.html.contains(">&amp;</span>"));
        assert!(!result.html.contains("&am<"));
    }

    #[test]
    fn test_same_start_opens_longest_first() {
        let config = HighlightConfig::default();
        let short = range(0, 2, HighlightKind::Comment, 1);
        let long = range(0, 4, HighlightKind::Suggestion, 2);
        let result = inject_at_offsets("abcd", &[short, long], &config);

        let long_at = result.html.find(&long.id.to_string()).unwrap();
        let short_at = result.html.find(&short.id.to_string()).unwrap();
        assert!(long_at < short_at);
        assert_eq!(result.wrapper_count, 2);
    }

    #[test]
    fn test_same_span_orders_by_id() {
        let config = HighlightConfig::default();
        let first = range(0, 3, HighlightKind::Comment, 1);
        let second = range(0, 3, HighlightKind::Comment, 2);
        let a = inject_at_offsets("abc", &[second, first], &config);
        let b = inject_at_offsets("abc", &[first, second], &config);

        assert_eq!(a.html, b.html);
        assert!(a.html.find(&first.id.to_string()) < a.html.find(&second.id.to_string()));
    }

    #[test]
    fn test_invalid_ranges_are_skipped() {
        let config = HighlightConfig::default();
        let empty = range(2, 2, HighlightKind::Comment, 1);
        let past_end = range(3, 40, HighlightKind::Suggestion, 2);
        let result = inject_at_offsets("Hello", &[empty, past_end], &config);

        assert_eq!(result.html, "Hello");
        assert_eq!(result.skipped, vec![empty.id, past_end.id]);
        assert!(result.targets.is_empty());
    }

    #[test]
    fn test_void_tags_stay_inside_wrapper() {
        let config = HighlightConfig::default();
        let r = range(0, 2, HighlightKind::Comment, 1);
        let result = inject_at_offsets("a<br>b", &[r], &config);

        assert_eq!(result.wrapper_count, 1);
        assert_eq!(wrapped_text(&result.html, r.id), "ab");
    }

    #[test]
    fn test_targets_dispatch_by_kind() {
        let comment = range(0, 1, HighlightKind::Comment, 1);
        let suggestion = range(0, 1, HighlightKind::Suggestion, 2);
        let targets = HighlightTargets::from_ranges(&[comment, suggestion]);

        assert_eq!(
            targets.action_for(comment.id),
            Some(HighlightAction::OpenComment(comment.id))
        );
        assert_eq!(
            targets.action_for(suggestion.id),
            Some(HighlightAction::ReviewSuggestion(suggestion.id))
        );
        assert_eq!(targets.action_for(Uuid::from_u128(9)), None);
    }

    #[test]
    fn test_mark_active() {
        let config = HighlightConfig::default();
        let target = range(0, 5, HighlightKind::Comment, 1);
        let other = range(6, 11, HighlightKind::Comment, 2);
        let composed = inject_at_offsets("Hello world", &[target, other], &config);

        let html = mark_active(&composed.html, target.id, &config).unwrap();
        assert!(html.contains("class=\"mg-highlight mg-highlight-comment active\""));
        assert_eq!(html.matches(" active\"").count(), 1);
    }
}
