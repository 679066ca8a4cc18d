//! Keeping anchors valid when block content changes
//!
//! An accepted suggestion replaces one plain-text span. Anchors before it
//! are untouched, anchors after it move by the length difference, and
//! anchors overlapping it are flagged stale: they stay listed with their
//! text snapshot but are no longer highlighted.

use uuid::Uuid;

use super::types::ContentBlock;

/// A plain-text edit: `[start, end)` replaced by `inserted_len` characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextEdit {
    pub start: usize,
    pub end: usize,
    pub inserted_len: usize,
}

impl TextEdit {
    /// Edit inserting `replacement` verbatim as plain text
    pub fn new(start: usize, end: usize, replacement: &str) -> Self {
        Self::with_len(start, end, replacement.chars().count())
    }

    /// Edit inserting `inserted_len` plain-text characters, as measured in
    /// the rewritten markup
    pub fn with_len(start: usize, end: usize, inserted_len: usize) -> Self {
        Self {
            start,
            end,
            inserted_len,
        }
    }

    /// Where an offset at or after the edited span ends up
    fn shift(&self, offset: usize) -> usize {
        offset - (self.end - self.start) + self.inserted_len
    }
}

/// Effect of a rebase on a block's annotations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebaseSummary {
    pub shifted: usize,
    pub invalidated: usize,
}

enum Placement {
    Before,
    After,
    Overlapping,
}

fn place(edit: &TextEdit, start: usize, end: usize) -> Placement {
    if end <= edit.start {
        Placement::Before
    } else if start >= edit.end {
        Placement::After
    } else {
        Placement::Overlapping
    }
}

/// Move or invalidate every anchor of `block` for `edit`, leaving the
/// annotation `source` (the one that produced the edit) alone
pub fn rebase_block(block: &mut ContentBlock, edit: &TextEdit, source: Option<Uuid>) -> RebaseSummary {
    let mut summary = RebaseSummary::default();

    for comment in block.comments.iter_mut().filter(|c| !c.is_stale) {
        match place(edit, comment.start_offset, comment.end_offset) {
            Placement::Before => {}
            Placement::After => {
                comment.start_offset = edit.shift(comment.start_offset);
                comment.end_offset = edit.shift(comment.end_offset);
                summary.shifted += 1;
            }
            Placement::Overlapping => {
                comment.is_stale = true;
                summary.invalidated += 1;
            }
        }
    }

    for suggestion in block
        .suggestions
        .iter_mut()
        .filter(|s| !s.is_stale && Some(s.id) != source)
    {
        match place(edit, suggestion.start_offset, suggestion.end_offset) {
            Placement::Before => {}
            Placement::After => {
                suggestion.start_offset = edit.shift(suggestion.start_offset);
                suggestion.end_offset = edit.shift(suggestion.end_offset);
                summary.shifted += 1;
            }
            Placement::Overlapping => {
                suggestion.is_stale = true;
                summary.invalidated += 1;
            }
        }
    }

    summary
}

/// After an arbitrary content change, flag every anchor whose text no
/// longer matches its snapshot. Returns the number flagged.
pub fn invalidate_mismatched(block: &mut ContentBlock) -> usize {
    let plain: Vec<char> = block.plain_text().chars().collect();
    let text_at = |start: usize, end: usize| -> Option<String> {
        plain.get(start..end).map(|chars| chars.iter().collect())
    };

    let mut invalidated = 0;
    for comment in block.comments.iter_mut().filter(|c| !c.is_stale) {
        if text_at(comment.start_offset, comment.end_offset).as_deref()
            != Some(comment.selected_text.as_str())
        {
            comment.is_stale = true;
            invalidated += 1;
        }
    }
    for suggestion in block
        .suggestions
        .iter_mut()
        .filter(|s| s.is_live())
    {
        if text_at(suggestion.start_offset, suggestion.end_offset).as_deref()
            != Some(suggestion.original_text.as_str())
        {
            suggestion.is_stale = true;
            invalidated += 1;
        }
    }

    invalidated
}
