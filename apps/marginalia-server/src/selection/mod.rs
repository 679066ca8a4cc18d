//! Selection capture
//!
//! Turns a raw text selection, reported as two `(node, offset)` boundaries
//! in a block's rendered tree, into a stable plain-text anchor plus the
//! screen rectangle the action menu is positioned against.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::annotations::Anchor;
use crate::markup::{NodeId, RenderedTree};

/// Gap between the selection and the action menu, in pixels
const MENU_GAP: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ScreenRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

/// Where the floating action menu goes: centred under the selection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MenuPosition {
    pub top: f64,
    pub left: f64,
}

impl MenuPosition {
    pub fn below(rect: &ScreenRect) -> Self {
        Self {
            top: rect.bottom() + MENU_GAP,
            left: rect.left + rect.width / 2.0,
        }
    }
}

/// One end of a selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    pub node: NodeId,
    pub offset: usize,
}

/// A selection as the renderer reports it
#[derive(Debug, Clone, PartialEq)]
pub struct RawSelection {
    /// Where the drag started
    pub anchor: Boundary,
    /// Where the drag ended; may precede `anchor`
    pub focus: Boundary,
    /// The selection's own string form
    pub text: String,
    pub rect: ScreenRect,
}

/// A live selection inside one block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSelection {
    pub block_id: Uuid,
    pub start_offset: usize,
    pub end_offset: usize,
    pub selected_text: String,
    pub anchor_rect: ScreenRect,
}

impl TextSelection {
    pub fn anchor(&self) -> Anchor {
        Anchor::new(self.block_id, self.start_offset, self.end_offset)
    }

    pub fn menu_position(&self) -> MenuPosition {
        MenuPosition::below(&self.anchor_rect)
    }

    /// Track the selection after a scroll
    pub fn reposition(&mut self, rect: ScreenRect) {
        self.anchor_rect = rect;
    }
}

/// Why a selection produced no anchor. These are ignored by callers.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionError {
    #[error("selection is collapsed")]
    Collapsed,

    #[error("selection contains no text")]
    Empty,

    #[error("selection lies outside the block")]
    OutsideBlock,
}

/// Resolve `raw` against the rendered tree of block `block_id`.
///
/// Both boundaries must belong to `tree`. The offsets computed from the
/// boundaries are authoritative; the selection string only serves as a
/// consistency check, since a drag across inline markup can pick up
/// whitespace its trimmed string form drops.
pub fn capture(
    tree: &RenderedTree,
    block_id: Uuid,
    raw: &RawSelection,
) -> Result<TextSelection, SelectionError> {
    if raw.anchor == raw.focus {
        return Err(SelectionError::Collapsed);
    }
    if !tree.contains(raw.anchor.node) || !tree.contains(raw.focus.node) {
        return Err(SelectionError::OutsideBlock);
    }

    let resolve = |b: &Boundary| {
        tree.dom_position_to_offset(b.node, b.offset)
            .map_err(|_| SelectionError::OutsideBlock)
    };
    let a = resolve(&raw.anchor)?;
    let f = resolve(&raw.focus)?;
    if a == f {
        return Err(SelectionError::Collapsed);
    }
    let (start, end) = (a.min(f), a.max(f));

    let selected_text: String = tree
        .text_content()
        .chars()
        .skip(start)
        .take(end - start)
        .collect();
    if selected_text.trim().is_empty() {
        return Err(SelectionError::Empty);
    }

    let trimmed_len = raw.text.trim().chars().count();
    if start + trimmed_len != end {
        tracing::debug!(
            block_id = %block_id,
            start,
            end,
            expected_end = start + trimmed_len,
            "Selection text length disagrees with resolved offsets"
        );
    }

    Ok(TextSelection {
        block_id,
        start_offset: start,
        end_offset: end,
        selected_text,
        anchor_rect: raw.rect,
    })
}
