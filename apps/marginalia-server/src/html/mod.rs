//! HTML output for annotated blocks

mod highlight_composer;

pub use highlight_composer::{
    compose_block, inject_at_offsets, live_ranges, mark_active, ComposeError, ComposeResult,
    HighlightAction, HighlightConfig, HighlightKind, HighlightRange, HighlightTargets,
};
