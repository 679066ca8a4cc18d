//! Markup handling: tokenizing, the plain-text offset space, and the
//! rendered node tree that selections are reported against.

pub mod offsets;
pub mod tokenizer;
pub mod tree;

pub use offsets::{
    apply_text_replacement, markup_span, plain_len, plain_slice, plain_text_of, Replacement,
    ReplacementStrategy,
};
pub use tokenizer::{tokenize, Tag, TagKind, Token, TokenKind};
pub use tree::{NodeId, NodeKind, OffsetError, RenderedTree, TreeId};
