//! Annotation module
//!
//! Comments and edit suggestions anchored to plain-text spans of content
//! blocks.
//!
//! # Features
//!
//! - Data model and input validation shared by the client store and the
//!   content service
//! - Suggestion lifecycle: `pending -> accepted | rejected`, with the
//!   permission checks for every comment and suggestion action
//! - Anchor rebasing when an accepted edit changes a block's text

mod lifecycle;
mod rebase;
mod types;

pub use lifecycle::{
    can_transition, check_comment_action, check_suggestion_action, Actor, ActorRole,
    CommentAction, LifecycleError, SuggestionAction, SuggestionStatus,
};
pub use rebase::{invalidate_mismatched, rebase_block, RebaseSummary, TextEdit};
pub use types::{
    Anchor, BlockUpdate, ChangeKind, Comment, CommentQuery, ContentBlock, ContentResponse,
    EditSuggestion, HistoryEntry, NewComment, NewReply, NewSuggestion, PendingReview, Reply,
    ReviewNote, SuggestionQuery, ValidationError, MAX_COMMENT_LEN, MAX_REPLY_LEN,
};
