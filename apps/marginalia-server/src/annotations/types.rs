//! Content blocks and the annotations anchored to them
//!
//! Anchors address the block's plain text (see [`crate::markup`]). The text
//! snapshots stored with each annotation (`selected_text`, `original_text`)
//! are taken at creation time and never recomputed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::lifecycle::SuggestionStatus;
use crate::markup::{plain_len, plain_slice, plain_text_of, ReplacementStrategy};

/// Longest comment body accepted, in characters
pub const MAX_COMMENT_LEN: usize = 2000;
/// Longest reply body accepted, in characters
pub const MAX_REPLY_LEN: usize = 1000;

/// A unit of rendered content owning its annotation lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    pub id: Uuid,
    #[serde(default = "default_block_type")]
    pub block_type: String,
    /// Stable semantic name, e.g. `intro-paragraph`
    pub block_key: String,
    #[serde(default)]
    pub display_order: i32,
    /// Inactive blocks are kept with their annotations but not served
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Raw markup
    pub content: String,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub suggestions: Vec<EditSuggestion>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn default_block_type() -> String {
    "paragraph".to_string()
}

fn default_active() -> bool {
    true
}

impl ContentBlock {
    pub fn new(block_key: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            block_type: default_block_type(),
            block_key: block_key.into(),
            display_order: 0,
            is_active: true,
            content: content.into(),
            comments: Vec::new(),
            suggestions: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn plain_text(&self) -> String {
        plain_text_of(&self.content)
    }

    pub fn plain_len(&self) -> usize {
        plain_len(&self.content)
    }

    /// Current plain text under `[start, end)`
    pub fn text_at(&self, start: usize, end: usize) -> Option<String> {
        plain_slice(&self.content, start, end)
    }
}

/// The plain-text span an annotation is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Anchor {
    pub block_id: Uuid,
    pub start_offset: usize,
    pub end_offset: usize,
}

impl Anchor {
    pub fn new(block_id: Uuid, start_offset: usize, end_offset: usize) -> Self {
        Self {
            block_id,
            start_offset,
            end_offset,
        }
    }

    /// Check `0 <= start < end <= text_len`
    pub fn validate(&self, text_len: usize) -> Result<(), ValidationError> {
        if self.start_offset >= self.end_offset {
            return Err(ValidationError::EmptyRange);
        }
        if self.end_offset > text_len {
            return Err(ValidationError::RangeOutOfBounds {
                end: self.end_offset,
                len: text_len,
            });
        }
        Ok(())
    }

    /// Whether the half-open spans share at least one character
    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        self.start_offset < end && start < self.end_offset
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub block_id: Uuid,
    pub author_id: Uuid,
    pub start_offset: usize,
    pub end_offset: usize,
    /// Text under the anchor when the comment was made
    pub selected_text: String,
    pub body: String,
    #[serde(default)]
    pub is_resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    /// Set when an accepted edit overlapped the anchor
    #[serde(default)]
    pub is_stale: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub replies: Vec<Reply>,
}

impl Comment {
    pub fn anchor(&self) -> Anchor {
        Anchor::new(self.block_id, self.start_offset, self.end_offset)
    }

    /// Whether the comment is highlighted
    pub fn is_live(&self) -> bool {
        !self.is_resolved && !self.is_stale
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub id: Uuid,
    pub comment_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// A proposed replacement for a span of a block's text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditSuggestion {
    pub id: Uuid,
    pub block_id: Uuid,
    pub author_id: Uuid,
    pub start_offset: usize,
    pub end_offset: usize,
    pub original_text: String,
    pub suggested_text: String,
    pub status: SuggestionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_note: Option<String>,
    /// Set when another accepted edit overlapped the anchor
    #[serde(default)]
    pub is_stale: bool,
    pub created_at: DateTime<Utc>,
}

impl EditSuggestion {
    pub fn anchor(&self) -> Anchor {
        Anchor::new(self.block_id, self.start_offset, self.end_offset)
    }

    pub fn is_live(&self) -> bool {
        self.status == SuggestionStatus::Pending && !self.is_stale
    }
}

/// `GET /content` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentResponse {
    pub blocks: Vec<ContentBlock>,
    pub can_edit: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewComment {
    pub block_id: Uuid,
    pub start_offset: usize,
    pub end_offset: usize,
    pub selected_text: String,
    pub body: String,
}

impl NewComment {
    pub fn anchor(&self) -> Anchor {
        Anchor::new(self.block_id, self.start_offset, self.end_offset)
    }

    /// Checks that need no block content
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_body(&self.body, MAX_COMMENT_LEN)?;
        if self.start_offset >= self.end_offset {
            return Err(ValidationError::EmptyRange);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReply {
    pub body: String,
}

impl NewReply {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_body(&self.body, MAX_REPLY_LEN)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSuggestion {
    pub block_id: Uuid,
    pub start_offset: usize,
    pub end_offset: usize,
    pub original_text: String,
    pub suggested_text: String,
}

impl NewSuggestion {
    pub fn anchor(&self) -> Anchor {
        Anchor::new(self.block_id, self.start_offset, self.end_offset)
    }

    /// Checks that need no block content. A suggestion that would not change
    /// the text is a usage error.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.start_offset >= self.end_offset {
            return Err(ValidationError::EmptyRange);
        }
        if self.suggested_text == self.original_text {
            return Err(ValidationError::UnchangedSuggestion);
        }
        Ok(())
    }
}

/// Optional note attached to an accept or reject
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewNote {
    #[serde(default)]
    pub review_note: Option<String>,
}

/// `PUT /content/{id}` body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockUpdate {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub display_order: Option<i32>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// `GET /comments` filters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommentQuery {
    #[serde(default)]
    pub block_id: Option<Uuid>,
    /// Editors always see resolved comments
    #[serde(default)]
    pub include_resolved: bool,
}

impl CommentQuery {
    pub fn matches(&self, comment: &Comment, can_edit: bool) -> bool {
        self.block_id.map_or(true, |id| comment.block_id == id)
            && (self.include_resolved || can_edit || !comment.is_resolved)
    }
}

/// `GET /suggestions` filters. Without a status filter, non-editors only
/// see pending suggestions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuggestionQuery {
    #[serde(default)]
    pub block_id: Option<Uuid>,
    #[serde(default)]
    pub status_filter: Option<SuggestionStatus>,
}

impl SuggestionQuery {
    pub fn matches(&self, suggestion: &EditSuggestion, can_edit: bool) -> bool {
        let status_ok = match self.status_filter {
            Some(status) => suggestion.status == status,
            None => can_edit || suggestion.status == SuggestionStatus::Pending,
        };
        self.block_id.map_or(true, |id| suggestion.block_id == id) && status_ok
    }
}

/// `GET /review/pending` response, newest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingReview {
    pub comments: Vec<Comment>,
    pub suggestions: Vec<EditSuggestion>,
    pub total_pending: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    SuggestionAccepted,
    DirectEdit,
}

/// One recorded change of a block's markup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub block_id: Uuid,
    pub previous_content: String,
    pub new_content: String,
    pub change: ChangeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<ReplacementStrategy>,
    pub changed_by: Uuid,
    pub changed_at: DateTime<Utc>,
}

/// Input rejected before anything is persisted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("text must not be empty")]
    EmptyBody,

    #[error("text must be at most {max} characters")]
    BodyTooLong { max: usize },

    #[error("selection must cover at least one character")]
    EmptyRange,

    #[error("selection ends at {end} but the block has {len} characters")]
    RangeOutOfBounds { end: usize, len: usize },

    #[error("suggested text is identical to the original")]
    UnchangedSuggestion,

    #[error("original text does not match the block content")]
    OriginalTextMismatch,
}

fn validate_body(body: &str, max: usize) -> Result<(), ValidationError> {
    if body.trim().is_empty() {
        return Err(ValidationError::EmptyBody);
    }
    if body.chars().count() > max {
        return Err(ValidationError::BodyTooLong { max });
    }
    Ok(())
}
