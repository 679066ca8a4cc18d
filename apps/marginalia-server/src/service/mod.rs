//! Content service
//!
//! Authoritative in-memory state for content blocks, their annotations and
//! the content history. Every operation validates its input, checks the
//! caller's permissions, and only then mutates state under the write lock.

mod seed;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::annotations::{
    check_comment_action, check_suggestion_action, invalidate_mismatched, rebase_block, Actor,
    BlockUpdate, ChangeKind, Comment, CommentAction, CommentQuery, ContentBlock, ContentResponse,
    EditSuggestion, HistoryEntry, LifecycleError, NewComment, NewReply, NewSuggestion,
    PendingReview, Reply, ReviewNote, SuggestionAction, SuggestionQuery, SuggestionStatus,
    TextEdit, ValidationError,
};
use crate::error::{AppError, Result};
use crate::markup::{apply_text_replacement, ReplacementStrategy};

pub use seed::{default_blocks, load_seed};

/// Counts reported by the health endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServiceStats {
    pub blocks: usize,
    pub pending_suggestions: usize,
    pub open_comments: usize,
}

/// Shared handle to the content service
#[derive(Clone)]
pub struct ContentService {
    inner: Arc<ServiceInner>,
}

struct ServiceInner {
    /// Users with edit authority
    editors: HashSet<Uuid>,
    state: RwLock<ReviewState>,
}

#[derive(Default)]
struct ReviewState {
    blocks: Vec<ContentBlock>,
    history: Vec<HistoryEntry>,
}

impl ReviewState {
    fn block_mut(&mut self, id: Uuid) -> Result<&mut ContentBlock> {
        self.blocks
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| AppError::NotFound("Content block not found".to_string()))
    }

    /// (block index, comment index)
    fn locate_comment(&self, id: Uuid) -> Result<(usize, usize)> {
        self.blocks
            .iter()
            .enumerate()
            .find_map(|(b, block)| {
                block
                    .comments
                    .iter()
                    .position(|c| c.id == id)
                    .map(|c| (b, c))
            })
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))
    }

    /// (block index, suggestion index)
    fn locate_suggestion(&self, id: Uuid) -> Result<(usize, usize)> {
        self.blocks
            .iter()
            .enumerate()
            .find_map(|(b, block)| {
                block
                    .suggestions
                    .iter()
                    .position(|s| s.id == id)
                    .map(|s| (b, s))
            })
            .ok_or_else(|| AppError::NotFound("Suggestion not found".to_string()))
    }
}

impl ContentService {
    pub fn new(blocks: Vec<ContentBlock>, editors: impl IntoIterator<Item = Uuid>) -> Self {
        let mut blocks = blocks;
        blocks.sort_by_key(|b| b.display_order);

        Self {
            inner: Arc::new(ServiceInner {
                editors: editors.into_iter().collect(),
                state: RwLock::new(ReviewState {
                    blocks,
                    history: Vec::new(),
                }),
            }),
        }
    }

    /// Identity context for a caller
    pub fn actor(&self, user_id: Option<Uuid>) -> Actor {
        Actor {
            user_id,
            can_edit: user_id.is_some_and(|id| self.inner.editors.contains(&id)),
        }
    }

    fn require_editor(&self, user_id: Option<Uuid>) -> Result<Actor> {
        let actor = self.actor(user_id);
        match actor {
            Actor { user_id: None, .. } => Err(LifecycleError::Unauthenticated.into()),
            Actor { can_edit: false, .. } => Err(LifecycleError::NotEditor.into()),
            _ => Ok(actor),
        }
    }

    /// Active blocks in display order with the annotations the caller may
    /// see: everything for editors, live annotations for other users,
    /// nothing for anonymous callers
    pub async fn content(&self, user_id: Option<Uuid>) -> ContentResponse {
        let actor = self.actor(user_id);
        let state = self.inner.state.read().await;

        let blocks = state
            .blocks
            .iter()
            .filter(|block| block.is_active)
            .map(|block| {
                let mut block = block.clone();
                match actor {
                    Actor { can_edit: true, .. } => {}
                    Actor { user_id: Some(_), .. } => {
                        block.comments.retain(|c| !c.is_resolved);
                        block
                            .suggestions
                            .retain(|s| s.status == SuggestionStatus::Pending);
                    }
                    Actor { user_id: None, .. } => {
                        block.comments.clear();
                        block.suggestions.clear();
                    }
                }
                block.comments.sort_by_key(|c| c.created_at);
                block.suggestions.sort_by_key(|s| s.created_at);
                block
            })
            .collect();

        ContentResponse {
            blocks,
            can_edit: actor.can_edit,
        }
    }

    pub async fn create_comment(&self, user_id: Option<Uuid>, new: NewComment) -> Result<Comment> {
        let author_id = user_id.ok_or(LifecycleError::Unauthenticated)?;
        new.validate()?;

        let mut state = self.inner.state.write().await;
        let block = state.block_mut(new.block_id)?;
        new.anchor().validate(block.plain_len())?;
        let selected_text = block
            .text_at(new.start_offset, new.end_offset)
            .ok_or(ValidationError::RangeOutOfBounds {
                end: new.end_offset,
                len: block.plain_len(),
            })?;
        if selected_text.trim() != new.selected_text.trim() {
            tracing::debug!(
                block_id = %block.id,
                client = %new.selected_text,
                "Selected text snapshot replaced by block text"
            );
        }

        let comment = Comment {
            id: Uuid::new_v4(),
            block_id: block.id,
            author_id,
            start_offset: new.start_offset,
            end_offset: new.end_offset,
            selected_text,
            body: new.body.trim().to_string(),
            is_resolved: false,
            resolved_by: None,
            resolved_at: None,
            is_stale: false,
            created_at: Utc::now(),
            replies: Vec::new(),
        };
        block.comments.push(comment.clone());

        tracing::info!(comment_id = %comment.id, block_id = %block.id, "Comment created");
        Ok(comment)
    }

    /// Comments matching `query`, oldest first
    pub async fn list_comments(
        &self,
        user_id: Option<Uuid>,
        query: CommentQuery,
    ) -> Result<Vec<Comment>> {
        let actor = self.actor(user_id);
        actor.user_id.ok_or(LifecycleError::Unauthenticated)?;
        let state = self.inner.state.read().await;

        let mut comments: Vec<Comment> = state
            .blocks
            .iter()
            .flat_map(|b| b.comments.iter())
            .filter(|c| query.matches(c, actor.can_edit))
            .cloned()
            .collect();
        comments.sort_by_key(|c| c.created_at);
        Ok(comments)
    }

    pub async fn delete_comment(&self, user_id: Option<Uuid>, id: Uuid) -> Result<()> {
        let actor = self.actor(user_id);
        let mut state = self.inner.state.write().await;
        let (b, c) = state.locate_comment(id)?;

        check_comment_action(&state.blocks[b].comments[c], CommentAction::Delete, &actor)?;
        state.blocks[b].comments.remove(c);

        tracing::info!(comment_id = %id, "Comment deleted");
        Ok(())
    }

    pub async fn resolve_comment(&self, user_id: Option<Uuid>, id: Uuid) -> Result<Comment> {
        let actor = self.actor(user_id);
        let mut state = self.inner.state.write().await;
        let (b, c) = state.locate_comment(id)?;

        let comment = &mut state.blocks[b].comments[c];
        check_comment_action(comment, CommentAction::Resolve, &actor)?;
        comment.is_resolved = true;
        comment.resolved_by = actor.user_id;
        comment.resolved_at = Some(Utc::now());

        tracing::info!(comment_id = %id, "Comment resolved");
        Ok(comment.clone())
    }

    pub async fn reply_to_comment(
        &self,
        user_id: Option<Uuid>,
        id: Uuid,
        new: NewReply,
    ) -> Result<Reply> {
        let actor = self.actor(user_id);
        new.validate()?;

        let mut state = self.inner.state.write().await;
        let (b, c) = state.locate_comment(id)?;

        let comment = &mut state.blocks[b].comments[c];
        check_comment_action(comment, CommentAction::Reply, &actor)?;

        let reply = Reply {
            id: Uuid::new_v4(),
            comment_id: comment.id,
            author_id: actor.user_id.ok_or(LifecycleError::Unauthenticated)?,
            body: new.body.trim().to_string(),
            created_at: Utc::now(),
        };
        comment.replies.push(reply.clone());

        tracing::debug!(comment_id = %id, reply_id = %reply.id, "Reply added");
        Ok(reply)
    }

    /// Create a pending suggestion. The original text must match the block's
    /// current text, and the span may not overlap another live suggestion.
    pub async fn create_suggestion(
        &self,
        user_id: Option<Uuid>,
        new: NewSuggestion,
    ) -> Result<EditSuggestion> {
        let author_id = user_id.ok_or(LifecycleError::Unauthenticated)?;
        new.validate()?;

        let mut state = self.inner.state.write().await;
        let block = state.block_mut(new.block_id)?;
        let anchor = new.anchor();
        anchor.validate(block.plain_len())?;

        if block.text_at(new.start_offset, new.end_offset).as_deref() != Some(new.original_text.as_str()) {
            return Err(ValidationError::OriginalTextMismatch.into());
        }

        if block
            .suggestions
            .iter()
            .any(|s| s.is_live() && anchor.overlaps(s.start_offset, s.end_offset))
        {
            return Err(AppError::Conflict(
                "Another pending suggestion overlaps this text".to_string(),
            ));
        }

        let suggestion = EditSuggestion {
            id: Uuid::new_v4(),
            block_id: block.id,
            author_id,
            start_offset: new.start_offset,
            end_offset: new.end_offset,
            original_text: new.original_text,
            suggested_text: new.suggested_text,
            status: SuggestionStatus::Pending,
            reviewed_by: None,
            reviewed_at: None,
            review_note: None,
            is_stale: false,
            created_at: Utc::now(),
        };
        block.suggestions.push(suggestion.clone());

        tracing::info!(suggestion_id = %suggestion.id, block_id = %block.id, "Suggestion created");
        Ok(suggestion)
    }

    /// Suggestions matching `query`, oldest first
    pub async fn list_suggestions(
        &self,
        user_id: Option<Uuid>,
        query: SuggestionQuery,
    ) -> Result<Vec<EditSuggestion>> {
        let actor = self.actor(user_id);
        actor.user_id.ok_or(LifecycleError::Unauthenticated)?;
        let state = self.inner.state.read().await;

        let mut suggestions: Vec<EditSuggestion> = state
            .blocks
            .iter()
            .flat_map(|b| b.suggestions.iter())
            .filter(|s| query.matches(s, actor.can_edit))
            .cloned()
            .collect();
        suggestions.sort_by_key(|s| s.created_at);
        Ok(suggestions)
    }

    pub async fn delete_suggestion(&self, user_id: Option<Uuid>, id: Uuid) -> Result<()> {
        let actor = self.actor(user_id);
        let mut state = self.inner.state.write().await;
        let (b, s) = state.locate_suggestion(id)?;

        check_suggestion_action(&state.blocks[b].suggestions[s], SuggestionAction::Delete, &actor)?;
        state.blocks[b].suggestions.remove(s);

        tracing::info!(suggestion_id = %id, "Suggestion deleted");
        Ok(())
    }

    /// Accept a suggestion and apply it to the block content.
    ///
    /// When the edit could be applied at the stored offsets, the other
    /// anchors of the block are rebased; after a text-search fallback, the
    /// anchors whose text changed are marked stale instead.
    pub async fn accept_suggestion(
        &self,
        user_id: Option<Uuid>,
        id: Uuid,
        note: ReviewNote,
    ) -> Result<EditSuggestion> {
        let actor = self.actor(user_id);
        let mut guard = self.inner.state.write().await;
        let state = &mut *guard;
        let (b, s) = state.locate_suggestion(id)?;

        let block = &mut state.blocks[b];
        check_suggestion_action(&block.suggestions[s], SuggestionAction::Accept, &actor)?;
        let reviewer = actor.user_id.ok_or(LifecycleError::Unauthenticated)?;

        let suggestion = &block.suggestions[s];
        let replacement = apply_text_replacement(
            &block.content,
            suggestion.start_offset,
            suggestion.end_offset,
            &suggestion.original_text,
            &suggestion.suggested_text,
        );
        let edit = TextEdit::with_len(
            suggestion.start_offset,
            suggestion.end_offset,
            replacement.inserted_len,
        );

        let previous = std::mem::replace(&mut block.content, replacement.content.clone());
        match replacement.strategy {
            ReplacementStrategy::Offsets => {
                let summary = rebase_block(block, &edit, Some(id));
                tracing::debug!(
                    block_id = %block.id,
                    shifted = summary.shifted,
                    invalidated = summary.invalidated,
                    "Rebased annotations"
                );
            }
            ReplacementStrategy::TextSearch => {
                invalidate_mismatched(block);
            }
            ReplacementStrategy::Unchanged => {
                tracing::warn!(
                    suggestion_id = %id,
                    block_id = %block.id,
                    "Original text not found; content left unchanged"
                );
            }
        }

        let now = Utc::now();
        if replacement.strategy != ReplacementStrategy::Unchanged {
            block.updated_at = now;
        }

        let suggestion = &mut block.suggestions[s];
        suggestion.status = SuggestionStatus::Accepted;
        suggestion.reviewed_by = Some(reviewer);
        suggestion.reviewed_at = Some(now);
        suggestion.review_note = note.review_note;
        let accepted = suggestion.clone();

        state.history.push(HistoryEntry {
            id: Uuid::new_v4(),
            block_id: accepted.block_id,
            previous_content: previous,
            new_content: replacement.content,
            change: ChangeKind::SuggestionAccepted,
            suggestion_id: Some(id),
            strategy: Some(replacement.strategy),
            changed_by: reviewer,
            changed_at: now,
        });

        tracing::info!(
            suggestion_id = %id,
            block_id = %accepted.block_id,
            strategy = ?replacement.strategy,
            "Suggestion accepted"
        );
        Ok(accepted)
    }

    pub async fn reject_suggestion(
        &self,
        user_id: Option<Uuid>,
        id: Uuid,
        note: ReviewNote,
    ) -> Result<EditSuggestion> {
        let actor = self.actor(user_id);
        let mut state = self.inner.state.write().await;
        let (b, s) = state.locate_suggestion(id)?;

        let suggestion = &mut state.blocks[b].suggestions[s];
        check_suggestion_action(suggestion, SuggestionAction::Reject, &actor)?;
        suggestion.status = SuggestionStatus::Rejected;
        suggestion.reviewed_by = actor.user_id;
        suggestion.reviewed_at = Some(Utc::now());
        suggestion.review_note = note.review_note;

        tracing::info!(suggestion_id = %id, "Suggestion rejected");
        Ok(suggestion.clone())
    }

    /// Replace a block's content, move it, or switch it on or off. Anchors
    /// whose text changed are marked stale.
    pub async fn update_block(
        &self,
        user_id: Option<Uuid>,
        id: Uuid,
        update: BlockUpdate,
    ) -> Result<ContentBlock> {
        let actor = self.require_editor(user_id)?;
        let editor = actor.user_id.ok_or(LifecycleError::Unauthenticated)?;

        let mut guard = self.inner.state.write().await;
        let state = &mut *guard;
        let block = state.block_mut(id)?;
        let now = Utc::now();

        if let Some(content) = update.content.filter(|c| *c != block.content) {
            let previous = std::mem::replace(&mut block.content, content);
            let invalidated = invalidate_mismatched(block);
            block.updated_at = now;

            let entry = HistoryEntry {
                id: Uuid::new_v4(),
                block_id: id,
                previous_content: previous,
                new_content: block.content.clone(),
                change: ChangeKind::DirectEdit,
                suggestion_id: None,
                strategy: None,
                changed_by: editor,
                changed_at: now,
            };
            tracing::info!(block_id = %id, invalidated, "Block content updated");
            state.history.push(entry);
        }

        let block = state.block_mut(id)?;
        if let Some(order) = update.display_order {
            block.display_order = order;
            block.updated_at = now;
        }
        if let Some(active) = update.is_active.filter(|a| *a != block.is_active) {
            block.is_active = active;
            block.updated_at = now;
            tracing::info!(block_id = %id, active, "Block visibility changed");
        }
        let updated = block.clone();
        state.blocks.sort_by_key(|b| b.display_order);

        Ok(updated)
    }

    /// Unresolved comments and pending suggestions across all blocks,
    /// newest first
    pub async fn pending_review(&self, user_id: Option<Uuid>) -> Result<PendingReview> {
        self.require_editor(user_id)?;
        let state = self.inner.state.read().await;

        let mut comments: Vec<Comment> = state
            .blocks
            .iter()
            .flat_map(|b| b.comments.iter().filter(|c| !c.is_resolved).cloned())
            .collect();
        let mut suggestions: Vec<EditSuggestion> = state
            .blocks
            .iter()
            .flat_map(|b| {
                b.suggestions
                    .iter()
                    .filter(|s| s.status == SuggestionStatus::Pending)
                    .cloned()
            })
            .collect();
        comments.sort_by_key(|c| std::cmp::Reverse(c.created_at));
        suggestions.sort_by_key(|s| std::cmp::Reverse(s.created_at));

        Ok(PendingReview {
            total_pending: comments.len() + suggestions.len(),
            comments,
            suggestions,
        })
    }

    /// Counts of blocks and of the annotations still highlighted
    pub async fn stats(&self) -> ServiceStats {
        let state = self.inner.state.read().await;
        ServiceStats {
            blocks: state.blocks.len(),
            pending_suggestions: state
                .blocks
                .iter()
                .map(|b| b.suggestions.iter().filter(|s| s.is_live()).count())
                .sum(),
            open_comments: state
                .blocks
                .iter()
                .map(|b| b.comments.iter().filter(|c| c.is_live()).count())
                .sum(),
        }
    }

    /// Content history, oldest first
    pub async fn history(&self, user_id: Option<Uuid>) -> Result<Vec<HistoryEntry>> {
        self.require_editor(user_id)?;
        Ok(self.inner.state.read().await.history.clone())
    }
}
