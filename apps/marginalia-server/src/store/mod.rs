//! Annotation store
//!
//! Client-side state for annotated content: the blocks with their comments
//! and suggestions, the live text selection, and the review panel. All
//! mutations go through the content API first and are folded into local
//! state only after the service confirms them; a failed call leaves the
//! state as it was and records the error for display.
//!
//! Accepting a suggestion changes block content, which moves other
//! anchors, so it is followed by a full reload instead of a local splice.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::annotations::{
    check_comment_action, check_suggestion_action, Actor, Anchor, Comment, CommentAction,
    ContentBlock, EditSuggestion, LifecycleError, NewComment, NewReply, NewSuggestion, Reply,
    ReviewNote, SuggestionAction, ValidationError,
};
use crate::client::{ApiError, ContentApi};
use crate::html::{
    compose_block, live_ranges, mark_active, ComposeError, HighlightAction, HighlightConfig,
    HighlightRange, HighlightTargets,
};
use crate::markup::RenderedTree;
use crate::selection::{capture, RawSelection, ScreenRect, TextSelection};

/// Review sidebar state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Panel {
    #[default]
    Closed,
    /// Showing the active annotation
    View,
    /// Writing a comment on the selection
    Comment,
    /// Writing a suggestion for the selection
    Suggest,
}

impl Panel {
    pub fn is_composer(&self) -> bool {
        matches!(self, Panel::Comment | Panel::Suggest)
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("no text is selected")]
    NoSelection,

    #[error("another change is being saved")]
    Busy,

    #[error("suggestion accepted, but reloading content failed: {0}")]
    Reload(ApiError),

    #[error(transparent)]
    Render(#[from] ComposeError),
}

/// Marks a submission as in flight until dropped
struct InFlight(Arc<AtomicBool>);

impl InFlight {
    fn begin(flag: &Arc<AtomicBool>) -> Result<Self, StoreError> {
        if flag.swap(true, Ordering::AcqRel) {
            return Err(StoreError::Busy);
        }
        Ok(Self(Arc::clone(flag)))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A block ready for display
#[derive(Debug)]
pub struct RenderedBlock {
    pub html: String,
    /// Click dispatch for the highlights in `html`
    pub targets: HighlightTargets,
}

pub struct AnnotationStore<A: ContentApi> {
    api: A,
    actor: Actor,
    blocks: Vec<ContentBlock>,
    loading: bool,
    submitting: Arc<AtomicBool>,
    error: Option<String>,
    selection: Option<TextSelection>,
    panel: Panel,
    active: Option<Uuid>,
    review_mode: bool,
    highlight: HighlightConfig,
}

impl<A: ContentApi> AnnotationStore<A> {
    pub fn new(api: A, user_id: Option<Uuid>) -> Self {
        Self::with_config(api, user_id, HighlightConfig::default())
    }

    pub fn with_config(api: A, user_id: Option<Uuid>, highlight: HighlightConfig) -> Self {
        Self {
            api,
            actor: Actor {
                user_id,
                can_edit: false,
            },
            blocks: Vec::new(),
            loading: false,
            submitting: Arc::new(AtomicBool::new(false)),
            error: None,
            selection: None,
            panel: Panel::Closed,
            active: None,
            review_mode: false,
            highlight,
        }
    }

    pub fn blocks(&self) -> &[ContentBlock] {
        &self.blocks
    }

    pub fn block(&self, id: Uuid) -> Option<&ContentBlock> {
        self.blocks.iter().find(|b| b.id == id)
    }

    pub fn can_edit(&self) -> bool {
        self.actor.can_edit
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    /// Shared in-flight flag, for disabling controls while a call is pending
    pub fn submitting_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.submitting)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn selection(&self) -> Option<&TextSelection> {
        self.selection.as_ref()
    }

    pub fn panel(&self) -> Panel {
        self.panel
    }

    pub fn active(&self) -> Option<Uuid> {
        self.active
    }

    pub fn review_mode(&self) -> bool {
        self.review_mode
    }

    /// Fetch all content, replacing local state
    pub async fn load(&mut self) -> Result<(), StoreError> {
        self.loading = true;
        let result = self.api.fetch_content().await;
        self.loading = false;

        match result {
            Ok(content) => {
                tracing::debug!(blocks = content.blocks.len(), can_edit = content.can_edit, "Content loaded");
                self.blocks = content.blocks;
                self.actor.can_edit = content.can_edit;
                self.error = None;
                Ok(())
            }
            Err(e) => Err(self.record(e.into())),
        }
    }

    // Selection and panel state

    /// Capture a selection made inside block `block_id`. Unusable
    /// selections are ignored.
    pub fn capture_selection(
        &mut self,
        tree: &RenderedTree,
        block_id: Uuid,
        raw: &RawSelection,
    ) -> Option<&TextSelection> {
        self.block(block_id)?;
        match capture(tree, block_id, raw) {
            Ok(selection) => {
                self.selection = Some(selection);
                self.selection.as_ref()
            }
            Err(e) => {
                tracing::debug!(block_id = %block_id, reason = %e, "Ignoring selection");
                None
            }
        }
    }

    /// Follow the selection after a scroll
    pub fn selection_moved(&mut self, rect: ScreenRect) {
        if let Some(selection) = self.selection.as_mut() {
            selection.reposition(rect);
        }
    }

    /// The underlying selection is gone: drop it and any open composer
    pub fn selection_lost(&mut self) {
        self.selection = None;
        if self.panel.is_composer() {
            self.panel = Panel::Closed;
        }
    }

    /// Open the comment or suggestion composer for the current selection
    pub fn open_composer(&mut self, panel: Panel) -> Result<(), StoreError> {
        if self.selection.is_none() {
            return Err(StoreError::NoSelection);
        }
        self.panel = panel;
        Ok(())
    }

    pub fn close_sidebar(&mut self) {
        self.panel = Panel::Closed;
        self.active = None;
    }

    pub fn toggle_review_mode(&mut self) {
        self.review_mode = !self.review_mode;
        if !self.review_mode {
            self.close_sidebar();
        }
    }

    // Rendering

    /// Highlight ranges of the block's live annotations
    pub fn highlight_ranges(&self, block_id: Uuid) -> Vec<HighlightRange> {
        self.block(block_id).map(live_ranges).unwrap_or_default()
    }

    /// Markup for a block: raw content outside review mode, highlighted
    /// content in it, with the active annotation marked
    pub fn render_block(&self, block_id: Uuid) -> Result<RenderedBlock, StoreError> {
        let block = self.block(block_id).ok_or(StoreError::NotFound("block"))?;

        if !self.review_mode {
            return Ok(RenderedBlock {
                html: block.content.clone(),
                targets: HighlightTargets::default(),
            });
        }

        let composed = compose_block(block, &self.highlight);
        let html = match self.active {
            Some(id) if composed.targets.action_for(id).is_some() => {
                mark_active(&composed.html, id, &self.highlight)?
            }
            _ => composed.html,
        };

        Ok(RenderedBlock {
            html,
            targets: composed.targets,
        })
    }

    /// Handle a click on the highlight carrying `id`
    pub fn activate_highlight(&mut self, targets: &HighlightTargets, id: Uuid) -> Option<HighlightAction> {
        let action = targets.action_for(id)?;
        self.active = Some(id);
        self.panel = Panel::View;
        Some(action)
    }

    // Mutations

    pub async fn create_comment(&mut self, anchor: Anchor, body: &str) -> Result<Comment, StoreError> {
        let block = self.block(anchor.block_id).ok_or(StoreError::NotFound("block"))?;
        anchor.validate(block.plain_len())?;
        let new = NewComment {
            block_id: anchor.block_id,
            start_offset: anchor.start_offset,
            end_offset: anchor.end_offset,
            selected_text: block
                .text_at(anchor.start_offset, anchor.end_offset)
                .unwrap_or_default(),
            body: body.to_string(),
        };
        new.validate()?;

        let _in_flight = InFlight::begin(&self.submitting)?;
        let comment = self.api.create_comment(&new).await.map_err(|e| self.record(e.into()))?;

        if let Some(block) = self.block_mut(comment.block_id) {
            block.comments.push(comment.clone());
        }
        self.reset_review_ui();
        Ok(comment)
    }

    pub async fn delete_comment(&mut self, id: Uuid) -> Result<(), StoreError> {
        let (block_id, comment) = self.find_comment(id)?;
        check_comment_action(comment, CommentAction::Delete, &self.actor)?;

        let _in_flight = InFlight::begin(&self.submitting)?;
        self.api.delete_comment(id).await.map_err(|e| self.record(e.into()))?;

        if let Some(block) = self.block_mut(block_id) {
            block.comments.retain(|c| c.id != id);
        }
        self.reset_review_ui();
        Ok(())
    }

    pub async fn resolve_comment(&mut self, id: Uuid) -> Result<Comment, StoreError> {
        let (block_id, comment) = self.find_comment(id)?;
        check_comment_action(comment, CommentAction::Resolve, &self.actor)?;

        let _in_flight = InFlight::begin(&self.submitting)?;
        let resolved = self.api.resolve_comment(id).await.map_err(|e| self.record(e.into()))?;

        self.replace_comment(block_id, resolved.clone());
        self.reset_review_ui();
        Ok(resolved)
    }

    pub async fn reply_to_comment(&mut self, id: Uuid, body: &str) -> Result<Reply, StoreError> {
        let (block_id, comment) = self.find_comment(id)?;
        check_comment_action(comment, CommentAction::Reply, &self.actor)?;
        let new = NewReply {
            body: body.to_string(),
        };
        new.validate()?;

        let _in_flight = InFlight::begin(&self.submitting)?;
        let reply = self
            .api
            .reply_to_comment(id, &new)
            .await
            .map_err(|e| self.record(e.into()))?;

        if let Some(comment) = self
            .block_mut(block_id)
            .and_then(|b| b.comments.iter_mut().find(|c| c.id == id))
        {
            comment.replies.push(reply.clone());
        }
        Ok(reply)
    }

    /// Propose `suggested_text` for the anchored span. A suggestion that
    /// would not change the text is rejected without calling the service.
    pub async fn create_suggestion(
        &mut self,
        anchor: Anchor,
        suggested_text: &str,
    ) -> Result<EditSuggestion, StoreError> {
        let block = self.block(anchor.block_id).ok_or(StoreError::NotFound("block"))?;
        anchor.validate(block.plain_len())?;
        let new = NewSuggestion {
            block_id: anchor.block_id,
            start_offset: anchor.start_offset,
            end_offset: anchor.end_offset,
            original_text: block
                .text_at(anchor.start_offset, anchor.end_offset)
                .unwrap_or_default(),
            suggested_text: suggested_text.to_string(),
        };
        new.validate()?;

        let _in_flight = InFlight::begin(&self.submitting)?;
        let suggestion = self
            .api
            .create_suggestion(&new)
            .await
            .map_err(|e| self.record(e.into()))?;

        if let Some(block) = self.block_mut(suggestion.block_id) {
            block.suggestions.push(suggestion.clone());
        }
        self.reset_review_ui();
        Ok(suggestion)
    }

    pub async fn delete_suggestion(&mut self, id: Uuid) -> Result<(), StoreError> {
        let (block_id, suggestion) = self.find_suggestion(id)?;
        check_suggestion_action(suggestion, SuggestionAction::Delete, &self.actor)?;

        let _in_flight = InFlight::begin(&self.submitting)?;
        self.api.delete_suggestion(id).await.map_err(|e| self.record(e.into()))?;

        if let Some(block) = self.block_mut(block_id) {
            block.suggestions.retain(|s| s.id != id);
        }
        self.reset_review_ui();
        Ok(())
    }

    /// Accept a suggestion, then reload all content.
    ///
    /// If the reload fails, the accepted record is still folded in and the
    /// error is returned as [`StoreError::Reload`].
    pub async fn accept_suggestion(
        &mut self,
        id: Uuid,
        note: Option<String>,
    ) -> Result<EditSuggestion, StoreError> {
        let (block_id, suggestion) = self.find_suggestion(id)?;
        check_suggestion_action(suggestion, SuggestionAction::Accept, &self.actor)?;

        let _in_flight = InFlight::begin(&self.submitting)?;
        let accepted = self
            .api
            .accept_suggestion(id, &ReviewNote { review_note: note })
            .await
            .map_err(|e| self.record(e.into()))?;

        self.replace_suggestion(block_id, accepted.clone());
        self.reset_review_ui();

        match self.api.fetch_content().await {
            Ok(content) => {
                self.blocks = content.blocks;
                self.actor.can_edit = content.can_edit;
                Ok(accepted)
            }
            Err(e) => {
                tracing::warn!(suggestion_id = %id, error = %e, "Reload after accept failed");
                Err(self.record(StoreError::Reload(e)))
            }
        }
    }

    /// Reject a suggestion; content is untouched
    pub async fn reject_suggestion(
        &mut self,
        id: Uuid,
        note: Option<String>,
    ) -> Result<EditSuggestion, StoreError> {
        let (block_id, suggestion) = self.find_suggestion(id)?;
        check_suggestion_action(suggestion, SuggestionAction::Reject, &self.actor)?;

        let _in_flight = InFlight::begin(&self.submitting)?;
        let rejected = self
            .api
            .reject_suggestion(id, &ReviewNote { review_note: note })
            .await
            .map_err(|e| self.record(e.into()))?;

        self.replace_suggestion(block_id, rejected.clone());
        Ok(rejected)
    }

    // Helpers

    /// Remember a persistence error for display and hand it back
    fn record(&mut self, err: StoreError) -> StoreError {
        self.error = Some(err.to_string());
        err
    }

    fn reset_review_ui(&mut self) {
        self.selection = None;
        self.panel = Panel::Closed;
        self.active = None;
    }

    fn block_mut(&mut self, id: Uuid) -> Option<&mut ContentBlock> {
        self.blocks.iter_mut().find(|b| b.id == id)
    }

    fn find_comment(&self, id: Uuid) -> Result<(Uuid, &Comment), StoreError> {
        self.blocks
            .iter()
            .find_map(|b| b.comments.iter().find(|c| c.id == id).map(|c| (b.id, c)))
            .ok_or(StoreError::NotFound("comment"))
    }

    fn find_suggestion(&self, id: Uuid) -> Result<(Uuid, &EditSuggestion), StoreError> {
        self.blocks
            .iter()
            .find_map(|b| b.suggestions.iter().find(|s| s.id == id).map(|s| (b.id, s)))
            .ok_or(StoreError::NotFound("suggestion"))
    }

    fn replace_comment(&mut self, block_id: Uuid, comment: Comment) {
        if let Some(slot) = self
            .block_mut(block_id)
            .and_then(|b| b.comments.iter_mut().find(|c| c.id == comment.id))
        {
            *slot = comment;
        }
    }

    fn replace_suggestion(&mut self, block_id: Uuid, suggestion: EditSuggestion) {
        if let Some(slot) = self
            .block_mut(block_id)
            .and_then(|b| b.suggestions.iter_mut().find(|s| s.id == suggestion.id))
        {
            *slot = suggestion;
        }
    }
}
