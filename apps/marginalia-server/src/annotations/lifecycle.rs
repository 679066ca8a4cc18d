//! Suggestion lifecycle and annotation permissions
//!
//! A suggestion starts `pending` and ends `accepted` or `rejected`; both
//! are terminal. Only a reviewer (edit authority, not the author) moves a
//! suggestion out of `pending`. Deletion is list removal rather than a
//! status.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::types::{Comment, EditSuggestion};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionStatus {
    Pending,
    Accepted,
    Rejected,
}

impl SuggestionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SuggestionStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionStatus::Pending => "pending",
            SuggestionStatus::Accepted => "accepted",
            SuggestionStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for SuggestionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who is acting, as far as annotations are concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Actor {
    /// `None` for anonymous callers
    pub user_id: Option<Uuid>,
    /// Edit authority over the content
    pub can_edit: bool,
}

/// An actor's relation to one annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorRole {
    Author,
    Reviewer,
    Reader,
}

impl Actor {
    pub fn new(user_id: Uuid, can_edit: bool) -> Self {
        Self {
            user_id: Some(user_id),
            can_edit,
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Authorship takes precedence over edit authority
    pub fn role_for(&self, author_id: Uuid) -> ActorRole {
        match self.user_id {
            Some(id) if id == author_id => ActorRole::Author,
            Some(_) if self.can_edit => ActorRole::Reviewer,
            _ => ActorRole::Reader,
        }
    }

    fn require_user(&self) -> Result<Uuid, LifecycleError> {
        self.user_id.ok_or(LifecycleError::Unauthenticated)
    }
}

/// Whether `role` may move a suggestion from `current` to `next`
pub fn can_transition(current: SuggestionStatus, next: SuggestionStatus, role: ActorRole) -> bool {
    use SuggestionStatus::*;

    matches!(
        (current, next, role),
        (Pending, Accepted | Rejected, ActorRole::Reviewer)
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionAction {
    Accept,
    Reject,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentAction {
    Reply,
    Resolve,
    Delete,
}

/// Check that `actor` may apply `action` to `suggestion`
pub fn check_suggestion_action(
    suggestion: &EditSuggestion,
    action: SuggestionAction,
    actor: &Actor,
) -> Result<(), LifecycleError> {
    actor.require_user()?;
    let role = actor.role_for(suggestion.author_id);

    let next = match action {
        SuggestionAction::Accept => SuggestionStatus::Accepted,
        SuggestionAction::Reject => SuggestionStatus::Rejected,
        SuggestionAction::Delete => {
            return match role {
                _ if actor.can_edit => Ok(()),
                ActorRole::Author if suggestion.status == SuggestionStatus::Pending => Ok(()),
                ActorRole::Author => Err(LifecycleError::AlreadyReviewed(suggestion.status)),
                _ => Err(LifecycleError::NotAuthor),
            };
        }
    };

    if can_transition(suggestion.status, next, role) {
        return Ok(());
    }

    Err(if !actor.can_edit {
        LifecycleError::NotEditor
    } else if role == ActorRole::Author {
        LifecycleError::SelfReview
    } else {
        LifecycleError::AlreadyReviewed(suggestion.status)
    })
}

/// Check that `actor` may apply `action` to `comment`
pub fn check_comment_action(
    comment: &Comment,
    action: CommentAction,
    actor: &Actor,
) -> Result<(), LifecycleError> {
    let user_id = actor.require_user()?;

    match action {
        CommentAction::Reply => Ok(()),
        CommentAction::Resolve if !actor.can_edit => Err(LifecycleError::NotEditor),
        CommentAction::Resolve if comment.is_resolved => Err(LifecycleError::AlreadyResolved),
        CommentAction::Resolve => Ok(()),
        CommentAction::Delete if comment.author_id == user_id || actor.can_edit => Ok(()),
        CommentAction::Delete => Err(LifecycleError::NotAuthor),
    }
}

/// A transition or action the actor is not allowed to perform
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("sign in to annotate")]
    Unauthenticated,

    #[error("edit authority required")]
    NotEditor,

    #[error("only the author may do this")]
    NotAuthor,

    #[error("authors cannot review their own suggestions")]
    SelfReview,

    #[error("suggestion is already {0}")]
    AlreadyReviewed(SuggestionStatus),

    #[error("comment is already resolved")]
    AlreadyResolved,
}

impl LifecycleError {
    /// Whether the error is about who is acting rather than the record's state
    pub fn is_authorization(&self) -> bool {
        matches!(
            self,
            LifecycleError::Unauthenticated
                | LifecycleError::NotEditor
                | LifecycleError::NotAuthor
                | LifecycleError::SelfReview
        )
    }
}
