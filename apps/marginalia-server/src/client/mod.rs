//! Content API client
//!
//! The annotation store talks to the content service only through
//! [`ContentApi`]. Every mutating call returns the authoritative record
//! the service stored.

mod http;
mod local;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::annotations::{
    Comment, ContentResponse, EditSuggestion, NewComment, NewReply, NewSuggestion, Reply,
    ReviewNote,
};

pub use http::HttpContentApi;
pub use local::LocalContentApi;

/// Header carrying the caller's user id
pub const USER_ID_HEADER: &str = "x-user-id";

/// Content service operations used by the annotation store
#[async_trait]
pub trait ContentApi: Send + Sync {
    /// All blocks in display order, with the annotations visible to the caller
    async fn fetch_content(&self) -> Result<ContentResponse, ApiError>;

    async fn create_comment(&self, comment: &NewComment) -> Result<Comment, ApiError>;

    async fn delete_comment(&self, id: Uuid) -> Result<(), ApiError>;

    async fn resolve_comment(&self, id: Uuid) -> Result<Comment, ApiError>;

    async fn reply_to_comment(&self, id: Uuid, reply: &NewReply) -> Result<Reply, ApiError>;

    async fn create_suggestion(&self, suggestion: &NewSuggestion) -> Result<EditSuggestion, ApiError>;

    async fn delete_suggestion(&self, id: Uuid) -> Result<(), ApiError>;

    async fn accept_suggestion(&self, id: Uuid, note: &ReviewNote) -> Result<EditSuggestion, ApiError>;

    async fn reject_suggestion(&self, id: Uuid, note: &ReviewNote) -> Result<EditSuggestion, ApiError>;
}

/// Content API failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The service answered with an error status
    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
