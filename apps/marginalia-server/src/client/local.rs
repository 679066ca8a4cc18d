//! In-process implementation of the content API

use async_trait::async_trait;
use uuid::Uuid;

use super::{ApiError, ContentApi};
use crate::annotations::{
    Comment, ContentResponse, EditSuggestion, NewComment, NewReply, NewSuggestion, Reply,
    ReviewNote,
};
use crate::error::AppError;
use crate::service::ContentService;

/// Content API calling a [`ContentService`] directly, as `user_id`
#[derive(Clone)]
pub struct LocalContentApi {
    service: ContentService,
    user_id: Option<Uuid>,
}

impl LocalContentApi {
    pub fn new(service: ContentService, user_id: Option<Uuid>) -> Self {
        Self { service, user_id }
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError::Http {
            status: err.status_code().as_u16(),
            message: err.public_message(),
        }
    }
}

#[async_trait]
impl ContentApi for LocalContentApi {
    async fn fetch_content(&self) -> Result<ContentResponse, ApiError> {
        Ok(self.service.content(self.user_id).await)
    }

    async fn create_comment(&self, comment: &NewComment) -> Result<Comment, ApiError> {
        Ok(self
            .service
            .create_comment(self.user_id, comment.clone())
            .await?)
    }

    async fn delete_comment(&self, id: Uuid) -> Result<(), ApiError> {
        Ok(self.service.delete_comment(self.user_id, id).await?)
    }

    async fn resolve_comment(&self, id: Uuid) -> Result<Comment, ApiError> {
        Ok(self.service.resolve_comment(self.user_id, id).await?)
    }

    async fn reply_to_comment(&self, id: Uuid, reply: &NewReply) -> Result<Reply, ApiError> {
        Ok(self
            .service
            .reply_to_comment(self.user_id, id, reply.clone())
            .await?)
    }

    async fn create_suggestion(&self, suggestion: &NewSuggestion) -> Result<EditSuggestion, ApiError> {
        Ok(self
            .service
            .create_suggestion(self.user_id, suggestion.clone())
            .await?)
    }

    async fn delete_suggestion(&self, id: Uuid) -> Result<(), ApiError> {
        Ok(self.service.delete_suggestion(self.user_id, id).await?)
    }

    async fn accept_suggestion(&self, id: Uuid, note: &ReviewNote) -> Result<EditSuggestion, ApiError> {
        Ok(self
            .service
            .accept_suggestion(self.user_id, id, note.clone())
            .await?)
    }

    async fn reject_suggestion(&self, id: Uuid, note: &ReviewNote) -> Result<EditSuggestion, ApiError> {
        Ok(self
            .service
            .reject_suggestion(self.user_id, id, note.clone())
            .await?)
    }
}
