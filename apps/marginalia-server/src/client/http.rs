//! reqwest implementation of the content API

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use uuid::Uuid;

use super::{ApiError, ContentApi, USER_ID_HEADER};
use crate::annotations::{
    Comment, ContentResponse, EditSuggestion, NewComment, NewReply, NewSuggestion, Reply,
    ReviewNote,
};

/// Content API over HTTP
#[derive(Debug, Clone)]
pub struct HttpContentApi {
    client: Client,
    /// Service root including the API prefix, e.g. `http://host:3000/api/v1`
    base_url: String,
    user_id: Option<Uuid>,
}

/// Error body the service sends with non-2xx responses
#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl HttpContentApi {
    pub fn new(base_url: &str, user_id: Option<Uuid>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            user_id,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let request = match self.user_id {
            Some(id) => request.header(USER_ID_HEADER, id.to_string()),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.message)
            .unwrap_or_else(|_| {
                if body.is_empty() {
                    status.to_string()
                } else {
                    body
                }
            });

        tracing::debug!(status = status.as_u16(), message = %message, "Content API error");
        Err(ApiError::Http {
            status: status.as_u16(),
            message,
        })
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        self.send(request)
            .await?
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ContentApi for HttpContentApi {
    async fn fetch_content(&self) -> Result<ContentResponse, ApiError> {
        self.json(self.client.get(self.url("/content"))).await
    }

    async fn create_comment(&self, comment: &NewComment) -> Result<Comment, ApiError> {
        self.json(self.client.post(self.url("/comments")).json(comment))
            .await
    }

    async fn delete_comment(&self, id: Uuid) -> Result<(), ApiError> {
        self.send(self.client.delete(self.url(&format!("/comments/{}", id))))
            .await
            .map(|_| ())
    }

    async fn resolve_comment(&self, id: Uuid) -> Result<Comment, ApiError> {
        self.json(
            self.client
                .post(self.url(&format!("/comments/{}/resolve", id))),
        )
        .await
    }

    async fn reply_to_comment(&self, id: Uuid, reply: &NewReply) -> Result<Reply, ApiError> {
        self.json(
            self.client
                .post(self.url(&format!("/comments/{}/reply", id)))
                .json(reply),
        )
        .await
    }

    async fn create_suggestion(&self, suggestion: &NewSuggestion) -> Result<EditSuggestion, ApiError> {
        self.json(self.client.post(self.url("/suggestions")).json(suggestion))
            .await
    }

    async fn delete_suggestion(&self, id: Uuid) -> Result<(), ApiError> {
        self.send(self.client.delete(self.url(&format!("/suggestions/{}", id))))
            .await
            .map(|_| ())
    }

    async fn accept_suggestion(&self, id: Uuid, note: &ReviewNote) -> Result<EditSuggestion, ApiError> {
        self.json(
            self.client
                .post(self.url(&format!("/suggestions/{}/accept", id)))
                .json(note),
        )
        .await
    }

    async fn reject_suggestion(&self, id: Uuid, note: &ReviewNote) -> Result<EditSuggestion, ApiError> {
        self.json(
            self.client
                .post(self.url(&format!("/suggestions/{}/reject", id)))
                .json(note),
        )
        .await
    }
}
