//! Comment API routes

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use uuid::Uuid;

use super::identity::Viewer;
use crate::annotations::{Comment, CommentQuery, NewComment, NewReply, Reply};
use crate::error::Result;
use crate::state::AppState;

/// Create the comments router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_comments).post(create_comment))
        .route("/:id", delete(delete_comment))
        .route("/:id/resolve", post(resolve_comment))
        .route("/:id/reply", post(reply_to_comment))
}

/// Comments across blocks, oldest first
async fn list_comments(
    State(state): State<AppState>,
    Viewer(user): Viewer,
    Query(query): Query<CommentQuery>,
) -> Result<Json<Vec<Comment>>> {
    let comments = state.service().list_comments(user, query).await?;
    Ok(Json(comments))
}

async fn create_comment(
    State(state): State<AppState>,
    Viewer(user): Viewer,
    Json(data): Json<NewComment>,
) -> Result<(StatusCode, Json<Comment>)> {
    let comment = state.service().create_comment(user, data).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn delete_comment(
    State(state): State<AppState>,
    Viewer(user): Viewer,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.service().delete_comment(user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Mark a comment resolved (editors only)
async fn resolve_comment(
    State(state): State<AppState>,
    Viewer(user): Viewer,
    Path(id): Path<Uuid>,
) -> Result<Json<Comment>> {
    let comment = state.service().resolve_comment(user, id).await?;
    Ok(Json(comment))
}

async fn reply_to_comment(
    State(state): State<AppState>,
    Viewer(user): Viewer,
    Path(id): Path<Uuid>,
    Json(data): Json<NewReply>,
) -> Result<(StatusCode, Json<Reply>)> {
    let reply = state.service().reply_to_comment(user, id, data).await?;
    Ok((StatusCode::CREATED, Json(reply)))
}
