//! Edit suggestion API routes

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use uuid::Uuid;

use super::identity::Viewer;
use crate::annotations::{EditSuggestion, NewSuggestion, ReviewNote, SuggestionQuery};
use crate::error::Result;
use crate::state::AppState;

/// Create the suggestions router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_suggestions).post(create_suggestion))
        .route("/:id", delete(delete_suggestion))
        .route("/:id/accept", post(accept_suggestion))
        .route("/:id/reject", post(reject_suggestion))
}

/// Suggestions across blocks, oldest first
async fn list_suggestions(
    State(state): State<AppState>,
    Viewer(user): Viewer,
    Query(query): Query<SuggestionQuery>,
) -> Result<Json<Vec<EditSuggestion>>> {
    let suggestions = state.service().list_suggestions(user, query).await?;
    Ok(Json(suggestions))
}

async fn create_suggestion(
    State(state): State<AppState>,
    Viewer(user): Viewer,
    Json(data): Json<NewSuggestion>,
) -> Result<(StatusCode, Json<EditSuggestion>)> {
    let suggestion = state.service().create_suggestion(user, data).await?;
    Ok((StatusCode::CREATED, Json(suggestion)))
}

async fn delete_suggestion(
    State(state): State<AppState>,
    Viewer(user): Viewer,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.service().delete_suggestion(user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Accept a suggestion and apply it to the block content
async fn accept_suggestion(
    State(state): State<AppState>,
    Viewer(user): Viewer,
    Path(id): Path<Uuid>,
    note: Option<Json<ReviewNote>>,
) -> Result<Json<EditSuggestion>> {
    let note = note.map(|Json(n)| n).unwrap_or_default();
    let suggestion = state.service().accept_suggestion(user, id, note).await?;
    Ok(Json(suggestion))
}

async fn reject_suggestion(
    State(state): State<AppState>,
    Viewer(user): Viewer,
    Path(id): Path<Uuid>,
    note: Option<Json<ReviewNote>>,
) -> Result<Json<EditSuggestion>> {
    let note = note.map(|Json(n)| n).unwrap_or_default();
    let suggestion = state.service().reject_suggestion(user, id, note).await?;
    Ok(Json(suggestion))
}
