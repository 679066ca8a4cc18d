//! Content API routes

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use uuid::Uuid;

use super::identity::Viewer;
use crate::annotations::{BlockUpdate, ContentBlock, ContentResponse};
use crate::error::Result;
use crate::state::AppState;

/// Create the content router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_content))
        .route("/:id", put(update_block))
}

/// All blocks with the annotations visible to the caller
async fn get_content(State(state): State<AppState>, Viewer(user): Viewer) -> Json<ContentResponse> {
    Json(state.service().content(user).await)
}

/// Replace a block's content, display order or visibility (editors only)
async fn update_block(
    State(state): State<AppState>,
    Viewer(user): Viewer,
    Path(id): Path<Uuid>,
    Json(update): Json<BlockUpdate>,
) -> Result<Json<ContentBlock>> {
    let block = state.service().update_block(user, id, update).await?;
    Ok(Json(block))
}
