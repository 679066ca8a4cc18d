//! Editor review routes

use axum::{extract::State, routing::get, Json, Router};

use super::identity::Viewer;
use crate::annotations::{HistoryEntry, PendingReview};
use crate::error::Result;
use crate::state::AppState;

/// Create the review router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/pending", get(pending))
        .route("/history", get(history))
}

/// Unresolved comments and pending suggestions, newest first
async fn pending(State(state): State<AppState>, Viewer(user): Viewer) -> Result<Json<PendingReview>> {
    Ok(Json(state.service().pending_review(user).await?))
}

/// Content changes, oldest first
async fn history(State(state): State<AppState>, Viewer(user): Viewer) -> Result<Json<Vec<HistoryEntry>>> {
    Ok(Json(state.service().history(user).await?))
}
