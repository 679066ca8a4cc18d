//! Liveness endpoint

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::service::ServiceStats;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub service: &'static str,
    /// Editors named in the configuration
    pub editors: usize,
    #[serde(flatten)]
    pub stats: ServiceStats,
}

/// Report liveness together with the size of the content under review
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        service: "marginalia-server",
        editors: state.config().review.editors.len(),
        stats: state.service().stats().await,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(health_check))
}
