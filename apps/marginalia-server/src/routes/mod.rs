//! Route modules for the Marginalia server

pub mod comments;
pub mod content;
pub mod health;
pub mod identity;
pub mod review;
pub mod suggestions;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Full HTTP surface of the content service
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/health", health::router())
        .nest("/api/v1/health", health::router())
        .nest("/api/v1/content", content::router())
        .nest("/api/v1/comments", comments::router())
        .nest("/api/v1/suggestions", suggestions::router())
        .nest("/api/v1/review", review::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::annotations::ContentBlock;
    use crate::client::USER_ID_HEADER;
    use crate::config::Config;
    use crate::service::ContentService;

    struct TestApp {
        router: Router,
        block_id: Uuid,
        editor: Uuid,
    }

    fn test_app() -> TestApp {
        let editor = Uuid::new_v4();
        let block = ContentBlock::new("intro", "<p>Hello world</p>");
        let block_id = block.id;
        let mut config = Config::default();
        config.review.editors.push(editor);
        let service = ContentService::new(vec![block], config.review.editors.iter().copied());
        let state = AppState::new(config, service);
        TestApp {
            router: app(state),
            block_id,
            editor,
        }
    }

    async fn call(
        router: &Router,
        method: Method,
        uri: &str,
        user: Option<Uuid>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            request = request.header(USER_ID_HEADER, user.to_string());
        }
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app();
        let (status, body) = call(&app.router, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["blocks"], 1);
        assert_eq!(body["editors"], 1);
        assert_eq!(body["pending_suggestions"], 0);
    }

    #[tokio::test]
    async fn test_anonymous_content() {
        let app = test_app();
        let (status, body) = call(&app.router, Method::GET, "/api/v1/content", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["can_edit"], false);
        assert_eq!(body["blocks"][0]["content"], "<p>Hello world</p>");
    }

    #[tokio::test]
    async fn test_comment_requires_identity() {
        let app = test_app();
        let comment = json!({
            "block_id": app.block_id,
            "start_offset": 0,
            "end_offset": 5,
            "selected_text": "Hello",
            "body": "Hi"
        });

        let (status, body) = call(
            &app.router,
            Method::POST,
            "/api/v1/comments",
            None,
            Some(comment.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "unauthorized");

        let (status, body) = call(
            &app.router,
            Method::POST,
            "/api/v1/comments",
            Some(Uuid::new_v4()),
            Some(comment),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["selected_text"], "Hello");
    }

    #[tokio::test]
    async fn test_invalid_identity_header() {
        let app = test_app();
        let request = Request::builder()
            .uri("/api/v1/content")
            .header(USER_ID_HEADER, "not-a-uuid")
            .body(Body::empty())
            .unwrap();
        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_suggestion_review_flow() {
        let app = test_app();
        let author = Uuid::new_v4();
        let (status, created) = call(
            &app.router,
            Method::POST,
            "/api/v1/suggestions",
            Some(author),
            Some(json!({
                "block_id": app.block_id,
                "start_offset": 6,
                "end_offset": 11,
                "original_text": "world",
                "suggested_text": "earth"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["status"], "pending");

        let id = created["id"].as_str().unwrap().to_string();
        let (status, body) = call(
            &app.router,
            Method::POST,
            &format!("/api/v1/suggestions/{}/accept", id),
            Some(author),
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "edit authority required");

        let (status, body) = call(
            &app.router,
            Method::POST,
            &format!("/api/v1/suggestions/{}/accept", id),
            Some(app.editor),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "accepted");

        let (_, content) =
            call(&app.router, Method::GET, "/api/v1/content", Some(app.editor), None).await;
        assert_eq!(content["blocks"][0]["content"], "<p>Hello earth</p>");

        let (status, history) =
            call(&app.router, Method::GET, "/api/v1/review/history", Some(app.editor), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(history[0]["strategy"], "offsets");
    }

    #[tokio::test]
    async fn test_review_requires_editor() {
        let app = test_app();
        let (status, _) = call(
            &app.router,
            Method::GET,
            "/api/v1/review/pending",
            Some(Uuid::new_v4()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = call(
            &app.router,
            Method::GET,
            "/api/v1/review/pending",
            Some(app.editor),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_pending"], 0);
    }

    #[tokio::test]
    async fn test_update_block_content() {
        let app = test_app();
        let (status, body) = call(
            &app.router,
            Method::PUT,
            &format!("/api/v1/content/{}", app.block_id),
            Some(app.editor),
            Some(json!({ "content": "<p>Hello there</p>" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["content"], "<p>Hello there</p>");

        let (status, _) = call(
            &app.router,
            Method::PUT,
            &format!("/api/v1/content/{}", Uuid::new_v4()),
            Some(app.editor),
            Some(json!({ "content": "x" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_deactivated_block_leaves_content() {
        let app = test_app();
        let (status, body) = call(
            &app.router,
            Method::PUT,
            &format!("/api/v1/content/{}", app.block_id),
            Some(app.editor),
            Some(json!({ "is_active": false })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["is_active"], false);
        assert_eq!(body["content"], "<p>Hello world</p>");

        let (_, content) = call(&app.router, Method::GET, "/api/v1/content", None, None).await;
        assert_eq!(content["blocks"], json!([]));
    }

    #[tokio::test]
    async fn test_list_annotations() {
        let app = test_app();
        let reader = Uuid::new_v4();
        for (start, end, text) in [(0, 5, "Hello"), (6, 11, "world")] {
            let (status, _) = call(
                &app.router,
                Method::POST,
                "/api/v1/comments",
                Some(reader),
                Some(json!({
                    "block_id": app.block_id,
                    "start_offset": start,
                    "end_offset": end,
                    "selected_text": text,
                    "body": "Hm"
                })),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, _) = call(&app.router, Method::GET, "/api/v1/comments", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, comments) = call(
            &app.router,
            Method::GET,
            &format!("/api/v1/comments?block_id={}&include_resolved=true", app.block_id),
            Some(reader),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(comments[0]["selected_text"], "Hello");
        assert_eq!(comments[1]["selected_text"], "world");

        let (_, created) = call(
            &app.router,
            Method::POST,
            "/api/v1/suggestions",
            Some(reader),
            Some(json!({
                "block_id": app.block_id,
                "start_offset": 0,
                "end_offset": 5,
                "original_text": "Hello",
                "suggested_text": "Howdy"
            })),
        )
        .await;
        let id = created["id"].as_str().unwrap().to_string();
        call(
            &app.router,
            Method::POST,
            &format!("/api/v1/suggestions/{}/reject", id),
            Some(app.editor),
            None,
        )
        .await;

        let (status, pending) =
            call(&app.router, Method::GET, "/api/v1/suggestions", Some(reader), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(pending, json!([]));

        let (_, rejected) = call(
            &app.router,
            Method::GET,
            "/api/v1/suggestions?status_filter=rejected",
            Some(reader),
            None,
        )
        .await;
        assert_eq!(rejected[0]["id"], id.as_str());
        assert_eq!(rejected[0]["status"], "rejected");
    }
}
