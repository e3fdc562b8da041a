//! Request extractors whose rejections render as [`AppError`].
//!
//! Drop-in replacements for `axum::Json`, `axum::extract::Path` and
//! `axum::extract::Query`: a malformed body, path or query string becomes a
//! 400 with the usual JSON error body instead of axum's plain-text reply.

use axum::{
    extract::{
        FromRequest, FromRequestParts,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::AppError;

/// JSON request body or response.
#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Typed path parameters.
#[derive(Debug, Clone, Copy, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct Path<T>(pub T);

/// Typed query string.
#[derive(Debug, Clone, Copy, Default, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct Query<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Rejected {
            message: "Invalid JSON body",
            details: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::Rejected {
            message: "Invalid path parameter",
            details: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Rejected {
            message: "Invalid query string",
            details: rejection.body_text(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
        routing::{get, post},
    };
    use serde::Deserialize;
    use tower::ServiceExt;

    use super::*;

    #[derive(Debug, Deserialize, Serialize)]
    struct Line {
        name: String,
        quantity: u32,
    }

    #[derive(Debug, Deserialize)]
    struct Page {
        page: u32,
    }

    fn app() -> Router {
        Router::new()
            .route("/lines", post(|Json(line): Json<Line>| async move { Json(line) }))
            .route("/lines/{id}", get(|Path(id): Path<i32>| async move { id.to_string() }))
            .route("/pages", get(|Query(q): Query<Page>| async move { q.page.to_string() }))
    }

    async fn send(request: Request<Body>) -> (StatusCode, Option<String>, serde_json::Value) {
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, content_type, body)
    }

    fn post_json(body: &'static str) -> Request<Body> {
        Request::post("/lines")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_valid_body_round_trips() {
        let (status, _, body) = send(post_json(r#"{"name":"Vis","quantity":2}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["quantity"], 2);
    }

    #[tokio::test]
    async fn test_malformed_json_is_json_400() {
        let (status, content_type, body) = send(post_json("{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        assert_eq!(body["error"], "Invalid JSON body");
        assert!(body["details"].is_string());
    }

    #[tokio::test]
    async fn test_missing_field_is_400_not_422() {
        let (status, _, body) = send(post_json(r#"{"quantity":1}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["details"].as_str().unwrap().contains("name"));
    }

    #[tokio::test]
    async fn test_negative_quantity_is_400() {
        let (status, _, body) = send(post_json(r#"{"name":"Vis","quantity":-1}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid JSON body");
    }

    #[tokio::test]
    async fn test_bad_path_and_query_are_json_400() {
        let request = Request::get("/lines/abc").body(Body::empty()).unwrap();
        let (status, _, body) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid path parameter");

        let request = Request::get("/pages?page=x").body(Body::empty()).unwrap();
        let (status, _, body) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid query string");
    }
}
