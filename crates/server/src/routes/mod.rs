//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness check
//! GET  /health/ready                    - Readiness check (database)
//!
//! # Auth
//! POST /api/auth/login                  - Login, sets the session cookie (rate limited)
//! POST /api/auth/logout                 - Logout, clears the session cookie
//! GET  /api/auth/status                 - Current session
//! POST /api/auth/signup                 - Create a client account
//!
//! # Accounts
//! GET  /api/users?role=                 - List users (admin)
//! POST /api/users                       - Create user (admin)
//! GET  /api/users/{id}                  - User detail (admin)
//! PUT  /api/users/{id}                  - Update user (admin)
//! DELETE /api/users/{id}                - Delete user (admin)
//! PUT  /api/profile                     - Update own profile
//!
//! # Back office (employer or admin)
//! GET  /api/employer/articles           - List articles (?search=&lowStock=)
//! POST /api/employer/articles           - Create article
//! GET  /api/employer/articles/{id}      - Article detail
//! PUT  /api/employer/articles/{id}      - Update article
//! DELETE /api/employer/articles/{id}    - Delete article
//! GET|POST /api/employer/clients        - List / create clients
//! GET|PUT|DELETE /api/employer/clients/{id}
//! GET|POST /api/employer/fournisseurs   - List / create suppliers
//! GET|PUT|DELETE /api/employer/fournisseurs/{id}
//! POST /api/employer/init-db            - Create and seed the modern article table
//! POST /api/employer/schema/refresh     - Forget the cached article layout
//! GET  /api/employer/debug/tables       - List tables
//! GET  /api/employer/debug/tables/{table} - First rows of a table
//!
//! # Storefront
//! GET  /api/catalog?search=             - Public article list with tax-inclusive prices
//! POST /api/submit_order                - Email an order to the operator
//! POST /api/contact                     - Email a contact message to the operator
//! ```

pub mod articles;
pub mod auth;
pub mod catalog;
pub mod contact;
pub mod contacts;
pub mod maintenance;
pub mod orders;
pub mod profile;
pub mod users;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::{auth_rate_limiter, request_id_middleware, session_middleware};
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login).layer(auth_rate_limiter()))
        .route("/logout", post(auth::logout))
        .route("/status", get(auth::status))
        .route("/signup", post(auth::signup))
}

/// Create the user administration routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users::index).post(users::create))
        .route(
            "/{id}",
            get(users::show).put(users::update).delete(users::destroy),
        )
}

/// Create the back-office routes router.
pub fn employer_routes() -> Router<AppState> {
    Router::new()
        .route("/articles", get(articles::index).post(articles::create))
        .route(
            "/articles/{id}",
            get(articles::show)
                .put(articles::update)
                .delete(articles::destroy),
        )
        .route(
            "/clients",
            get(contacts::clients::index).post(contacts::clients::create),
        )
        .route(
            "/clients/{id}",
            get(contacts::clients::show)
                .put(contacts::clients::update)
                .delete(contacts::clients::destroy),
        )
        .route(
            "/fournisseurs",
            get(contacts::suppliers::index).post(contacts::suppliers::create),
        )
        .route(
            "/fournisseurs/{id}",
            get(contacts::suppliers::show)
                .put(contacts::suppliers::update)
                .delete(contacts::suppliers::destroy),
        )
        .route("/init-db", post(maintenance::init_db))
        .route("/schema/refresh", post(maintenance::refresh_schema))
        .route("/debug/tables", get(maintenance::tables))
        .route("/debug/tables/{table}", get(maintenance::table_rows))
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/auth", auth_routes())
        .nest("/api/users", user_routes())
        .route("/api/profile", put(profile::update))
        .nest("/api/employer", employer_routes())
        .route("/api/catalog", get(catalog::index))
        .route("/api/submit_order", post(orders::submit))
        .route("/api/contact", post(contact::send))
}

/// The full application: health checks, API routes and the middleware stack
/// below the Sentry layers.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        body::Body,
        http::{Method, Request, header::CONTENT_TYPE},
    };
    use tower::ServiceExt;

    use super::*;

    async fn send(method: Method, uri: &str, body: Option<&str>) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }
        let body = body.map_or_else(Body::empty, |b| Body::from(b.to_owned()));
        app(AppState::for_tests())
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = send(Method::GET, "/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_readiness_without_database() {
        let response = send(Method::GET, "/health/ready", None).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_protected_routes_require_session() {
        for (method, uri) in [
            (Method::GET, "/api/users"),
            (Method::GET, "/api/users/1"),
            (Method::GET, "/api/employer/articles"),
            (Method::DELETE, "/api/employer/articles/3"),
            (Method::GET, "/api/employer/clients"),
            (Method::GET, "/api/employer/fournisseurs/2"),
            (Method::POST, "/api/employer/init-db"),
            (Method::POST, "/api/employer/schema/refresh"),
            (Method::GET, "/api/employer/debug/tables"),
        ] {
            let response = send(method.clone(), uri, None).await;
            assert_eq!(
                response.status(),
                StatusCode::UNAUTHORIZED,
                "{method} {uri}"
            );
        }
    }

    #[tokio::test]
    async fn test_status_when_anonymous() {
        let response = send(Method::GET, "/api/auth/status", None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, serde_json::json!({ "authenticated": false }));
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_malformed_order_body_is_json_400() {
        for body in [
            "{not json",
            r#"{"items":[{"article":{"id":1,"price":"1"},"quantity":1}]}"#,
            r#"{"items":[{"article":{"id":1,"name":"Vis","price":"1"},"quantity":-1}]}"#,
        ] {
            let response = send(Method::POST, "/api/submit_order", Some(body)).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
            assert_eq!(
                response.headers().get(CONTENT_TYPE).unwrap(),
                "application/json"
            );
            let json = json_body(response).await;
            assert_eq!(json["error"], "Invalid JSON body", "{body}");
            assert!(json["details"].is_string());
        }
    }

    #[tokio::test]
    async fn test_overflowing_order_is_rejected_before_sending() {
        let body = r#"{"items":[
            {"article":{"id":1,"name":"Vis","price":"1"},"quantity":4294967295},
            {"article":{"id":1,"name":"Vis","price":"1"},"quantity":1}
        ]}"#;
        let response = send(Method::POST, "/api/submit_order", Some(body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "Invalid cart: quantity is too large");
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let response = send(Method::GET, "/api/nothing-here", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
