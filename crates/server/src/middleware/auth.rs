//! Session middleware and authentication extractors.
//!
//! [`session_middleware`] reads the session cookie once per request and
//! stores the outcome as a [`SessionContext`] extension. The extractors
//! below only look at that extension.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderValue, header::SET_COOKIE, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use tracing::Span;

use atelier_core::Role;

use crate::error::{AppError, set_sentry_user};
use crate::models::CurrentUser;
use crate::session::SESSION_COOKIE_NAME;
use crate::state::AppState;

/// Roles allowed on the back-office inventory and contact routes.
pub const STAFF_ROLES: &[Role] = &[Role::Employer, Role::Admin];

/// Request-scoped session outcome.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub current_user: Option<CurrentUser>,
}

/// Decrypt the session cookie into a [`SessionContext`].
///
/// An expired or undecryptable cookie yields an anonymous request and a
/// deleting `Set-Cookie` on the response, unless the handler set a fresh
/// session cookie itself.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let jar = CookieJar::from_headers(request.headers());
    let session = state.sessions().read(
        jar.get(SESSION_COOKIE_NAME).map(|c| c.value()),
        Utc::now(),
    );

    if let Some(user) = session.user() {
        Span::current().record("user_id", user.id.as_i32());
        set_sentry_user(&user.id, Some(&user.email));
    }

    let stale = session.is_stale();
    request.extensions_mut().insert(SessionContext {
        current_user: session.user().cloned(),
    });

    let mut response = next.run(request).await;

    if stale && !sets_session_cookie(&response) {
        tracing::debug!("Clearing stale session cookie");
        let removal = state.sessions().removal_cookie().to_string();
        if let Ok(value) = HeaderValue::from_str(&removal) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }

    response
}

fn sets_session_cookie(response: &Response) -> bool {
    let prefix = format!("{SESSION_COOKIE_NAME}=");
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.starts_with(&prefix))
}

fn current_user(parts: &Parts) -> Option<CurrentUser> {
    parts
        .extensions
        .get::<SessionContext>()
        .and_then(|ctx| ctx.current_user.clone())
}

// =============================================================================
// Extractors
// =============================================================================

/// Extractor that requires a valid session.
///
/// Rejects with a 401 JSON error when the request is anonymous.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.username)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        current_user(parts)
            .map(Self)
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))
    }
}

/// Extractor that optionally gets the current user.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(current_user(parts)))
    }
}

/// Extractor for employer or admin users (401 when anonymous, 403 otherwise).
pub struct RequireStaff(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireStaff
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        user.require_role(STAFF_ROLES)?;
        Ok(Self(user))
    }
}

/// Extractor for admin users (401 when anonymous, 403 otherwise).
pub struct RequireAdmin(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        user.require_role(&[Role::Admin])?;
        Ok(Self(user))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        Json, Router,
        body::Body,
        http::{Request as HttpRequest, StatusCode, header::COOKIE},
        routing::get,
    };
    use chrono::Duration;
    use tower::ServiceExt;

    use atelier_core::UserId;

    use super::*;
    use crate::models::SessionPayload;

    fn app(state: AppState) -> Router {
        Router::new()
            .route(
                "/me",
                get(|RequireAuth(user): RequireAuth| async move { Json(user) }),
            )
            .route(
                "/staff",
                get(|RequireStaff(user): RequireStaff| async move { user.username }),
            )
            .route(
                "/admin",
                get(|RequireAdmin(user): RequireAdmin| async move { user.username }),
            )
            .route(
                "/maybe",
                get(|OptionalAuth(user): OptionalAuth| async move {
                    user.map_or_else(|| "guest".to_string(), |u| u.username)
                }),
            )
            .layer(axum::middleware::from_fn_with_state(
                state.clone(),
                session_middleware,
            ))
            .with_state(state)
    }

    fn cookie_for(state: &AppState, role: Role, expires_in: Duration) -> String {
        let payload = SessionPayload {
            id: UserId::new(4),
            username: "nour".to_string(),
            email: "nour@atelier.tn".to_string(),
            role,
            expires: (Utc::now() + expires_in).timestamp_millis(),
        };
        let cookie = state.sessions().seal(&payload).unwrap();
        format!("{}={}", cookie.name(), cookie.value())
    }

    async fn get_with(app: Router, uri: &str, cookie: Option<&str>) -> Response {
        let mut builder = HttpRequest::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap()
    }

    fn clears_cookie(response: &Response) -> bool {
        response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .any(|v| v.to_str().unwrap().starts_with("session=;"))
    }

    #[tokio::test]
    async fn test_anonymous_request() {
        let state = AppState::for_tests();
        let response = get_with(app(state.clone()), "/me", None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(!clears_cookie(&response));

        let response = get_with(app(state), "/maybe", None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_valid_session() {
        let state = AppState::for_tests();
        let cookie = cookie_for(&state, Role::Client, Duration::hours(1));

        let response = get_with(app(state), "/me", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!clears_cookie(&response));

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["username"], "nour");
        assert_eq!(body["role"], "client");
    }

    #[tokio::test]
    async fn test_expired_session_is_cleared() {
        let state = AppState::for_tests();
        let cookie = cookie_for(&state, Role::Admin, -Duration::minutes(1));

        let response = get_with(app(state), "/me", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(clears_cookie(&response));
    }

    #[tokio::test]
    async fn test_tampered_cookie_is_cleared() {
        let state = AppState::for_tests();
        let response = get_with(app(state), "/maybe", Some("session=00:ff")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(clears_cookie(&response));
    }

    #[tokio::test]
    async fn test_role_extractors() {
        let state = AppState::for_tests();
        let client = cookie_for(&state, Role::Client, Duration::hours(1));
        let employer = cookie_for(&state, Role::Employer, Duration::hours(1));

        let status = |r: Response| r.status();
        assert_eq!(
            status(get_with(app(state.clone()), "/staff", Some(&client)).await),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status(get_with(app(state.clone()), "/staff", Some(&employer)).await),
            StatusCode::OK
        );
        assert_eq!(
            status(get_with(app(state.clone()), "/admin", Some(&employer)).await),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status(get_with(app(state), "/admin", None).await),
            StatusCode::UNAUTHORIZED
        );
    }
}
