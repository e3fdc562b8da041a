//! Authentication route handlers.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::extract::Json;
use crate::middleware::OptionalAuth;
use crate::models::{CurrentUser, User};
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Signup request body.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Successful login response.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: CurrentUser,
    /// Dashboard for the user's role.
    pub redirect: &'static str,
}

fn session_user(user: &User) -> CurrentUser {
    CurrentUser {
        id: user.id,
        username: user.username.clone(),
        email: user.email.to_string(),
        role: user.role,
    }
}

/// Check credentials and start a session.
#[tracing::instrument(skip_all, fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(form): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    let user = AuthService::new(state.pool())
        .login(&form.email, &form.password)
        .await
        .inspect_err(|e| tracing::info!(error = %e, "Login failed"))?;

    let (_, cookie) = state
        .sessions()
        .create_session(&user, Utc::now())
        .map_err(AuthError::from)?;

    set_sentry_user(&user.id, Some(user.email.as_str()));
    tracing::info!(user_id = %user.id, role = %user.role, "User logged in");

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            success: true,
            user: session_user(&user),
            redirect: user.role.dashboard_path(),
        }),
    ))
}

/// End the session. Succeeds whether or not a session existed.
pub async fn logout(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    jar: CookieJar,
) -> (CookieJar, Json<serde_json::Value>) {
    if let Some(user) = user {
        tracing::info!(user_id = %user.id, "User logged out");
    }
    clear_sentry_user();

    (
        jar.add(state.sessions().removal_cookie()),
        Json(json!({ "success": true, "message": "Logged out successfully" })),
    )
}

/// Report the current session.
pub async fn status(OptionalAuth(user): OptionalAuth) -> Response {
    match user {
        Some(user) => Json(json!({ "authenticated": true, "user": user })).into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "authenticated": false })),
        )
            .into_response(),
    }
}

/// Create a client account. Does not log the new user in.
#[tracing::instrument(skip_all, fields(email = %form.email))]
pub async fn signup(
    State(state): State<AppState>,
    Json(form): Json<SignupRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    let user = AuthService::new(state.pool())
        .register(&form.username, &form.email, &form.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User created successfully", "user": user })),
    ))
}
