//! Own-profile handler.

use axum::extract::State;
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use serde::Deserialize;

use crate::error::Result;
use crate::extract::Json;
use crate::middleware::RequireAuth;
use crate::models::User;
use crate::services::auth::{AuthError, AuthService, ProfileUpdate};
use crate::state::AppState;

/// Profile form body.
#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub username: Option<String>,
    pub email: Option<String>,
    #[serde(alias = "currentPassword")]
    pub current_password: Option<String>,
    #[serde(alias = "newPassword")]
    pub new_password: Option<String>,
}

/// Update the signed-in user's name, email or password.
///
/// The session cookie embeds the username and email, so a fresh cookie is
/// issued with the result.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    jar: CookieJar,
    Json(form): Json<ProfileForm>,
) -> Result<(CookieJar, Json<User>)> {
    let user = AuthService::new(state.pool())
        .update_profile(
            current.id,
            &ProfileUpdate {
                username: form.username.as_deref(),
                email: form.email.as_deref(),
                current_password: form.current_password.as_deref(),
                new_password: form.new_password.as_deref(),
            },
        )
        .await?;

    let (_, cookie) = state
        .sessions()
        .create_session(&user, Utc::now())
        .map_err(AuthError::from)?;

    tracing::info!(user_id = %user.id, "Profile updated");
    Ok((jar.add(cookie), Json(user)))
}
