//! User administration handlers (admin only).

use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use serde_json::json;

use atelier_core::{Role, UserId};

use crate::db::{RepositoryError, UserRepository};
use crate::error::{AppError, Result};
use crate::extract::{Json, Path, Query};
use crate::middleware::RequireAdmin;
use crate::models::User;
use crate::services::auth::{AccountUpdate, AuthService, NewAccount};
use crate::state::AppState;

/// Query parameters for the user list.
#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    /// A role name, or `all` for no filter.
    pub role: Option<String>,
}

/// Account type chosen on the user form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Client,
    Employer,
}

/// Account status chosen on the user form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Inactive,
}

/// User form body, shared by create and update.
#[derive(Debug, Deserialize)]
pub struct UserForm {
    #[serde(alias = "username")]
    pub name: Option<String>,
    pub email: Option<String>,
    /// Empty or missing keeps the current password on update.
    pub password: Option<String>,
    #[serde(rename = "type")]
    pub account_type: Option<AccountType>,
    pub status: Option<AccountStatus>,
    #[serde(alias = "isAdmin")]
    pub is_admin: Option<bool>,
}

impl UserForm {
    /// Role implied by the form, if it names one.
    fn role(&self) -> Option<Role> {
        if self.account_type.is_none() && self.is_admin.is_none() {
            return None;
        }
        Some(Role::from_account_type(
            self.is_admin.unwrap_or(false),
            self.account_type == Some(AccountType::Employer),
        ))
    }

    fn is_active(&self) -> Option<bool> {
        self.status.map(|s| s == AccountStatus::Active)
    }
}

fn parse_role_filter(role: Option<&str>) -> Result<Option<Role>> {
    match role.map(str::trim) {
        None | Some("" | "all") => Ok(None),
        Some(name) => name
            .parse::<Role>()
            .map(Some)
            .map_err(|e| AppError::BadRequest(e.to_string())),
    }
}

/// List users, newest first.
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Vec<User>>> {
    let role = parse_role_filter(query.role.as_deref())?;
    let users = UserRepository::new(state.pool()).list(role).await?;
    Ok(Json(users))
}

/// Create a user with the role given by the form.
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(form): Json<UserForm>,
) -> Result<(StatusCode, Json<User>)> {
    let missing = |field: &str| AppError::BadRequest(format!("{field} is required"));
    let username = form.name.as_deref().ok_or_else(|| missing("name"))?;
    let email = form.email.as_deref().ok_or_else(|| missing("email"))?;
    let password = form.password.as_deref().ok_or_else(|| missing("password"))?;

    let auth = AuthService::new(state.pool());
    let mut user = auth
        .create_user(&NewAccount {
            username,
            email,
            password,
            role: form.role().unwrap_or_default(),
        })
        .await?;

    if form.is_active() == Some(false) {
        user = auth
            .update_user(
                user.id,
                &AccountUpdate {
                    is_active: Some(false),
                    ..AccountUpdate::default()
                },
            )
            .await?;
    }

    tracing::info!(admin_id = %admin.id, user_id = %user.id, "Account created by admin");
    Ok((StatusCode::CREATED, Json(user)))
}

/// Get one user.
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<i32>,
) -> Result<Json<User>> {
    UserRepository::new(state.pool())
        .get_by_id(UserId::new(id))
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// Update a user; omitted fields keep their value.
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i32>,
    Json(form): Json<UserForm>,
) -> Result<Json<User>> {
    let user = AuthService::new(state.pool())
        .update_user(
            UserId::new(id),
            &AccountUpdate {
                username: form.name.as_deref(),
                email: form.email.as_deref(),
                password: form.password.as_deref(),
                role: form.role(),
                is_active: form.is_active(),
            },
        )
        .await?;

    tracing::info!(admin_id = %admin.id, user_id = %user.id, "Account updated by admin");
    Ok(Json(user))
}

/// Delete a user.
pub async fn destroy(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i32>,
) -> Result<Json<serde_json::Value>> {
    let id = UserId::new(id);
    if id == admin.id {
        return Err(AppError::BadRequest(
            "Administrators cannot delete their own account".to_string(),
        ));
    }

    UserRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound("User not found".to_string()),
            other => other.into(),
        })?;

    tracing::info!(admin_id = %admin.id, user_id = %id, "Account deleted by admin");
    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(json: serde_json::Value) -> UserForm {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_role_filter() {
        assert_eq!(parse_role_filter(None).unwrap(), None);
        assert_eq!(parse_role_filter(Some("all")).unwrap(), None);
        assert_eq!(
            parse_role_filter(Some("employer")).unwrap(),
            Some(Role::Employer)
        );
        assert!(matches!(
            parse_role_filter(Some("owner")),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_form_role() {
        let admin = form(json!({ "type": "client", "isAdmin": true }));
        assert_eq!(admin.role(), Some(Role::Admin));

        let employer = form(json!({ "type": "employer", "is_admin": false }));
        assert_eq!(employer.role(), Some(Role::Employer));

        let client = form(json!({ "type": "client" }));
        assert_eq!(client.role(), Some(Role::Client));

        let untouched = form(json!({ "name": "Amine" }));
        assert_eq!(untouched.role(), None);
    }

    #[test]
    fn test_form_status() {
        assert_eq!(form(json!({ "status": "inactive" })).is_active(), Some(false));
        assert_eq!(form(json!({ "status": "active" })).is_active(), Some(true));
        assert_eq!(form(json!({})).is_active(), None);
    }
}
