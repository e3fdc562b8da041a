//! Session-related types.
//!
//! The whole session lives in the encrypted cookie; nothing is stored
//! server-side.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use atelier_core::{Role, UserId};

use crate::error::AppError;
use crate::models::User;

/// Plaintext of the session cookie.
///
/// Field names are part of the cookie format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPayload {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: Role,
    /// Expiry as epoch milliseconds.
    pub expires: i64,
}

impl SessionPayload {
    /// Build a payload for `user` that expires at `expires`.
    #[must_use]
    pub fn for_user(user: &User, expires: DateTime<Utc>) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.to_string(),
            role: user.role,
            expires: expires.timestamp_millis(),
        }
    }

    /// Whether the payload has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires < now.timestamp_millis()
    }
}

/// The authenticated user for the current request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl CurrentUser {
    /// Reject the request unless the user holds one of `roles`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` when the role is not allowed.
    pub fn require_role(&self, roles: &[Role]) -> Result<(), AppError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "role {} may not access this resource",
                self.role
            )))
        }
    }
}

impl From<SessionPayload> for CurrentUser {
    fn from(payload: SessionPayload) -> Self {
        Self {
            id: payload.id,
            username: payload.username,
            email: payload.email,
            role: payload.role,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn payload(expires: i64) -> SessionPayload {
        SessionPayload {
            id: UserId::new(3),
            username: "salma".to_string(),
            email: "salma@atelier.tn".to_string(),
            role: Role::Employer,
            expires,
        }
    }

    #[test]
    fn test_payload_json_field_names() {
        let json = serde_json::to_value(payload(1_700_000_000_000)).ok();
        assert_eq!(
            json,
            Some(serde_json::json!({
                "id": 3,
                "username": "salma",
                "email": "salma@atelier.tn",
                "role": "employer",
                "expires": 1_700_000_000_000_i64,
            }))
        );
    }

    #[test]
    fn test_is_expired() {
        let now = Utc.timestamp_millis_opt(1_000).single();
        let Some(now) = now else {
            panic!("valid timestamp");
        };
        assert!(payload(999).is_expired(now));
        assert!(!payload(1_000).is_expired(now));
        assert!(!payload(1_001).is_expired(now));
    }

    #[test]
    fn test_require_role() {
        let user = CurrentUser::from(payload(0));
        assert!(user.require_role(&[Role::Employer, Role::Admin]).is_ok());
        assert!(matches!(
            user.require_role(&[Role::Admin]),
            Err(AppError::Forbidden(_))
        ));
    }
}
