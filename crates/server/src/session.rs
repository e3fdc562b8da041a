//! Cookie-carried sessions.
//!
//! A session is the JSON [`SessionPayload`] sealed with [`SessionCipher`] and
//! stored in the `session` cookie. Reading a cookie never fails; it resolves
//! to one of the [`SessionState`] variants and callers decide what to do.

use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{DateTime, Duration, Utc};

use crate::crypto::{CryptoError, SessionCipher};
use crate::models::{CurrentUser, SessionPayload, User};

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "session";

/// Session lifetime in seconds (7 days).
pub const SESSION_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Outcome of reading a session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No cookie was sent.
    Absent,
    /// The cookie decrypted and has not expired.
    Valid(CurrentUser),
    /// The cookie decrypted but its expiry has passed.
    Expired,
    /// The cookie failed to decrypt or parse.
    Invalid,
}

impl SessionState {
    /// The user, when the session is valid.
    #[must_use]
    pub fn user(&self) -> Option<&CurrentUser> {
        match self {
            Self::Valid(user) => Some(user),
            _ => None,
        }
    }

    /// Whether the client holds a cookie that should be cleared.
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self, Self::Expired | Self::Invalid)
    }
}

/// Issues, reads and clears session cookies.
#[derive(Debug, Clone)]
pub struct SessionManager {
    cipher: SessionCipher,
    secure: bool,
}

impl SessionManager {
    /// `secure` sets the cookie `Secure` attribute (production only).
    #[must_use]
    pub const fn new(cipher: SessionCipher, secure: bool) -> Self {
        Self { cipher, secure }
    }

    /// Create a session for `user` valid for seven days from `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be sealed.
    pub fn create_session(
        &self,
        user: &User,
        now: DateTime<Utc>,
    ) -> Result<(SessionPayload, Cookie<'static>), CryptoError> {
        let payload = SessionPayload::for_user(user, now + Duration::seconds(SESSION_TTL_SECONDS));
        let cookie = self.seal(&payload)?;
        Ok((payload, cookie))
    }

    /// Seal an existing payload into a fresh cookie.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be sealed.
    pub fn seal(&self, payload: &SessionPayload) -> Result<Cookie<'static>, CryptoError> {
        let json = serde_json::to_string(payload).map_err(|_| CryptoError::Encrypt)?;
        let token = self.cipher.encrypt(&json)?;

        Ok(Cookie::build((SESSION_COOKIE_NAME, token))
            .http_only(true)
            .secure(self.secure)
            .path("/")
            .same_site(SameSite::Lax)
            .max_age(time::Duration::seconds(SESSION_TTL_SECONDS))
            .build())
    }

    /// Resolve a cookie value into a [`SessionState`].
    ///
    /// The embedded user is trusted until expiry; the database is not consulted.
    #[must_use]
    pub fn read(&self, cookie_value: Option<&str>, now: DateTime<Utc>) -> SessionState {
        let Some(token) = cookie_value.filter(|v| !v.is_empty()) else {
            return SessionState::Absent;
        };

        let payload = match self.cipher.decrypt(token) {
            Ok(json) => match serde_json::from_str::<SessionPayload>(&json) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::debug!(error = %e, "Session payload is not valid JSON");
                    return SessionState::Invalid;
                }
            },
            Err(e) => {
                tracing::debug!(error = %e, "Session cookie failed to decrypt");
                return SessionState::Invalid;
            }
        };

        if payload.is_expired(now) {
            return SessionState::Expired;
        }

        SessionState::Valid(payload.into())
    }

    /// A cookie that deletes the session on the client.
    #[must_use]
    pub fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE_NAME, ""))
            .http_only(true)
            .secure(self.secure)
            .path("/")
            .same_site(SameSite::Lax)
            .max_age(time::Duration::ZERO)
            .expires(time::OffsetDateTime::UNIX_EPOCH)
            .build()
    }
}
