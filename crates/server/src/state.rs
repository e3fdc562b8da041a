//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::crypto::SessionCipher;
use crate::db::SchemaCache;
use crate::services::email::{EmailError, EmailService};
use crate::session::SessionManager;

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("invalid SMTP configuration: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    pool: PgPool,
    sessions: SessionManager,
    schemas: SchemaCache,
    email: Option<EmailService>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Derives the session key from `ENCRYPTION_KEY` and sets up the mailer
    /// when email is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP relay configuration is invalid.
    pub fn new(config: AppConfig, pool: PgPool) -> Result<Self, StateError> {
        let cipher = SessionCipher::new(&config.encryption_key);
        let email = config.email.as_ref().map(EmailService::new).transpose()?;
        if email.is_none() {
            tracing::warn!("EMAIL_USER/EMAIL_PASS not set, order and contact emails are disabled");
        }

        Ok(Self::from_parts(config, pool, cipher, email))
    }

    /// Assemble state from already-built parts.
    pub(crate) fn from_parts(
        config: AppConfig,
        pool: PgPool,
        cipher: SessionCipher,
        email: Option<EmailService>,
    ) -> Self {
        let sessions = SessionManager::new(cipher, config.environment.is_production());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                sessions,
                schemas: SchemaCache::new(),
                email,
            }),
        }
    }

    /// Get a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the session manager.
    #[must_use]
    pub fn sessions(&self) -> &SessionManager {
        &self.inner.sessions
    }

    /// Get a reference to the article schema cache.
    #[must_use]
    pub fn schemas(&self) -> &SchemaCache {
        &self.inner.schemas
    }

    /// Get the email service.
    ///
    /// # Errors
    ///
    /// Returns `EmailError::NotConfigured` when SMTP credentials are missing.
    pub fn email(&self) -> Result<&EmailService, EmailError> {
        self.inner.email.as_ref().ok_or(EmailError::NotConfigured)
    }
}

#[cfg(test)]
impl AppState {
    /// State over a lazily-connected pool; no query succeeds without a database.
    pub(crate) fn for_tests() -> Self {
        let config = AppConfig::from_lookup(&|key| match key {
            "DATABASE_URL" => Some("postgres://atelier@127.0.0.1:1/atelier".to_string()),
            "ENCRYPTION_KEY" => Some("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%".to_string()),
            _ => None,
        })
        .unwrap_or_else(|e| panic!("test config: {e}"));

        let pool = sqlx::postgres::PgPoolOptions::new()
            .acquire_timeout(std::time::Duration::from_millis(200))
            .connect_lazy("postgres://atelier@127.0.0.1:1/atelier")
            .unwrap_or_else(|e| panic!("lazy pool: {e}"));

        Self::from_parts(config, pool, SessionCipher::from_key([7; 32]), None)
    }
}
