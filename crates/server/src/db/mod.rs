//! Database operations for Atelier `PostgreSQL`.
//!
//! ## Tables
//!
//! - `app_user` - Accounts and roles
//! - `art` or `article` - Inventory (legacy or modern layout, see [`articles`])
//! - `client_local` - Clients
//! - `fournisseur` - Suppliers
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p atelier-cli -- migrate
//! ```
//!
//! All queries are built at runtime: the article table layout is only known
//! once the live schema has been inspected.

pub mod articles;
pub mod contacts;
pub mod introspect;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use articles::{ArticleRepository, SchemaCache};
pub use contacts::{ContactKind, ContactRepository};
pub use users::UserRepository;

/// SQLSTATE codes for values the database refused to convert or store.
const INVALID_INPUT_CODES: &[&str] = &[
    "22P02", // invalid_text_representation
    "22003", // numeric_value_out_of_range
    "22007", // invalid_datetime_format
    "22001", // string_data_right_truncation
    "23502", // not_null_violation
];

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The row is still referenced by a foreign key.
    #[error("referenced by other records")]
    Referenced,

    /// The database rejected a supplied value.
    #[error("invalid value: {0}")]
    InvalidInput(String),
}

impl RepositoryError {
    /// Classify a write error: unique violations become `Conflict(conflict)`,
    /// foreign-key violations `Referenced`, bad values `InvalidInput`.
    #[must_use]
    pub fn from_write(e: sqlx::Error, conflict: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return Self::Conflict(conflict.to_owned());
            }
            if db_err.is_foreign_key_violation() {
                return Self::Referenced;
            }
            if db_err
                .code()
                .is_some_and(|code| INVALID_INPUT_CODES.contains(&code.as_ref()))
            {
                return Self::InvalidInput(db_err.message().to_owned());
            }
        }
        Self::Database(e)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(60))
        .connect(database_url.expose_secret())
        .await
}

/// Wrap a search term for `ILIKE`, escaping its wildcards.
#[must_use]
pub fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Quote an identifier for interpolation into SQL.
///
/// Only names read back from `information_schema` or checked against it are
/// passed here.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("vis"), "%vis%");
        assert_eq!(like_pattern("50%"), "%50\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("c:\\x"), "%c:\\\\x%");
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("Art_ID"), "\"Art_ID\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_non_database_errors_pass_through() {
        let err = RepositoryError::from_write(sqlx::Error::RowNotFound, "dup");
        assert!(matches!(err, RepositoryError::Database(sqlx::Error::RowNotFound)));
    }
}
