//! Read-only views over `information_schema`.
//!
//! Used by the article layout detection and the table debug endpoints.

use serde::Serialize;
use sqlx::PgPool;

use super::{RepositoryError, quote_ident};

/// Rows returned by [`sample_rows`].
pub const SAMPLE_ROW_LIMIT: i64 = 100;

/// A column of a table in the current schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ColumnInfo {
    pub name: String,
    /// Postgres type name, used to cast bound text parameters.
    pub udt_name: String,
}

/// Base tables in the current schema, sorted by name.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn list_tables(pool: &PgPool) -> Result<Vec<String>, RepositoryError> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT table_name::text FROM information_schema.tables \
         WHERE table_schema = current_schema() AND table_type = 'BASE TABLE' \
         ORDER BY table_name",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|(name,)| name).collect())
}

/// Columns of `table` in ordinal order; empty if the table does not exist.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn table_columns(pool: &PgPool, table: &str) -> Result<Vec<ColumnInfo>, RepositoryError> {
    let columns = sqlx::query_as::<_, ColumnInfo>(
        "SELECT column_name::text AS name, udt_name::text AS udt_name \
         FROM information_schema.columns \
         WHERE table_schema = current_schema() AND table_name = $1 \
         ORDER BY ordinal_position",
    )
    .bind(table)
    .fetch_all(pool)
    .await?;

    Ok(columns)
}

/// Up to [`SAMPLE_ROW_LIMIT`] rows of `table` as JSON objects.
///
/// The caller must have checked that `table` exists.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn sample_rows(
    pool: &PgPool,
    table: &str,
) -> Result<Vec<serde_json::Value>, RepositoryError> {
    let rows: Vec<(serde_json::Value,)> = sqlx::query_as(&format!(
        "SELECT row_to_json(t) AS doc FROM (SELECT * FROM {} LIMIT {SAMPLE_ROW_LIMIT}) t",
        quote_ident(table)
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|(doc,)| doc).collect())
}

/// Whether `name` is acceptable as a table name in a debug URL.
#[must_use]
pub fn is_valid_table_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
